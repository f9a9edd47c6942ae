// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # BEEFY Relayer 🕸️
//!
//! Relays BEEFY finality and parachain messages from a Substrate relay
//! chain to Ethereum.
//!
//! ## Overview
//!
//! The relayer runs two independent relays, each enabled in the config:
//!
//!   1. The parachain relay waits for new MMR roots on the Ethereum BEEFY
//!      light client, proves the parachain commitments of the newly
//!      covered blocks and submits their messages to the inbound channels.
//!   2. The beefy relay takes witnessed signed commitments from the store
//!      and runs the two phase verification against the light client.
//!
//! Every service task shares one cancellation token. The first failure
//! of any task, or a shutdown signal, stops all of them.

/// Starts the configured relays.
pub mod service;

pub use beefy_relayer_utils::{Error, Result};
