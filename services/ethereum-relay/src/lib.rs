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
//! # Ethereum Relay 🕸️
//!
//! The parachain side of the Ethereum to parachain direction. Payloads of
//! one Ethereum header plus the messages proven against it are turned
//! into signed extrinsics by the [`ParachainWriter`].

mod parachain_writer;

pub use parachain_writer::ParachainWriter;
