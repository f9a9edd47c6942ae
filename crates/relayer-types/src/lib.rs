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
//! Types shared by every part of the BEEFY relayer.

/// BEEFY commitments and commitment records.
pub mod beefy;
/// Outbound channel commitments.
pub mod channel;
/// Chain connection traits.
pub mod connection;
/// Light client and inbound channel contract calls.
pub mod contracts;
/// MMR leaves and proofs.
pub mod mmr;
/// Message packages handed from the listener to the channel writer.
pub mod package;
/// Parachain payloads and extrinsic parameters.
pub mod parachain;
/// A module for managing private keys.
pub mod private_key;
/// Websocket endpoint urls.
pub mod rpc_url;
