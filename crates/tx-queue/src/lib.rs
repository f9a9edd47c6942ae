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
//! Submission paths shared by the writers.
//!
//! Both sides submit strictly one transaction at a time. The Ethereum side
//! leaves nonces to the signing middleware, the parachain side keeps its
//! own account nonce.

/// Ethereum transaction dispatch.
pub mod evm;
/// Signed extrinsic submission.
pub mod substrate;
