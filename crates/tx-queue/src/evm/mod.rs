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

mod evm_tx_queue;
#[doc(hidden)]
pub use evm_tx_queue::*;

use ethers::types::U256;

/// Gas price assumed by the cost estimate, in gwei.
pub const ASSUMED_GAS_PRICE_GWEI: u64 = 50;
/// ETH price assumed by the cost estimate, in USD.
pub const ASSUMED_ETH_PRICE_USD: u64 = 4000;

/// Rough USD cost of `gas`, for logs only.
pub fn estimated_cost_usd(gas: U256) -> f64 {
    let gas = gas.min(U256::from(u64::MAX)).as_u64() as f64;
    gas * ASSUMED_ETH_PRICE_USD as f64 * ASSUMED_GAS_PRICE_GWEI as f64 / 1e9
}
