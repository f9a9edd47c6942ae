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
//! # Beefy Relay 🕸️
//!
//! Submits BEEFY signed commitments to the Ethereum light client in two
//! phases. The [`CommitmentFeeder`] picks records that wait on the relayer
//! out of the store, and the [`BeefyEthereumWriter`] sends the matching
//! transaction and moves the record on.

use std::sync::Arc;

use beefy_relayer_context::{RelayerContext, TaskGroup};
use beefy_relayer_store::CommitmentStore;
use beefy_relayer_tx_queue::evm::EvmTxDispatcher;
use beefy_relayer_types::connection::EthereumChain;
use beefy_relayer_utils::Result;
use tokio::sync::mpsc;

mod feeder;
#[cfg(test)]
mod test_utils;
mod writer;

pub use feeder::CommitmentFeeder;
pub use writer::{BeefyEthereumWriter, ContractIdSequence};

/// Starts the feeder and the writer in `group`.
pub fn start_beefy_relay<E, S>(
    ctx: &RelayerContext,
    group: &mut TaskGroup,
    ethereum: Arc<E>,
    store: S,
) -> Result<()>
where
    E: EthereumChain + ?Sized + 'static,
    S: CommitmentStore + 'static,
{
    let config = &ctx.config.beefy_relay;
    let token = ctx.cancellation_token();
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    tracing::info!(
        light_client = %config.beefy_light_client,
        starting_contract_id = config.starting_contract_id,
        "Starting beefy relay"
    );

    let feeder = CommitmentFeeder::new(
        store.clone(),
        config.poll_interval(),
        tx,
        token.clone(),
    );
    let writer = BeefyEthereumWriter::new(
        EvmTxDispatcher::new(ethereum, ctx.config.ethereum.explorer.clone()),
        store,
        config.beefy_light_client,
        ContractIdSequence::new(config.starting_contract_id),
        config.rate_limit(),
        rx,
        token,
    );
    group.spawn("commitment-feeder", feeder.run());
    group.spawn("beefy-ethereum-writer", writer.run());
    Ok(())
}
