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
//! # Parachain Relay 🕸️
//!
//! Moves outbound channel commitments of the relay chain to the inbound
//! channel contracts on Ethereum.
//!
//! The [`BeefyListener`] follows the light client and packages the
//! commitments of every block it verifies; the [`EthereumChannelWriter`]
//! proves and submits them. The two are connected by a bounded channel, so
//! a slow writer stalls the listener.

use std::sync::Arc;

use beefy_relayer_context::{RelayerContext, TaskGroup};
use beefy_relayer_tx_queue::evm::EvmTxDispatcher;
use beefy_relayer_types::connection::{EthereumChain, SubstrateChain};
use beefy_relayer_utils::Result;
use tokio::sync::mpsc;

mod beefy_listener;
mod channel_writer;
#[cfg(test)]
mod test_utils;

pub use beefy_listener::BeefyListener;
pub use channel_writer::{EthereumChannelWriter, InboundChannels};

/// Starts the listener and the channel writer in `group`.
pub fn start_parachain_relay<S, E>(
    ctx: &RelayerContext,
    group: &mut TaskGroup,
    relaychain: Arc<S>,
    ethereum: Arc<E>,
) -> Result<()>
where
    S: SubstrateChain + ?Sized + 'static,
    E: EthereumChain + ?Sized + 'static,
{
    let config = &ctx.config.parachain_relay;
    let token = ctx.cancellation_token();
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    tracing::info!(
        light_client = %config.beefy_light_client,
        gap_fill_depth = config.gap_fill_depth,
        "Starting parachain relay"
    );

    let listener = BeefyListener::new(
        relaychain,
        ethereum.clone(),
        config.beefy_light_client,
        config.gap_fill_depth,
        tx,
        token.clone(),
    );
    let dispatcher =
        EvmTxDispatcher::new(ethereum, ctx.config.ethereum.explorer.clone());
    let writer = EthereumChannelWriter::new(
        dispatcher,
        InboundChannels {
            basic: config.basic_inbound_channel,
            incentivized: config.incentivized_inbound_channel,
        },
        rx,
        token,
    );
    group.spawn("beefy-listener", listener.run());
    group.spawn("ethereum-channel-writer", writer.run());
    Ok(())
}
