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

use std::sync::Arc;

use beefy_relayer_context::{RelayerContext, TaskGroup};

/// Dials the chains the enabled relays need and spawns their tasks into
/// `group`.
///
/// Returns once every task is spawned. Fails if a connection cannot be
/// established.
pub async fn ignite(
    ctx: &RelayerContext,
    group: &mut TaskGroup,
) -> crate::Result<()> {
    let parachain_enabled = ctx.config.parachain_relay.enabled;
    let beefy_enabled = ctx.config.beefy_relay.enabled;
    if !parachain_enabled && !beefy_enabled {
        tracing::warn!("No relay is enabled, nothing to do");
        return Ok(());
    }

    let ethereum = Arc::new(ctx.ethereum_connection().await?);
    tracing::info!(
        endpoint = %ctx.config.ethereum.ws_endpoint,
        "Connected to Ethereum"
    );

    if parachain_enabled {
        let relaychain = Arc::new(ctx.relaychain_connection().await?);
        tracing::info!(
            endpoint = %ctx.config.relaychain.ws_endpoint,
            "Connected to the relay chain"
        );
        beefy_parachain_relay::start_parachain_relay(
            ctx,
            group,
            relaychain,
            ethereum.clone(),
        )?;
    }

    if beefy_enabled {
        beefy_commitment_relay::start_beefy_relay(
            ctx,
            group,
            ethereum,
            ctx.store().clone(),
        )?;
    }
    Ok(())
}
