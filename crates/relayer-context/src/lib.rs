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

#![warn(missing_docs)]
//! Runtime context shared by every relay service.
//!
//! Holds the configuration, the commitment store and the root cancellation
//! token, and knows how to dial the two chains.

/// Websocket connection to the Ethereum side.
pub mod ethereum;
/// Websocket connection to the relay chain.
pub mod substrate;
/// Supervision of the service tasks.
pub mod task_group;

use beefy_relayer_config::RelayerConfig;
use beefy_relayer_store::SledStore;
use beefy_relayer_utils::retry::DialBackoff;
use beefy_relayer_utils::{Error, Result};
use tokio_util::sync::CancellationToken;

pub use ethereum::{EthereumConnection, GasSettings};
pub use substrate::SubstrateConnection;
pub use task_group::TaskGroup;

/// RelayerContext contains Relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: RelayerConfig,
    store: SledStore,
    /// Cancelled once, on a shutdown request or on the first fatal error of
    /// any service. Every blocking operation of the pipeline selects on it.
    token: CancellationToken,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(config: RelayerConfig, store: SledStore) -> Self {
        Self {
            config,
            store,
            token: CancellationToken::new(),
        }
    }

    /// A handle to the root cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Sends a shutdown signal to all tasks.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Returns [Sled](https://sled.rs)-based database store
    pub fn store(&self) -> &SledStore {
        &self.store
    }

    /// Dials the Ethereum endpoint with the relayer's signing key.
    ///
    /// The dial is retried with [`DialBackoff`]; once connected, errors are
    /// no longer retried.
    pub async fn ethereum_connection(&self) -> Result<EthereumConnection> {
        let cfg = &self.config.ethereum;
        let key = cfg.private_key.as_ref().ok_or(Error::MissingSecrets)?;
        let gas = GasSettings {
            fee_cap: cfg.gas_fee_cap,
            tip_cap: cfg.gas_tip_cap,
            limit: cfg.gas_limit,
        };
        let connect = || async {
            tracing::debug!(endpoint = %cfg.ws_endpoint, "Dialing Ethereum");
            EthereumConnection::connect(&cfg.ws_endpoint, key, gas)
                .await
                .map_err(backoff::Error::transient)
        };
        backoff::future::retry(DialBackoff::default(), connect).await
    }

    /// Dials the relay chain endpoint.
    pub async fn relaychain_connection(&self) -> Result<SubstrateConnection> {
        let endpoint = &self.config.relaychain.ws_endpoint;
        let connect = || async {
            tracing::debug!(%endpoint, "Dialing relay chain");
            SubstrateConnection::connect(endpoint)
                .await
                .map_err(backoff::Error::transient)
        };
        backoff::future::retry(DialBackoff::default(), connect).await
    }
}
