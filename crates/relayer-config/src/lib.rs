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

//! # Relayer Configuration Module 🕸️
//!
//! A module for configuring the relayer.
//!
//! ## Overview
//!
//! The configuration is read from every `.toml` and `.json` file inside the
//! config directory and merged with `BEEFY_` prefixed environment variables.
//! Possible sections are:
//! * `ethereum`: the Ethereum endpoint, signing key and gas settings.
//! * `relaychain`: the relay chain endpoint.
//! * `parachain-relay`: the listener and inbound channel writer.
//! * `beefy-relay`: the two-phase BEEFY commitment writer.

/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Default values of optional settings.
pub mod defaults;
/// Utils for processing configuration
pub mod utils;

use std::time::Duration;

use beefy_relayer_types::private_key::PrivateKey;
use beefy_relayer_types::rpc_url::WsUrl;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// RelayerConfig is the configuration for the BEEFY relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    /// The Ethereum side.
    pub ethereum: EthereumConfig,
    /// The relay chain.
    pub relaychain: RelaychainConfig,
    /// Relay of parachain commitments to the inbound channels.
    #[serde(default)]
    pub parachain_relay: ParachainRelayConfig,
    /// Relay of BEEFY justifications to the light client.
    #[serde(default)]
    pub beefy_relay: BeefyRelayConfig,
}

impl RelayerConfig {
    /// Makes sure that the config is valid, by going
    /// through the whole config and doing some basic checks.
    pub fn verify(&self) -> beefy_relayer_utils::Result<()> {
        use beefy_relayer_utils::Error;
        if !self.parachain_relay.enabled && !self.beefy_relay.enabled {
            return Err(Error::Generic(
                "at least one of parachain-relay or beefy-relay must be enabled",
            ));
        }
        if self.parachain_relay.enabled {
            let p = &self.parachain_relay;
            if p.beefy_light_client.is_zero()
                || p.basic_inbound_channel.is_zero()
                || p.incentivized_inbound_channel.is_zero()
            {
                return Err(Error::Generic(
                    "parachain-relay needs the light client and both inbound channel addresses",
                ));
            }
        }
        if self.beefy_relay.enabled
            && self.beefy_relay.beefy_light_client.is_zero()
        {
            return Err(Error::Generic(
                "beefy-relay needs the light client address",
            ));
        }
        // Every relay submits Ethereum transactions.
        self.ethereum
            .private_key
            .is_some()
            .then_some(())
            .ok_or(Error::MissingSecrets)
    }
}

/// EthereumConfig is the configuration of the Ethereum connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EthereumConfig {
    /// Websocket Endpoint for long living connections
    #[serde(skip_serializing)]
    pub ws_endpoint: WsUrl,
    /// The Private Key of the relayer account.
    /// the format is more dynamic here:
    /// 1. if it starts with '0x' then this would be raw (64 bytes) hex encoded
    ///    private key.
    ///    Example: 0x8917174396171783496173419137618235192359106130478137647163400318
    ///
    /// 2. if it starts with '$' then it would be considered as an Enviroment variable
    ///    of a hex-encoded private key.
    ///   Example: $ETH_PRIVATE_KEY
    ///
    /// 3. if it starts with '> ' then it would be considered as a command that
    ///   the relayer would execute and the output of this command would be the
    ///   hex encoded private key.
    ///   Example: > pass eth-privatekey
    #[serde(skip_serializing)]
    pub private_key: Option<PrivateKey>,
    /// Block Explorer for this chain.
    ///
    /// Optional, and only used for printing a clickable links
    /// for transactions.
    #[serde(skip_serializing)]
    pub explorer: Option<url::Url>,
    /// Max fee per gas in wei, 0 leaves it to the node.
    #[serde(default)]
    pub gas_fee_cap: u64,
    /// Max priority fee per gas in wei, 0 leaves it to the node.
    #[serde(default)]
    pub gas_tip_cap: u64,
    /// Gas limit, 0 means estimate.
    #[serde(default)]
    pub gas_limit: u64,
}

/// RelaychainConfig is the configuration of the relay chain connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelaychainConfig {
    /// Websocket Endpoint of a relay chain node with offchain indexing.
    #[serde(skip_serializing)]
    pub ws_endpoint: WsUrl,
}

/// ParachainRelayConfig controls the listener and the channel writer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParachainRelayConfig {
    /// Whether the relay runs.
    #[serde(default)]
    pub enabled: bool,
    /// BEEFY light client contract.
    #[serde(default)]
    pub beefy_light_client: Address,
    /// Basic inbound channel contract.
    #[serde(default)]
    pub basic_inbound_channel: Address,
    /// Incentivized inbound channel contract.
    #[serde(default)]
    pub incentivized_inbound_channel: Address,
    /// Capacity of the listener to writer queue.
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,
    /// How many blocks below the latest verified block the listener
    /// scans on startup.
    #[serde(default = "defaults::gap_fill_depth")]
    pub gap_fill_depth: u32,
}

impl Default for ParachainRelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            beefy_light_client: Address::zero(),
            basic_inbound_channel: Address::zero(),
            incentivized_inbound_channel: Address::zero(),
            channel_capacity: defaults::channel_capacity(),
            gap_fill_depth: defaults::gap_fill_depth(),
        }
    }
}

/// BeefyRelayConfig controls the commitment feeder and writer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BeefyRelayConfig {
    /// Whether the relay runs.
    #[serde(default)]
    pub enabled: bool,
    /// BEEFY light client contract.
    #[serde(default)]
    pub beefy_light_client: Address,
    /// The first contract id the writer expects to complete.
    ///
    /// The writer's counter starts from this value on every start. It is
    /// not read back from the light client or the store, so after a
    /// restart with commitments in flight it must be set to the light
    /// client's next id. Otherwise `ReadyToComplete` records fail the
    /// contract id compare-and-swap and are skipped as out of sequence
    /// until the config is updated.
    #[serde(default)]
    pub starting_contract_id: u64,
    /// Pause after every submitted transaction, in seconds.
    #[serde(default = "defaults::rate_limit")]
    pub rate_limit: u64,
    /// Store polling interval, in seconds.
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval: u64,
    /// Capacity of the feeder to writer queue.
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,
}

impl BeefyRelayConfig {
    /// Pause after every submitted transaction.
    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs(self.rate_limit)
    }

    /// Store polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

impl Default for BeefyRelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            beefy_light_client: Address::zero(),
            starting_contract_id: 0,
            rate_limit: defaults::rate_limit(),
            poll_interval: defaults::poll_interval(),
            channel_capacity: defaults::channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_config_files_are_correct() {
        // Every directory under `config/` at the workspace root must parse.
        let config_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config");
        let config_dirs = std::fs::read_dir(&config_dir)
            .expect("Failed to read config directory")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();
        assert!(
            !config_dirs.is_empty(),
            "No config directories found in the config directory"
        );
        for config_subdir in config_dirs {
            std::env::set_var(
                "ETH_PRIVATE_KEY",
                "0x8917174396171783496173419137618235192359106130478137647163400318",
            );
            if let Err(e) = utils::load(&config_subdir) {
                panic!("Failed to parse config file in directory: {config_subdir:?} with error: {e}");
            }
        }
    }
}
