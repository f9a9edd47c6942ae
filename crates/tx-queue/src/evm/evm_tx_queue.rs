// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

use std::sync::Arc;

use beefy_relayer_types::connection::{ContractCall, EthereumChain};
use beefy_relayer_utils::explorer::TxLink;
use beefy_relayer_utils::probe;
use ethers::types::H256 as TxHash;
use url::Url;

use super::estimated_cost_usd;

/// Sends contract calls to Ethereum one at a time.
///
/// Every call is gas estimated and dry run before the real transaction, so
/// revert reasons show up in the logs even when the transaction itself
/// would only fail on chain. Neither of the two is fatal, the submission is.
pub struct EvmTxDispatcher<C: ?Sized> {
    chain: Arc<C>,
    explorer: Option<Url>,
}

impl<C: ?Sized> Clone for EvmTxDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            explorer: self.explorer.clone(),
        }
    }
}

impl<C> EvmTxDispatcher<C>
where
    C: EthereumChain + ?Sized,
{
    /// Creates a new dispatcher.
    ///
    /// # Arguments
    ///
    /// * `chain` - the Ethereum connection
    /// * `explorer` - optional block explorer, only used for clickable links
    pub fn new(chain: Arc<C>, explorer: Option<Url>) -> Self {
        Self { chain, explorer }
    }

    /// The Ethereum connection.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Dry runs, then submits `call` and waits for its receipt.
    #[tracing::instrument(skip_all, fields(function = call.label))]
    pub async fn dispatch(
        &self,
        call: &ContractCall,
    ) -> beefy_relayer_utils::Result<TxHash> {
        match self.chain.estimate_gas(call).await {
            Ok(gas) => tracing::debug!(
                %gas,
                cost_usd = estimated_cost_usd(gas),
                "Estimated transaction cost"
            ),
            Err(e) => tracing::debug!(error = %e, "Gas estimation failed"),
        }

        // dry run test
        match self.chain.call(call).await {
            Ok(_) => tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::TxQueue,
                ty = "EVM",
                function = call.label,
                dry_run = "passed",
            ),
            Err(err) => {
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxQueue,
                    ty = "EVM",
                    function = call.label,
                    errored = true,
                    error = %err,
                    dry_run = "failed",
                );
                tracing::warn!(
                    error = %err,
                    "Dry run failed, submitting anyway"
                );
            }
        }

        let tx_hash = match self.chain.submit_transaction(call).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::error!(error = %e, "Error while sending tx");
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::TxQueue,
                    ty = "EVM",
                    function = call.label,
                    errored = true,
                    error = %e,
                );
                return Err(e);
            }
        };
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxQueue,
            ty = "EVM",
            function = call.label,
            finalized = true,
            %tx_hash,
        );
        tracing::info!(
            "Tx {} is included!",
            TxLink::new(tx_hash, self.explorer.as_ref())
        );
        Ok(tx_hash)
    }
}
