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
use std::time::Duration;

use beefy_relayer_types::connection::{ContractCall, EthereumChain, LogFilter};
use beefy_relayer_types::private_key::PrivateKey;
use beefy_relayer_types::rpc_url::WsUrl;
use beefy_relayer_utils::{Error, EthereumClient, Result};
use ethers::core::types::transaction::eip2718::TypedTransaction;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Middleware, Provider, Ws};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{
    Bytes, Eip1559TransactionRequest, Filter, Log, H256 as TxHash, U256, U64,
};
use futures::stream::{BoxStream, StreamExt};

/// Fee settings applied to every transaction, `0` leaves a value to the
/// node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasSettings {
    /// Max fee per gas, in wei.
    pub fee_cap: u64,
    /// Max priority fee per gas, in wei.
    pub tip_cap: u64,
    /// Gas limit.
    pub limit: u64,
}

/// A signing websocket client of the Ethereum side.
#[derive(Clone)]
pub struct EthereumConnection {
    client: Arc<EthereumClient>,
    chain_id: u64,
    gas: GasSettings,
}

impl std::fmt::Debug for EthereumConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumConnection")
            .field("chain_id", &self.chain_id)
            .field("address", &self.client.address())
            .finish()
    }
}

impl EthereumConnection {
    /// Connects to `endpoint` and sets up the wallet for `key`.
    pub async fn connect(
        endpoint: &WsUrl,
        key: &PrivateKey,
        gas: GasSettings,
    ) -> Result<Self> {
        let provider = Provider::<Ws>::connect(endpoint.as_str()).await?;
        let chain_id = provider.get_chainid().await?.as_u64();
        let wallet =
            LocalWallet::from_bytes(key.as_bytes())?.with_chain_id(chain_id);
        tracing::info!(
            chain_id,
            address = ?wallet.address(),
            "Connected to Ethereum"
        );
        let client = SignerMiddleware::new(provider, wallet);
        Ok(Self {
            client: Arc::new(client),
            chain_id,
            gas,
        })
    }

    /// The underlying signing client.
    pub fn client(&self) -> Arc<EthereumClient> {
        self.client.clone()
    }

    fn transaction(&self, call: &ContractCall) -> TypedTransaction {
        let mut tx = Eip1559TransactionRequest::new()
            .from(self.client.address())
            .to(call.to)
            .data(call.data.clone())
            .chain_id(self.chain_id);
        if self.gas.fee_cap > 0 {
            tx = tx.max_fee_per_gas(self.gas.fee_cap);
        }
        if self.gas.tip_cap > 0 {
            tx = tx.max_priority_fee_per_gas(self.gas.tip_cap);
        }
        if self.gas.limit > 0 {
            tx = tx.gas(self.gas.limit);
        }
        tx.into()
    }
}

#[async_trait::async_trait]
impl EthereumChain for EthereumConnection {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn subscribe_new_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<u64>>> {
        let heads = self.client.provider().subscribe_blocks().await?;
        let numbers = heads.map(|block| {
            block
                .number
                .map(|n: U64| n.as_u64())
                .ok_or(Error::Generic("new head without a block number"))
        });
        Ok(numbers.boxed())
    }

    async fn filter_logs(&self, filter: LogFilter) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(filter.address)
            .topic0(filter.topic0)
            .from_block(filter.from_block)
            .to_block(filter.to_block);
        Ok(self.client.provider().get_logs(&filter).await?)
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes> {
        let tx = self.transaction(call);
        Ok(self.client.call(&tx, None).await?)
    }

    async fn estimate_gas(&self, call: &ContractCall) -> Result<U256> {
        let tx = self.transaction(call);
        Ok(self.client.estimate_gas(&tx, None).await?)
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash> {
        let tx = self.transaction(call);
        let pending = self.client.send_transaction(tx, None).await?;
        let tx_hash = *pending;
        tracing::debug!(?tx_hash, label = call.label, "Transaction pending");
        let receipt = pending.interval(Duration::from_millis(1000)).await?;
        match receipt {
            Some(receipt) if receipt.status == Some(U64::zero()) => {
                Err(Error::TransactionReverted(format!("{tx_hash:#x}")))
            }
            Some(_) => Ok(tx_hash),
            None => Err(Error::TransactionDropped(format!("{tx_hash:#x}"))),
        }
    }
}
