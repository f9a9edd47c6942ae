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

//! The chain connections the relay pipeline is written against.
//!
//! The concrete websocket implementations live in the context crate, tests
//! use in-memory mocks.

use beefy_relayer_utils::{Error, Result};
use codec::Decode;
use ethers::types::{Address, Bytes, Log, H256 as TxHash, U256};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use sp_core::H256;

use crate::mmr::GeneratedMmrProof;
use crate::parachain::{storage, RuntimeCall, SigningParams};

/// A relay chain or parachain header, reduced to what the relayer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Parent hash.
    pub parent_hash: H256,
    /// Block number.
    pub number: u32,
    /// Payloads of the `Other` digest logs, in header order.
    pub other_logs: Vec<Vec<u8>>,
}

/// A block with opaque extrinsics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The header.
    pub header: BlockHeader,
    /// Encoded extrinsics.
    pub extrinsics: Vec<Vec<u8>>,
}

/// Runtime versions needed for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeVersion {
    /// Spec version.
    pub spec_version: u32,
    /// Transaction version.
    pub transaction_version: u32,
}

/// Read access to a Substrate chain.
#[async_trait::async_trait]
pub trait SubstrateChain: Send + Sync {
    /// Hash of the latest finalized block.
    async fn finalized_head_hash(&self) -> Result<H256>;
    /// Hash of the block at `number` on the canonical chain.
    async fn block_hash(&self, number: u32) -> Result<H256>;
    /// The block with hash `hash`.
    async fn block(&self, hash: H256) -> Result<Block>;
    /// The header of the block with hash `hash`.
    async fn header(&self, hash: H256) -> Result<BlockHeader>;
    /// Raw storage value at the best block.
    async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    /// Raw value from the persistent offchain storage.
    async fn offchain_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    /// Current runtime version.
    async fn runtime_version(&self) -> Result<RuntimeVersion>;
    /// MMR proof of the leaf of `block_number`, generated against the MMR
    /// as of block `at`.
    async fn generate_mmr_proof(
        &self,
        block_number: u32,
        at: H256,
    ) -> Result<GeneratedMmrProof>;
    /// Stream of finalized headers.
    async fn subscribe_finalized_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<BlockHeader>>>;

    /// Nonce of `account_id`, read from `System.Account`.
    async fn account_nonce(&self, account_id: &[u8; 32]) -> Result<u32> {
        let key = storage::system_account(account_id);
        let raw = self.storage(&key).await?.ok_or(Error::AccountNotFound)?;
        // AccountInfo starts with the nonce.
        Ok(u32::decode(&mut &raw[..])?)
    }
}

/// Log filter over a block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract.
    pub address: Address,
    /// Event signature topic.
    pub topic0: TxHash,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

/// A contract call, used for dry runs, gas estimation and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// The contract.
    pub to: Address,
    /// ABI encoded call data.
    pub data: Bytes,
    /// Function name, for logs.
    pub label: &'static str,
}

/// Access to the Ethereum side.
#[async_trait::async_trait]
pub trait EthereumChain: Send + Sync {
    /// Chain id of the network.
    async fn chain_id(&self) -> Result<u64>;
    /// Stream of new block numbers.
    async fn subscribe_new_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<u64>>>;
    /// Logs matching `filter`.
    async fn filter_logs(&self, filter: LogFilter) -> Result<Vec<Log>>;
    /// Read-only call against the latest block.
    async fn call(&self, call: &ContractCall) -> Result<Bytes>;
    /// Gas estimate of `call` sent from the relayer account.
    async fn estimate_gas(&self, call: &ContractCall) -> Result<U256>;
    /// Signs and sends `call`, returning the transaction hash.
    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash>;
}

/// Callback run once an extrinsic is in a finalized block.
pub type OnFinalized =
    Box<dyn FnOnce(H256) -> BoxFuture<'static, Result<()>> + Send>;

/// Signs extrinsics for the parachain writer's account.
pub trait ExtrinsicSigner: Send + Sync {
    /// Public key of the signing account.
    fn account_id(&self) -> [u8; 32];
    /// Encodes `call` with the runtime metadata and signs it.
    fn sign(&self, call: &RuntimeCall, params: &SigningParams)
        -> Result<Vec<u8>>;
}

/// Submission pool for signed extrinsics.
#[async_trait::async_trait]
pub trait ExtrinsicPool: Send + Sync {
    /// Submits `extrinsic`, waits until it is finalized, runs `on_finalized`
    /// with the finalized block hash and returns its result.
    async fn submit_and_wait(
        &self,
        extrinsic: Vec<u8>,
        on_finalized: OnFinalized,
    ) -> Result<()>;
}
