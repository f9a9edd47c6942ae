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

//! In-memory chains for the relay tests.

use std::collections::HashMap;

use beefy_proof_generation::channel::InboundMessages;
use beefy_relayer_types::channel::{
    AuxiliaryDigest, AuxiliaryDigestItem, BasicOutboundMessage, ChannelId,
    IncentivizedOutboundMessage,
};
use beefy_relayer_types::connection::{
    Block, BlockHeader, ContractCall, EthereumChain, LogFilter,
    RuntimeVersion, SubstrateChain,
};
use beefy_relayer_types::contracts::{
    ContractFunction, InboundChannelNonceCall, LatestBeefyBlockCall,
    NewMmrRootEvent,
};
use beefy_relayer_types::mmr::{
    GeneratedMmrProof, MmrLeaf, MmrLeafProof, MmrProof,
};
use beefy_relayer_utils::{Error, Result};
use codec::Encode;
use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, Log, H256 as TxHash, U256};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use sp_core::{H160, H256};

pub fn hash_of(number: u32) -> H256 {
    H256::from_low_u64_be(u64::from(number))
}

/// A single-leaf MMR, the root is the leaf hash.
pub fn single_leaf_proof(number: u32) -> GeneratedMmrProof {
    let leaf = MmrLeaf {
        parent_number_and_hash: (number - 1, hash_of(number - 1)),
        digest_hash: H256::repeat_byte(0xdd),
        ..Default::default()
    };
    GeneratedMmrProof {
        root: leaf.hash(),
        leaf_proof: MmrLeafProof {
            leaf,
            proof: MmrProof {
                leaf_index: 0,
                leaf_count: 1,
                items: vec![],
            },
        },
    }
}

/// A single-leaf MMR whose leaf commits to `digest`.
pub fn leaf_proof_for(
    number: u32,
    digest: &AuxiliaryDigest,
) -> GeneratedMmrProof {
    let mut proof = single_leaf_proof(number);
    proof.leaf_proof.leaf.digest_hash = digest.hash();
    proof.root = proof.leaf_proof.leaf.hash();
    proof
}

/// Encoded basic messages with the given nonces and their commitment hash.
pub fn basic_commitment(nonces: &[u64]) -> (Vec<u8>, H256) {
    let data = nonces
        .iter()
        .map(|nonce| BasicOutboundMessage {
            target: H160::repeat_byte(0x11),
            nonce: *nonce,
            payload: vec![0xca, 0xfe],
        })
        .collect::<Vec<_>>()
        .encode();
    let hash = InboundMessages::decode(ChannelId::Basic, &data)
        .map(|m| m.commitment_hash())
        .unwrap_or_default();
    (data, hash)
}

/// Encoded incentivized messages with the given nonces and their
/// commitment hash.
pub fn incentivized_commitment(nonces: &[u64]) -> (Vec<u8>, H256) {
    let data = nonces
        .iter()
        .map(|nonce| IncentivizedOutboundMessage {
            target: H160::repeat_byte(0x22),
            nonce: *nonce,
            fee: sp_core::U256::from(1_000u64),
            payload: vec![0xbe, 0xef],
        })
        .collect::<Vec<_>>()
        .encode();
    let hash = InboundMessages::decode(ChannelId::Incentivized, &data)
        .map(|m| m.commitment_hash())
        .unwrap_or_default();
    (data, hash)
}

#[derive(Default)]
pub struct MockRelaychain {
    headers: HashMap<u32, BlockHeader>,
    offchain: HashMap<Vec<u8>, Vec<u8>>,
    pub proof_requests: Mutex<Vec<(u32, H256)>>,
}

impl MockRelaychain {
    /// Puts one basic commitment with `nonces` into block `number`.
    pub fn with_basic_commitment(
        mut self,
        number: u32,
        nonces: &[u64],
    ) -> Self {
        let (data, hash) = basic_commitment(nonces);
        let item = AuxiliaryDigestItem::Commitment(ChannelId::Basic, hash);
        self.offchain.insert(item.offchain_key(), data);
        self.headers.insert(
            number,
            BlockHeader {
                parent_hash: hash_of(number - 1),
                number,
                other_logs: vec![item.encode(), vec![0xff, 0x01]],
            },
        );
        self
    }

    /// Puts a commitment whose payload never reached offchain storage.
    pub fn with_missing_payload(mut self, number: u32) -> Self {
        let item = AuxiliaryDigestItem::Commitment(
            ChannelId::Incentivized,
            H256::repeat_byte(0x42),
        );
        self.headers.insert(
            number,
            BlockHeader {
                parent_hash: hash_of(number - 1),
                number,
                other_logs: vec![item.encode()],
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl SubstrateChain for MockRelaychain {
    async fn finalized_head_hash(&self) -> Result<H256> {
        Ok(hash_of(1000))
    }

    async fn block_hash(&self, number: u32) -> Result<H256> {
        Ok(hash_of(number))
    }

    async fn block(&self, hash: H256) -> Result<Block> {
        Ok(Block {
            header: self.header(hash).await?,
            extrinsics: vec![],
        })
    }

    async fn header(&self, hash: H256) -> Result<BlockHeader> {
        let number = hash.to_low_u64_be() as u32;
        Ok(self.headers.get(&number).cloned().unwrap_or(BlockHeader {
            parent_hash: hash_of(number.saturating_sub(1)),
            number,
            other_logs: vec![],
        }))
    }

    async fn storage(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn offchain_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.offchain.get(key).cloned())
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion> {
        Ok(RuntimeVersion {
            spec_version: 1,
            transaction_version: 1,
        })
    }

    async fn generate_mmr_proof(
        &self,
        block_number: u32,
        at: H256,
    ) -> Result<GeneratedMmrProof> {
        self.proof_requests.lock().push((block_number, at));
        Ok(single_leaf_proof(block_number))
    }

    async fn subscribe_finalized_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<BlockHeader>>> {
        Ok(stream::pending().boxed())
    }
}

#[derive(Default)]
pub struct MockEthereum {
    pub latest_beefy_block: u64,
    pub inbound_nonce: u64,
    pub heads: Vec<u64>,
    /// `NewMMRRoot` relay chain block numbers by Ethereum block.
    pub roots: HashMap<u64, Vec<u64>>,
    pub fail_submission: bool,
    pub submitted: Mutex<Vec<ContractCall>>,
    /// Proof requests seen when the head subscription was opened.
    pub subscribed_after: Mutex<Option<usize>>,
    pub relaychain: Option<std::sync::Arc<MockRelaychain>>,
}

#[async_trait::async_trait]
impl EthereumChain for MockEthereum {
    async fn chain_id(&self) -> Result<u64> {
        Ok(15)
    }

    async fn subscribe_new_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<u64>>> {
        let seen = self
            .relaychain
            .as_ref()
            .map_or(0, |r| r.proof_requests.lock().len());
        *self.subscribed_after.lock() = Some(seen);
        Ok(stream::iter(self.heads.clone().into_iter().map(Ok))
            .chain(stream::pending())
            .boxed())
    }

    async fn filter_logs(&self, filter: LogFilter) -> Result<Vec<Log>> {
        assert_eq!(filter.topic0, NewMmrRootEvent::topic());
        let roots = self.roots.get(&filter.from_block).cloned();
        Ok(roots
            .unwrap_or_default()
            .into_iter()
            .map(|block_number| Log {
                address: filter.address,
                topics: vec![NewMmrRootEvent::topic()],
                data: NewMmrRootEvent::encode_data(
                    TxHash::repeat_byte(0x77),
                    block_number,
                ),
                block_number: Some(filter.from_block.into()),
                ..Default::default()
            })
            .collect())
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes> {
        let number = if call.label == LatestBeefyBlockCall::NAME {
            self.latest_beefy_block
        } else if call.label == InboundChannelNonceCall::NAME {
            self.inbound_nonce
        } else {
            return Ok(Bytes::default());
        };
        Ok(abi::encode(&[Token::Uint(number.into())]).into())
    }

    async fn estimate_gas(&self, _call: &ContractCall) -> Result<U256> {
        Ok(U256::from(100_000))
    }

    async fn submit_transaction(&self, call: &ContractCall) -> Result<TxHash> {
        if self.fail_submission {
            return Err(Error::TransactionReverted("0x01".into()));
        }
        let mut submitted = self.submitted.lock();
        submitted.push(call.clone());
        Ok(TxHash::from_low_u64_be(submitted.len() as u64))
    }
}

pub fn light_client() -> Address {
    Address::repeat_byte(0xbe)
}

pub fn basic_channel() -> Address {
    Address::repeat_byte(0xba)
}

pub fn incentivized_channel() -> Address {
    Address::repeat_byte(0x1c)
}
