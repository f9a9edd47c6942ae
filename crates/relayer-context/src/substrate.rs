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

use std::time::Duration;

use beefy_relayer_types::connection::{
    Block, BlockHeader, RuntimeVersion, SubstrateChain,
};
use beefy_relayer_types::mmr::{
    GeneratedMmrProof, MmrLeaf, MmrLeafProof, MmrProof,
};
use beefy_relayer_types::rpc_url::WsUrl;
use beefy_relayer_utils::{Error, Result};
use codec::Decode;
use futures::stream::{BoxStream, StreamExt};
use jsonrpsee::core::client::{ClientT, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::Deserialize;
use sp_core::{Bytes, H256};
use sp_runtime::generic::{Digest, DigestItem, Header};
use sp_runtime::traits::BlakeTwo256;

type RpcHeader = Header<u32, BlakeTwo256>;

#[derive(Deserialize)]
struct RpcSignedBlock {
    block: RpcBlock,
}

#[derive(Deserialize)]
struct RpcBlock {
    header: RpcHeader,
    extrinsics: Vec<Bytes>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcRuntimeVersion {
    spec_version: u32,
    transaction_version: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLeavesProof {
    leaves: Bytes,
    proof: Bytes,
}

#[derive(Decode)]
struct LeafProof {
    leaf_indices: Vec<u64>,
    leaf_count: u64,
    items: Vec<H256>,
}

fn other_logs(digest: Digest) -> Vec<Vec<u8>> {
    digest
        .logs
        .into_iter()
        .filter_map(|log| match log {
            DigestItem::Other(data) => Some(data),
            _ => None,
        })
        .collect()
}

fn block_header(header: RpcHeader) -> BlockHeader {
    BlockHeader {
        parent_hash: header.parent_hash,
        number: header.number,
        other_logs: other_logs(header.digest),
    }
}

/// Decodes the `leaves` and `proof` blobs of `mmr_generateProof` for a
/// single requested block.
fn decode_leaf_proof(leaves: &[u8], proof: &[u8]) -> Result<MmrLeafProof> {
    let leaves = Vec::<Vec<u8>>::decode(&mut &leaves[..])?;
    let raw_leaf = leaves.first().ok_or(Error::InvalidProof)?;
    let leaf = MmrLeaf::decode(&mut &raw_leaf[..])?;
    let proof = LeafProof::decode(&mut &proof[..])?;
    let leaf_index =
        proof.leaf_indices.first().copied().ok_or(Error::InvalidProof)?;
    Ok(MmrLeafProof {
        leaf,
        proof: MmrProof {
            leaf_index,
            leaf_count: proof.leaf_count,
            items: proof.items,
        },
    })
}

/// A JSON-RPC websocket client of a relay chain node.
///
/// Commitment payloads are read from the node's persistent offchain
/// storage, so the node must run with offchain indexing enabled.
#[derive(Debug)]
pub struct SubstrateConnection {
    client: WsClient,
}

impl SubstrateConnection {
    /// Connects to `endpoint`.
    pub async fn connect(endpoint: &WsUrl) -> Result<Self> {
        let client = WsClientBuilder::default()
            .connection_timeout(Duration::from_secs(30))
            .request_timeout(Duration::from_secs(60))
            .build(endpoint.as_str())
            .await?;
        tracing::info!(%endpoint, "Connected to relay chain");
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SubstrateChain for SubstrateConnection {
    async fn finalized_head_hash(&self) -> Result<H256> {
        Ok(self
            .client
            .request("chain_getFinalizedHead", rpc_params![])
            .await?)
    }

    async fn block_hash(&self, number: u32) -> Result<H256> {
        let hash: Option<H256> = self
            .client
            .request("chain_getBlockHash", rpc_params![number])
            .await?;
        hash.ok_or(Error::Generic("block hash not found"))
    }

    async fn block(&self, hash: H256) -> Result<Block> {
        let block: Option<RpcSignedBlock> = self
            .client
            .request("chain_getBlock", rpc_params![hash])
            .await?;
        let RpcBlock { header, extrinsics } =
            block.ok_or(Error::Generic("block not found"))?.block;
        Ok(Block {
            header: block_header(header),
            extrinsics: extrinsics.into_iter().map(|x| x.0).collect(),
        })
    }

    async fn header(&self, hash: H256) -> Result<BlockHeader> {
        let header: Option<RpcHeader> = self
            .client
            .request("chain_getHeader", rpc_params![hash])
            .await?;
        header
            .map(block_header)
            .ok_or(Error::Generic("header not found"))
    }

    async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value: Option<Bytes> = self
            .client
            .request("state_getStorage", rpc_params![Bytes(key.to_vec())])
            .await?;
        Ok(value.map(|v| v.0))
    }

    async fn offchain_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value: Option<Bytes> = self
            .client
            .request(
                "offchain_localStorageGet",
                rpc_params!["PERSISTENT", Bytes(key.to_vec())],
            )
            .await?;
        Ok(value.map(|v| v.0))
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion> {
        let version: RpcRuntimeVersion = self
            .client
            .request("state_getRuntimeVersion", rpc_params![])
            .await?;
        Ok(RuntimeVersion {
            spec_version: version.spec_version,
            transaction_version: version.transaction_version,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn generate_mmr_proof(
        &self,
        block_number: u32,
        at: H256,
    ) -> Result<GeneratedMmrProof> {
        let best_known = self.header(at).await?.number;
        let raw: RpcLeavesProof = self
            .client
            .request(
                "mmr_generateProof",
                rpc_params![vec![block_number], Some(best_known), Some(at)],
            )
            .await?;
        let leaf_proof = decode_leaf_proof(&raw.leaves, &raw.proof)?;
        let root: H256 = self
            .client
            .request("mmr_root", rpc_params![Some(at)])
            .await?;
        Ok(GeneratedMmrProof { leaf_proof, root })
    }

    async fn subscribe_finalized_heads<'a>(
        &'a self,
    ) -> Result<BoxStream<'a, Result<BlockHeader>>> {
        let subscription = self
            .client
            .subscribe::<RpcHeader, _>(
                "chain_subscribeFinalizedHeads",
                rpc_params![],
                "chain_unsubscribeFinalizedHeads",
            )
            .await?;
        Ok(subscription
            .map(|header| header.map(block_header).map_err(Error::from))
            .boxed())
    }
}
