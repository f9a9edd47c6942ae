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

use sp_core::H256;

use crate::channel::{AuxiliaryDigest, AuxiliaryDigestItem, ChannelId};
use crate::connection::BlockHeader;
use crate::mmr::MmrLeafProof;

/// A commitment digest item with the messages it commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestItemWithData {
    /// The digest item.
    pub digest_item: AuxiliaryDigestItem,
    /// SCALE encoded message list read from offchain storage.
    pub data: Vec<u8>,
}

/// A finalized relay chain block that carries at least one commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParaBlockWithProofs {
    /// Block number.
    pub block_number: u32,
    /// The block header.
    pub header: BlockHeader,
    /// Commitments of the block, in header order.
    pub digest_items: Vec<DigestItemWithData>,
    /// MMR proof of the block's leaf.
    pub mmr_proof: MmrLeafProof,
    /// Root the proof was generated against.
    pub mmr_root_hash: H256,
}

impl ParaBlockWithProofs {
    /// The auxiliary digest of the block, all commitment items in order.
    pub fn digest(&self) -> AuxiliaryDigest {
        AuxiliaryDigest {
            logs: self.digest_items.iter().map(|d| d.digest_item).collect(),
        }
    }
}

/// One commitment, ready to be submitted to its inbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePackage {
    /// Channel the commitment belongs to.
    pub channel_id: ChannelId,
    /// The commitment hash.
    pub commitment_hash: H256,
    /// SCALE encoded message list.
    pub commitment_data: Vec<u8>,
    /// The block's auxiliary digest.
    pub digest: AuxiliaryDigest,
    /// MMR leaf and inclusion proof.
    pub mmr_proof: MmrLeafProof,
    /// Root the proof was generated against.
    pub mmr_root_hash: H256,
}
