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

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sp_core::H256;

/// Details of the next BEEFY authority set.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct BeefyNextAuthoritySet {
    /// Id of the next set.
    pub id: u64,
    /// Number of validators in the set.
    pub len: u32,
    /// Merkle root of the validators' Ethereum addresses.
    pub root: H256,
}

/// A leaf of the relay chain MMR.
///
/// The digest hash is the last field of the encoding, which lets the
/// light client rebuild the leaf from a prefix and the digest hash.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct MmrLeaf {
    /// Leaf format version.
    pub version: u8,
    /// Number and hash of the parent block.
    pub parent_number_and_hash: (u32, H256),
    /// The next BEEFY authority set.
    pub beefy_next_authority_set: BeefyNextAuthoritySet,
    /// Hash of the block's auxiliary digest.
    pub digest_hash: H256,
}

/// Inclusion proof of a single leaf.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct MmrProof {
    /// Position of the leaf among all leaves.
    pub leaf_index: u64,
    /// Number of leaves in the MMR the proof was generated for.
    pub leaf_count: u64,
    /// Proof items, peaks included.
    pub items: Vec<H256>,
}

/// A leaf together with its proof.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct MmrLeafProof {
    /// The leaf.
    pub leaf: MmrLeaf,
    /// Its inclusion proof.
    pub proof: MmrProof,
}

/// A proof generated by the relay chain, with the root it proves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMmrProof {
    /// Leaf and proof.
    pub leaf_proof: MmrLeafProof,
    /// The MMR root at the block the proof was generated at.
    pub root: H256,
}

impl MmrLeaf {
    /// Keccak hash of the leaf encoding, the MMR node of this leaf.
    pub fn hash(&self) -> H256 {
        H256(sp_core::hashing::keccak_256(&self.encode()))
    }
}
