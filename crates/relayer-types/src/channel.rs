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

//! Outbound channel types as they are committed on the relay chain.

use beefy_relayer_utils::Error;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sp_core::{H160, H256, U256};

/// Prefix of the offchain storage key under which a commitment's messages
/// are indexed.
pub const COMMITMENT_INDEXING_PREFIX: &[u8] = b"commitment";

/// The outbound channel a commitment belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
pub enum ChannelId {
    /// Messages without a fee.
    Basic,
    /// Messages carrying a relayer fee.
    Incentivized,
}

impl TryFrom<u8> for ChannelId {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ChannelId::Basic),
            1 => Ok(ChannelId::Incentivized),
            other => Err(Error::InvalidChannelId(other)),
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::Basic => write!(f, "basic"),
            ChannelId::Incentivized => write!(f, "incentivized"),
        }
    }
}

/// An item of the auxiliary digest, deposited by an outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum AuxiliaryDigestItem {
    /// A batch of messages has been committed.
    Commitment(ChannelId, H256),
}

/// Outcome of reading one `Other` header digest log.
#[derive(Debug)]
pub enum DigestLog {
    /// The log is a channel commitment.
    Commitment(AuxiliaryDigestItem),
    /// The log belongs to some other pallet.
    Foreign,
}

impl AuxiliaryDigestItem {
    /// The channel this item was emitted by.
    pub fn channel_id(&self) -> ChannelId {
        match self {
            AuxiliaryDigestItem::Commitment(id, _) => *id,
        }
    }

    /// The commitment hash carried by this item.
    pub fn commitment_hash(&self) -> H256 {
        match self {
            AuxiliaryDigestItem::Commitment(_, hash) => *hash,
        }
    }

    /// Reads an `Other` digest log.
    ///
    /// Logs of other pallets are reported as [`DigestLog::Foreign`]. A log
    /// shaped like a commitment whose channel tag is unknown is an error.
    pub fn from_digest_log(log: &[u8]) -> Result<DigestLog, Error> {
        // variant index, channel tag, 32 bytes of hash
        if log.len() != 34 || log[0] != 0 {
            return Ok(DigestLog::Foreign);
        }
        let channel_id = ChannelId::try_from(log[1])?;
        let hash = H256::from_slice(&log[2..]);
        Ok(DigestLog::Commitment(AuxiliaryDigestItem::Commitment(
            channel_id, hash,
        )))
    }

    /// Offchain storage key of the messages behind this commitment.
    pub fn offchain_key(&self) -> Vec<u8> {
        match self {
            AuxiliaryDigestItem::Commitment(channel_id, hash) => {
                (COMMITMENT_INDEXING_PREFIX, channel_id, hash).encode()
            }
        }
    }
}

/// All commitment items of one block, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct AuxiliaryDigest {
    /// The digest items.
    pub logs: Vec<AuxiliaryDigestItem>,
}

impl AuxiliaryDigest {
    /// Keccak hash of the encoding, the `digest_hash` of the MMR leaf.
    pub fn hash(&self) -> H256 {
        H256(sp_core::hashing::keccak_256(&self.encode()))
    }
}

/// A message of the basic outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BasicOutboundMessage {
    /// Target application on the Ethereum side.
    pub target: H160,
    /// Replay protection and ordering.
    pub nonce: u64,
    /// Payload for the target application.
    pub payload: Vec<u8>,
}

/// A message of the incentivized outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct IncentivizedOutboundMessage {
    /// Target application on the Ethereum side.
    pub target: H160,
    /// Replay protection and ordering.
    pub nonce: u64,
    /// Fee paid to the relayer.
    pub fee: U256,
    /// Payload for the target application.
    pub payload: Vec<u8>,
}
