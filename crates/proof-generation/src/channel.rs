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
// You should have received a copy of the GNU General Public License
// along with Tangle.  If not, see <http://www.gnu.org/licenses/>.

use beefy_relayer_types::channel::{
    BasicOutboundMessage, ChannelId, IncentivizedOutboundMessage,
};
use beefy_relayer_types::contracts::{
    BasicInboundMessage, IncentivizedInboundMessage,
};
use beefy_relayer_utils::{Error, Result};
use codec::DecodeAll;
use ethers::abi::{self, Token};
use ethers::types::Address;
use sp_core::hashing::keccak_256;
use sp_core::H256;

/// Messages of one commitment, in the inbound channel's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessages {
    /// Basic channel messages.
    Basic(Vec<BasicInboundMessage>),
    /// Incentivized channel messages.
    Incentivized(Vec<IncentivizedInboundMessage>),
}

fn basic_inbound(message: BasicOutboundMessage) -> BasicInboundMessage {
    BasicInboundMessage {
        target: Address::from(message.target.0),
        nonce: message.nonce,
        payload: message.payload.into(),
    }
}

fn incentivized_inbound(
    message: IncentivizedOutboundMessage,
) -> IncentivizedInboundMessage {
    IncentivizedInboundMessage {
        target: Address::from(message.target.0),
        nonce: message.nonce,
        fee: crate::eth_u256(message.fee),
        payload: message.payload.into(),
    }
}

impl InboundMessages {
    /// Decodes the SCALE message list stored for a `channel_id` commitment.
    ///
    /// The list must use up all of `data`.
    pub fn decode(channel_id: ChannelId, data: &[u8]) -> Result<Self> {
        let mut input = data;
        let messages = match channel_id {
            ChannelId::Basic => Self::Basic(
                Vec::<BasicOutboundMessage>::decode_all(&mut input)?
                    .into_iter()
                    .map(basic_inbound)
                    .collect(),
            ),
            ChannelId::Incentivized => Self::Incentivized(
                Vec::<IncentivizedOutboundMessage>::decode_all(
                    &mut input,
                )?
                    .into_iter()
                    .map(incentivized_inbound)
                    .collect(),
            ),
        };
        Ok(messages)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        match self {
            Self::Basic(messages) => messages.len(),
            Self::Incentivized(messages) => messages.len(),
        }
    }

    /// Whether there are no messages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest nonce among the messages.
    pub fn last_nonce(&self) -> Option<u64> {
        match self {
            Self::Basic(messages) => messages.iter().map(|m| m.nonce).max(),
            Self::Incentivized(messages) => {
                messages.iter().map(|m| m.nonce).max()
            }
        }
    }

    /// Keccak hash of the ABI encoded message array, as committed by the
    /// outbound channel.
    pub fn commitment_hash(&self) -> H256 {
        let tokens = match self {
            Self::Basic(messages) => {
                messages.iter().map(BasicInboundMessage::to_token).collect()
            }
            Self::Incentivized(messages) => messages
                .iter()
                .map(IncentivizedInboundMessage::to_token)
                .collect(),
        };
        H256(keccak_256(&abi::encode(&[Token::Array(tokens)])))
    }
}

/// Decodes `data` and checks it against the digest's `commitment_hash`.
pub fn verify_commitment(
    channel_id: ChannelId,
    commitment_hash: H256,
    data: &[u8],
) -> Result<InboundMessages> {
    let messages = InboundMessages::decode(channel_id, data)?;
    let computed = messages.commitment_hash();
    if computed != commitment_hash {
        return Err(Error::CommitmentMismatch {
            expected: commitment_hash,
            computed,
        });
    }
    Ok(messages)
}
