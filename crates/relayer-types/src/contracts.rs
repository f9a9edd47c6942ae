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

//! # Contract Calls 📜
//!
//! Every contract function the relayer touches has its own argument struct
//! with fields in ABI order. The struct knows its signature and how to turn
//! itself into tokens, so the call data is built the same way for the dry
//! run, the gas estimate and the real transaction.

use beefy_relayer_utils::{Error, Result};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, Log, H256, U256};
use serde::Serialize;

use crate::connection::ContractCall;

/// A contract function with a fixed argument layout.
pub trait ContractFunction {
    /// Function name, used in logs.
    const NAME: &'static str;
    /// Canonical signature the selector is derived from.
    const SIGNATURE: &'static str;

    /// Arguments as ABI tokens, in declaration order.
    fn tokens(&self) -> Vec<Token>;

    /// Selector followed by the encoded arguments.
    fn calldata(&self) -> Bytes {
        let mut data = ethers::utils::id(Self::SIGNATURE).to_vec();
        data.extend(abi::encode(&self.tokens()));
        data.into()
    }

    /// A call of this function on `to`.
    fn to_call(&self, to: Address) -> ContractCall {
        ContractCall {
            to,
            data: self.calldata(),
            label: Self::NAME,
        }
    }
}

fn bytes32(h: &H256) -> Token {
    Token::FixedBytes(h.as_bytes().to_vec())
}

fn bytes32_array(items: &[H256]) -> Token {
    Token::Array(items.iter().map(bytes32).collect())
}

fn uint_array(items: &[U256]) -> Token {
    Token::Array(items.iter().copied().map(Token::Uint).collect())
}

/// `latestBeefyBlock() returns (uint64)`.
#[derive(Debug, Clone, Default)]
pub struct LatestBeefyBlockCall;

impl ContractFunction for LatestBeefyBlockCall {
    const NAME: &'static str = "latestBeefyBlock";
    const SIGNATURE: &'static str = "latestBeefyBlock()";

    fn tokens(&self) -> Vec<Token> {
        Vec::new()
    }
}

impl LatestBeefyBlockCall {
    /// Decodes the returned block number.
    pub fn decode_output(output: &[u8]) -> Result<u64> {
        let mut tokens = abi::decode(&[ParamType::Uint(64)], output)?;
        tokens
            .pop()
            .and_then(Token::into_uint)
            .map(|n| n.low_u64())
            .ok_or(Error::Generic("latestBeefyBlock returned no number"))
    }
}

/// `nonce() returns (uint64)` of an inbound channel, the nonce of the last
/// delivered message.
#[derive(Debug, Clone, Default)]
pub struct InboundChannelNonceCall;

impl ContractFunction for InboundChannelNonceCall {
    const NAME: &'static str = "nonce";
    const SIGNATURE: &'static str = "nonce()";

    fn tokens(&self) -> Vec<Token> {
        Vec::new()
    }
}

impl InboundChannelNonceCall {
    /// Decodes the returned nonce.
    pub fn decode_output(output: &[u8]) -> Result<u64> {
        let mut tokens = abi::decode(&[ParamType::Uint(64)], output)?;
        tokens
            .pop()
            .and_then(Token::into_uint)
            .map(|n| n.low_u64())
            .ok_or(Error::Generic("nonce returned no number"))
    }
}

/// `createInitialBitfield(uint256[] bitsToSet, uint256 length)`.
#[derive(Debug, Clone)]
pub struct CreateInitialBitfieldCall {
    /// Positions of validators that signed.
    pub bits_to_set: Vec<U256>,
    /// Size of the validator set.
    pub length: U256,
}

impl ContractFunction for CreateInitialBitfieldCall {
    const NAME: &'static str = "createInitialBitfield";
    const SIGNATURE: &'static str = "createInitialBitfield(uint256[],uint256)";

    fn tokens(&self) -> Vec<Token> {
        vec![uint_array(&self.bits_to_set), Token::Uint(self.length)]
    }
}

/// `createRandomBitfield(uint256 id)`.
#[derive(Debug, Clone)]
pub struct CreateRandomBitfieldCall {
    /// Contract id of the in-flight verification.
    pub id: U256,
}

impl ContractFunction for CreateRandomBitfieldCall {
    const NAME: &'static str = "createRandomBitfield";
    const SIGNATURE: &'static str = "createRandomBitfield(uint256)";

    fn tokens(&self) -> Vec<Token> {
        vec![Token::Uint(self.id)]
    }
}

/// Decodes a `uint256[]` bitfield returned by either bitfield call.
pub fn decode_bitfield(output: &[u8]) -> Result<Vec<U256>> {
    let param = ParamType::Array(Box::new(ParamType::Uint(256)));
    let mut tokens = abi::decode(&[param], output)?;
    let words = tokens
        .pop()
        .and_then(Token::into_array)
        .ok_or(Error::Generic("bitfield call returned no array"))?;
    words
        .into_iter()
        .map(|t| t.into_uint().ok_or(Error::Generic("bitfield word")))
        .collect()
}

/// `newSignatureCommitment(...)`, the initial verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSignatureCommitmentCall {
    /// Keccak hash of the commitment.
    pub commitment_hash: H256,
    /// The initial bitfield.
    pub validator_claims_bitfield: Vec<U256>,
    /// Claimant's signature with an Ethereum recovery id.
    pub validator_signature: Bytes,
    /// Claimant's position in the validator set.
    pub validator_position: U256,
    /// Claimant's address.
    pub validator_public_key: Address,
    /// Claimant's merkle proof in the validator set.
    pub validator_public_key_merkle_proof: Vec<H256>,
}

impl ContractFunction for NewSignatureCommitmentCall {
    const NAME: &'static str = "newSignatureCommitment";
    const SIGNATURE: &'static str =
        "newSignatureCommitment(bytes32,uint256[],bytes,uint256,address,bytes32[])";

    fn tokens(&self) -> Vec<Token> {
        vec![
            bytes32(&self.commitment_hash),
            uint_array(&self.validator_claims_bitfield),
            Token::Bytes(self.validator_signature.to_vec()),
            Token::Uint(self.validator_position),
            Token::Address(self.validator_public_key),
            bytes32_array(&self.validator_public_key_merkle_proof),
        ]
    }
}

/// `(bytes32 payload, uint64 blockNumber, uint32 validatorSetId)`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentTuple {
    /// MMR root.
    pub payload: H256,
    /// Block number.
    pub block_number: u64,
    /// Validator set id.
    pub validator_set_id: u32,
}

/// The signatures picked by the random bitfield.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorProof {
    /// Signatures with Ethereum recovery ids.
    pub signatures: Vec<Bytes>,
    /// Validator positions.
    pub positions: Vec<U256>,
    /// Validator addresses.
    pub public_keys: Vec<Address>,
    /// Merkle proof per address.
    pub public_key_merkle_proofs: Vec<Vec<H256>>,
}

/// The MMR leaf as the light client decodes it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeefyMmrLeafTuple {
    /// Leaf version.
    pub version: u8,
    /// Parent number.
    pub parent_number: u32,
    /// Parent hash.
    pub parent_hash: H256,
    /// Next authority set id.
    pub next_authority_set_id: u64,
    /// Next authority set size.
    pub next_authority_set_len: u32,
    /// Next authority set root.
    pub next_authority_set_root: H256,
    /// Digest hash.
    pub digest_hash: H256,
}

/// `completeSignatureCommitment(...)`, the final verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignatureCommitmentCall {
    /// Contract id of the in-flight verification.
    pub id: U256,
    /// The commitment.
    pub commitment: CommitmentTuple,
    /// Signatures selected by the random bitfield.
    pub validator_proof: ValidatorProof,
    /// Latest MMR leaf.
    pub latest_mmr_leaf: BeefyMmrLeafTuple,
    /// Leaf index.
    pub mmr_leaf_index: U256,
    /// Leaf count.
    pub mmr_leaf_count: U256,
    /// Proof items.
    pub mmr_proof_items: Vec<H256>,
}

impl ContractFunction for CompleteSignatureCommitmentCall {
    const NAME: &'static str = "completeSignatureCommitment";
    const SIGNATURE: &'static str = "completeSignatureCommitment(uint256,(bytes32,uint64,uint32),(bytes[],uint256[],address[],bytes32[][]),(uint8,uint32,bytes32,uint64,uint32,bytes32,bytes32),uint256,uint256,bytes32[])";

    fn tokens(&self) -> Vec<Token> {
        let commitment = Token::Tuple(vec![
            bytes32(&self.commitment.payload),
            Token::Uint(self.commitment.block_number.into()),
            Token::Uint(self.commitment.validator_set_id.into()),
        ]);
        let proof = &self.validator_proof;
        let validator_proof = Token::Tuple(vec![
            Token::Array(
                proof
                    .signatures
                    .iter()
                    .map(|s| Token::Bytes(s.to_vec()))
                    .collect(),
            ),
            uint_array(&proof.positions),
            Token::Array(
                proof
                    .public_keys
                    .iter()
                    .copied()
                    .map(Token::Address)
                    .collect(),
            ),
            Token::Array(
                proof
                    .public_key_merkle_proofs
                    .iter()
                    .map(|p| bytes32_array(p))
                    .collect(),
            ),
        ]);
        let leaf = &self.latest_mmr_leaf;
        let leaf = Token::Tuple(vec![
            Token::Uint(leaf.version.into()),
            Token::Uint(leaf.parent_number.into()),
            bytes32(&leaf.parent_hash),
            Token::Uint(leaf.next_authority_set_id.into()),
            Token::Uint(leaf.next_authority_set_len.into()),
            bytes32(&leaf.next_authority_set_root),
            bytes32(&leaf.digest_hash),
        ]);
        vec![
            Token::Uint(self.id),
            commitment,
            validator_proof,
            leaf,
            Token::Uint(self.mmr_leaf_index),
            Token::Uint(self.mmr_leaf_count),
            bytes32_array(&self.mmr_proof_items),
        ]
    }
}

/// A message of the basic inbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicInboundMessage {
    /// Target application.
    pub target: Address,
    /// Channel nonce.
    pub nonce: u64,
    /// Payload.
    pub payload: Bytes,
}

impl BasicInboundMessage {
    /// `(address,uint64,bytes)`.
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.target),
            Token::Uint(self.nonce.into()),
            Token::Bytes(self.payload.to_vec()),
        ])
    }
}

/// A message of the incentivized inbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncentivizedInboundMessage {
    /// Target application.
    pub target: Address,
    /// Channel nonce.
    pub nonce: u64,
    /// Relayer fee.
    pub fee: U256,
    /// Payload.
    pub payload: Bytes,
}

impl IncentivizedInboundMessage {
    /// `(address,uint64,uint256,bytes)`.
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.target),
            Token::Uint(self.nonce.into()),
            Token::Uint(self.fee),
            Token::Bytes(self.payload.to_vec()),
        ])
    }
}

/// Byte ranges the light client rebuilds the digest and leaf from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafBytes {
    /// Digest bytes before the commitment hash.
    pub digest_prefix: Bytes,
    /// Digest bytes after the commitment hash.
    pub digest_suffix: Bytes,
    /// Leaf bytes before the digest hash.
    pub leaf_prefix: Bytes,
}

impl LeafBytes {
    fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Bytes(self.digest_prefix.to_vec()),
            Token::Bytes(self.digest_suffix.to_vec()),
            Token::Bytes(self.leaf_prefix.to_vec()),
        ])
    }
}

/// `submit(...)` of an inbound channel, generic over the message kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCall<M> {
    /// Messages of the commitment.
    pub messages: Vec<M>,
    /// Digest and leaf byte ranges.
    pub leaf_bytes: LeafBytes,
    /// MMR leaf index.
    pub leaf_index: U256,
    /// MMR leaf count.
    pub leaf_count: U256,
    /// MMR proof items.
    pub proof: Vec<H256>,
}

impl<M> SubmitCall<M> {
    fn tokens_with(&self, message: impl Fn(&M) -> Token) -> Vec<Token> {
        vec![
            Token::Array(self.messages.iter().map(message).collect()),
            self.leaf_bytes.to_token(),
            Token::Uint(self.leaf_index),
            Token::Uint(self.leaf_count),
            bytes32_array(&self.proof),
        ]
    }
}

/// Basic inbound channel `submit`.
pub type BasicSubmitCall = SubmitCall<BasicInboundMessage>;
/// Incentivized inbound channel `submit`.
pub type IncentivizedSubmitCall = SubmitCall<IncentivizedInboundMessage>;

impl ContractFunction for BasicSubmitCall {
    const NAME: &'static str = "submit";
    const SIGNATURE: &'static str = "submit((address,uint64,bytes)[],(bytes,bytes,bytes),uint256,uint256,bytes32[])";

    fn tokens(&self) -> Vec<Token> {
        self.tokens_with(BasicInboundMessage::to_token)
    }
}

impl ContractFunction for IncentivizedSubmitCall {
    const NAME: &'static str = "submit";
    const SIGNATURE: &'static str = "submit((address,uint64,uint256,bytes)[],(bytes,bytes,bytes),uint256,uint256,bytes32[])";

    fn tokens(&self) -> Vec<Token> {
        self.tokens_with(IncentivizedInboundMessage::to_token)
    }
}

/// `NewMMRRoot(bytes32 mmrRoot, uint64 blockNumber)`, emitted by the light
/// client once a commitment is fully verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMmrRootEvent {
    /// The verified MMR root.
    pub mmr_root: H256,
    /// Relay chain block the root belongs to.
    pub block_number: u64,
    /// Ethereum block the event was emitted in.
    pub eth_block_number: Option<u64>,
    /// Ethereum transaction that emitted the event.
    pub eth_tx_hash: Option<H256>,
}

impl NewMmrRootEvent {
    /// Event signature.
    pub const SIGNATURE: &'static str = "NewMMRRoot(bytes32,uint64)";

    /// The `topic0` of the event.
    pub fn topic() -> H256 {
        H256(ethers::utils::keccak256(Self::SIGNATURE))
    }

    /// Decodes the non-indexed event fields from `log`.
    pub fn decode_log(log: &Log) -> Result<Self> {
        let mut tokens = abi::decode(
            &[ParamType::FixedBytes(32), ParamType::Uint(64)],
            &log.data,
        )?
        .into_iter();
        let mmr_root = tokens
            .next()
            .and_then(Token::into_fixed_bytes)
            .map(|b| H256::from_slice(&b))
            .ok_or(Error::Generic("NewMMRRoot without root"))?;
        let block_number = tokens
            .next()
            .and_then(Token::into_uint)
            .map(|n| n.low_u64())
            .ok_or(Error::Generic("NewMMRRoot without block number"))?;
        Ok(Self {
            mmr_root,
            block_number,
            eth_block_number: log.block_number.map(|n| n.as_u64()),
            eth_tx_hash: log.transaction_hash,
        })
    }

    /// Encodes the event data, the inverse of [`Self::decode_log`].
    pub fn encode_data(mmr_root: H256, block_number: u64) -> Bytes {
        abi::encode(&[bytes32(&mmr_root), Token::Uint(block_number.into())])
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_prefix_of_calldata() {
        let call = CreateRandomBitfieldCall { id: U256::from(3) };
        let data = call.calldata();
        let selector = ethers::utils::id(CreateRandomBitfieldCall::SIGNATURE);
        assert_eq!(&data[..4], &selector);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 3);
    }

    #[test]
    fn bitfield_output_decodes() {
        let output = abi::encode(&[uint_array(&[U256::from(5), U256::one()])]);
        assert_eq!(
            decode_bitfield(&output).unwrap(),
            vec![U256::from(5), U256::one()]
        );
    }

    #[test]
    fn latest_beefy_block_decodes() {
        let output = abi::encode(&[Token::Uint(77u64.into())]);
        assert_eq!(LatestBeefyBlockCall::decode_output(&output).unwrap(), 77);
    }

    #[test]
    fn inbound_nonce_decodes() {
        let output = abi::encode(&[Token::Uint(12u64.into())]);
        assert_eq!(InboundChannelNonceCall::decode_output(&output).unwrap(), 12);
        assert_eq!(InboundChannelNonceCall.calldata().len(), 4);
    }

    #[test]
    fn new_mmr_root_event_decodes() {
        let log = Log {
            data: NewMmrRootEvent::encode_data(H256::repeat_byte(1), 99),
            block_number: Some(12u64.into()),
            ..Default::default()
        };
        let event = NewMmrRootEvent::decode_log(&log).unwrap();
        assert_eq!(event.mmr_root, H256::repeat_byte(1));
        assert_eq!(event.block_number, 99);
        assert_eq!(event.eth_block_number, Some(12));
    }

    #[test]
    fn submit_encodes_five_arguments() {
        let call = BasicSubmitCall {
            messages: vec![BasicInboundMessage {
                target: Address::repeat_byte(1),
                nonce: 1,
                payload: vec![0xaa].into(),
            }],
            leaf_bytes: LeafBytes::default(),
            leaf_index: U256::zero(),
            leaf_count: U256::one(),
            proof: vec![],
        };
        let tokens = call.tokens();
        assert_eq!(tokens.len(), 5);
        let params = [
            ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Uint(64),
                ParamType::Bytes,
            ]))),
            ParamType::Tuple(vec![
                ParamType::Bytes,
                ParamType::Bytes,
                ParamType::Bytes,
            ]),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::FixedBytes(32))),
        ];
        let decoded = abi::decode(&params, &call.calldata()[4..]).unwrap();
        assert_eq!(decoded, tokens);
    }
}
