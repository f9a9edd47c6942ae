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

//! BEEFY justifications and the commitment records built from them.

use codec::{Decode, Encode};
use ethers::types::{Address, H256 as TxHash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sp_core::H256;

use crate::mmr::MmrLeafProof;

/// A commitment signed by the BEEFY validators.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct Commitment {
    /// The MMR root at `block_number`.
    pub payload: H256,
    /// The finalized block the commitment is about.
    pub block_number: u32,
    /// Id of the validator set that signed.
    pub validator_set_id: u64,
}

impl Commitment {
    /// Keccak hash of the SCALE encoding, as signed by the validators.
    pub fn hash(&self) -> H256 {
        H256(sp_core::hashing::keccak_256(&self.encode()))
    }
}

/// A recoverable secp256k1 signature, `r || s || v` with `v` in `{0, 1}`.
#[derive(Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct BeefySignature(pub [u8; 65]);

impl std::fmt::Debug for BeefySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for BeefySignature {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for BeefySignature {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = String::deserialize(d)?;
        let raw = value.strip_prefix("0x").unwrap_or(&value);
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(raw, &mut bytes)
            .map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// A commitment with one optional signature per validator of the set.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct SignedCommitment {
    /// The signed commitment.
    pub commitment: Commitment,
    /// Signatures, indexed by validator position.
    pub signatures: Vec<Option<BeefySignature>>,
}

impl SignedCommitment {
    /// Positions of validators that signed, in ascending order.
    pub fn signer_positions(&self) -> Vec<usize> {
        self.signatures
            .iter()
            .enumerate()
            .filter_map(|(i, sig)| sig.is_some().then_some(i))
            .collect()
    }
}

/// Progress of a commitment through the two-phase verification.
///
/// The variants are declared in protocol order, so `Ord` is the only
/// allowed direction of travel.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum CommitmentStatus {
    /// A justification has been seen on the relay chain.
    CommitmentWitnessed,
    /// `newSignatureCommitment` has been submitted.
    InitialVerificationTxSent,
    /// The light client's block delay has passed.
    ReadyToComplete,
    /// `completeSignatureCommitment` has been submitted.
    CompleteVerificationTxSent,
}

impl CommitmentStatus {
    /// The only status a record in `self` may move to.
    pub fn next(self) -> Option<CommitmentStatus> {
        use CommitmentStatus::*;
        match self {
            CommitmentWitnessed => Some(InitialVerificationTxSent),
            InitialVerificationTxSent => Some(ReadyToComplete),
            ReadyToComplete => Some(CompleteVerificationTxSent),
            CompleteVerificationTxSent => None,
        }
    }
}

impl std::fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The stored record of one BEEFY round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeefyRelayInfo {
    /// Where the record is in the protocol.
    pub status: CommitmentStatus,
    /// The justification.
    pub signed_commitment: SignedCommitment,
    /// Ethereum addresses of the validator set, by position.
    pub validator_addresses: Vec<Address>,
    /// Id the light client assigned to the in-flight verification.
    pub contract_id: u64,
    /// Hash of the `newSignatureCommitment` transaction.
    pub initial_verification_tx_hash: Option<TxHash>,
    /// Hash of the `completeSignatureCommitment` transaction.
    pub complete_verification_tx_hash: Option<TxHash>,
    /// Latest MMR leaf and its proof, needed by the complete phase.
    pub mmr_leaf_proof: Option<MmrLeafProof>,
}

impl BeefyRelayInfo {
    /// A freshly witnessed justification.
    pub fn witnessed(
        signed_commitment: SignedCommitment,
        validator_addresses: Vec<Address>,
    ) -> Self {
        Self {
            status: CommitmentStatus::CommitmentWitnessed,
            signed_commitment,
            validator_addresses,
            contract_id: 0,
            initial_verification_tx_hash: None,
            complete_verification_tx_hash: None,
            mmr_leaf_proof: None,
        }
    }

    /// Store key of the record, the commitment hash.
    pub fn key(&self) -> H256 {
        self.signed_commitment.commitment.hash()
    }

    /// Applies `update` in place. Ordering checks are up to the store.
    pub fn apply(&mut self, update: &RecordUpdate) {
        self.status = update.status;
        if let Some(hash) = update.initial_verification_tx_hash {
            self.initial_verification_tx_hash = Some(hash);
        }
        if let Some(hash) = update.complete_verification_tx_hash {
            self.complete_verification_tx_hash = Some(hash);
        }
        if let Some(id) = update.contract_id {
            self.contract_id = id;
        }
    }
}

/// Field changes of a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    /// The new status.
    pub status: CommitmentStatus,
    /// Set the initial tx hash.
    pub initial_verification_tx_hash: Option<TxHash>,
    /// Set the complete tx hash.
    pub complete_verification_tx_hash: Option<TxHash>,
    /// Set the contract id.
    pub contract_id: Option<u64>,
}

impl RecordUpdate {
    /// Only move the status.
    pub fn status(status: CommitmentStatus) -> Self {
        Self {
            status,
            initial_verification_tx_hash: None,
            complete_verification_tx_hash: None,
            contract_id: None,
        }
    }

    /// The initial phase has been submitted in `tx_hash`.
    pub fn initial_sent(tx_hash: TxHash) -> Self {
        Self {
            initial_verification_tx_hash: Some(tx_hash),
            ..Self::status(CommitmentStatus::InitialVerificationTxSent)
        }
    }

    /// The complete phase has been submitted in `tx_hash`.
    pub fn completed(tx_hash: TxHash) -> Self {
        Self {
            complete_verification_tx_hash: Some(tx_hash),
            ..Self::status(CommitmentStatus::CompleteVerificationTxSent)
        }
    }

    /// The light client assigned `contract_id` and the block delay passed.
    pub fn ready_to_complete(contract_id: u64) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Self::status(CommitmentStatus::ReadyToComplete)
        }
    }
}
