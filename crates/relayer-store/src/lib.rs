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

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! # Relayer Store Module 🕸️
//!
//! A module for managing the storage of the relayer.
//!
//! ## Overview
//!
//! The store keeps one [`BeefyRelayInfo`] record per BEEFY round, keyed by
//! the commitment hash. Records only ever move forward through
//! [`CommitmentStatus`], one status at a time. Both backends enforce that
//! on every write.
use beefy_relayer_types::beefy::{
    BeefyRelayInfo, CommitmentStatus, RecordUpdate,
};
use beefy_relayer_utils::{Error, Result};
use sp_core::H256;

/// A module for managing in-memory storage of the relayer.
pub mod mem;
/// A module for setting up and managing a [Sled](https://sled.rs)-based database.
pub mod sled;

/// A store that uses [`sled`](https://sled.rs) as the backend.
pub use self::sled::SledStore;
/// A store that uses in memory data structures as the backend.
pub use mem::InMemoryStore;

/// The durable record of in-flight BEEFY commitments.
pub trait CommitmentStore: Clone + Send + Sync {
    /// Inserts `record`.
    ///
    /// An existing record is replaced only if `record` is exactly one
    /// status ahead of it, otherwise this fails with [`Error::RecordExists`].
    fn create(&self, record: &BeefyRelayInfo) -> Result<()>;

    /// Moves the record under `key` one status forward and applies the field
    /// changes. Skipping a status fails with [`Error::StatusRegression`].
    fn update(&self, key: H256, update: &RecordUpdate) -> Result<()>;

    /// The record under `key`, if any.
    fn get(&self, key: H256) -> Result<Option<BeefyRelayInfo>>;

    /// All records whose status is one of `statuses`, ordered by block
    /// number.
    fn records_with_status(
        &self,
        statuses: &[CommitmentStatus],
    ) -> Result<Vec<BeefyRelayInfo>>;
}

/// Whether `record` may replace `existing`.
///
/// A replace is one protocol step, the same as an update.
pub(crate) fn check_create(
    existing: Option<&BeefyRelayInfo>,
    record: &BeefyRelayInfo,
) -> Result<()> {
    match existing {
        Some(existing) if existing.status.next() != Some(record.status) => {
            Err(Error::RecordExists)
        }
        _ => Ok(()),
    }
}

/// Whether a record in `current` may move to `requested`.
pub(crate) fn check_update(
    current: CommitmentStatus,
    requested: CommitmentStatus,
) -> Result<()> {
    if current.next() == Some(requested) {
        Ok(())
    } else {
        Err(Error::StatusRegression {
            current: current.to_string(),
            requested: requested.to_string(),
        })
    }
}

pub(crate) fn sort_by_block(records: &mut [BeefyRelayInfo]) {
    records.sort_by_key(|r| r.signed_commitment.commitment.block_number);
}

#[cfg(test)]
pub(crate) mod test_utils {
    use beefy_relayer_types::beefy::{
        BeefySignature, Commitment, SignedCommitment,
    };
    use ethers::types::H256 as TxHash;

    use super::*;

    pub fn record(block_number: u32) -> BeefyRelayInfo {
        BeefyRelayInfo::witnessed(
            SignedCommitment {
                commitment: Commitment {
                    payload: H256::repeat_byte(block_number as u8),
                    block_number,
                    validator_set_id: 1,
                },
                signatures: vec![Some(BeefySignature([1; 65])), None],
            },
            vec![],
        )
    }

    /// The forward-only rules every backend has to honour.
    pub fn exercise_store<S: CommitmentStore>(store: S) {
        let witnessed = record(10);
        let key = witnessed.key();
        store.create(&witnessed).unwrap();
        assert!(matches!(
            store.create(&witnessed),
            Err(Error::RecordExists)
        ));

        // no skipping ahead, through either write
        let mut ready = witnessed.clone();
        ready.status = CommitmentStatus::ReadyToComplete;
        assert!(matches!(store.create(&ready), Err(Error::RecordExists)));
        let skip = store
            .update(key, &RecordUpdate::completed(TxHash::repeat_byte(9)))
            .unwrap_err();
        assert!(matches!(skip, Error::StatusRegression { .. }));
        assert_eq!(
            store.get(key).unwrap().map(|r| r.status),
            Some(CommitmentStatus::CommitmentWitnessed)
        );

        let mut sent = witnessed.clone();
        sent.status = CommitmentStatus::InitialVerificationTxSent;
        sent.initial_verification_tx_hash = Some(TxHash::repeat_byte(1));
        store.create(&sent).unwrap();
        assert_eq!(store.get(key).unwrap(), Some(sent.clone()));

        // a late witness does not roll the record back
        assert!(matches!(
            store.create(&witnessed),
            Err(Error::RecordExists)
        ));

        store.update(key, &RecordUpdate::ready_to_complete(3)).unwrap();
        let err = store
            .update(
                key,
                &RecordUpdate::status(CommitmentStatus::ReadyToComplete),
            )
            .unwrap_err();
        assert!(matches!(err, Error::StatusRegression { .. }));

        store
            .update(key, &RecordUpdate::completed(TxHash::repeat_byte(2)))
            .unwrap();
        let stored = store.get(key).unwrap().unwrap();
        assert_eq!(stored.status, CommitmentStatus::CompleteVerificationTxSent);
        assert_eq!(stored.contract_id, 3);
        assert_eq!(
            stored.initial_verification_tx_hash,
            Some(TxHash::repeat_byte(1))
        );

        assert!(matches!(
            store.update(
                H256::zero(),
                &RecordUpdate::status(CommitmentStatus::ReadyToComplete)
            ),
            Err(Error::RecordNotFound)
        ));

        store.create(&record(12)).unwrap();
        store.create(&record(11)).unwrap();
        let witnessed = store
            .records_with_status(&[CommitmentStatus::CommitmentWitnessed])
            .unwrap();
        let blocks: Vec<u32> = witnessed
            .iter()
            .map(|r| r.signed_commitment.commitment.block_number)
            .collect();
        assert_eq!(blocks, vec![11, 12]);
    }
}
