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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beefy_proof_generation::eth_h256;
use beefy_proof_generation::validator::{
    bitfield_to_string, bits_to_set, build_validator_proof, eth_signature,
    validator_merkle_proof,
};
use beefy_relayer_store::CommitmentStore;
use beefy_relayer_tx_queue::evm::EvmTxDispatcher;
use beefy_relayer_types::beefy::{
    BeefyRelayInfo, CommitmentStatus, RecordUpdate,
};
use beefy_relayer_types::connection::EthereumChain;
use beefy_relayer_types::contracts::{
    decode_bitfield, BeefyMmrLeafTuple, CommitmentTuple,
    CompleteSignatureCommitmentCall, ContractFunction,
    CreateInitialBitfieldCall, CreateRandomBitfieldCall,
    NewSignatureCommitmentCall,
};
use beefy_relayer_utils::{probe, Error, Result};
use ethers::types::{Address, U256};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The id the light client will assign to the next completed verification.
///
/// Clones share the counter. It only moves through [`Self::try_advance`].
#[derive(Debug, Clone)]
pub struct ContractIdSequence(Arc<AtomicU64>);

impl ContractIdSequence {
    /// A sequence expecting `start` next.
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    /// The id expected next.
    pub fn expected(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Moves from `id` to `id + 1` if `id` is the expected one.
    pub fn try_advance(&self, id: u64) -> bool {
        self.0
            .compare_exchange(id, id + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Drives commitment records through the two verification phases of the
/// light client.
pub struct BeefyEthereumWriter<E: ?Sized, S> {
    dispatcher: EvmTxDispatcher<E>,
    store: S,
    light_client: Address,
    contract_ids: ContractIdSequence,
    rate_limit: Duration,
    commitments: mpsc::Receiver<BeefyRelayInfo>,
    token: CancellationToken,
}

impl<E, S> BeefyEthereumWriter<E, S>
where
    E: EthereumChain + ?Sized,
    S: CommitmentStore,
{
    /// Creates a new writer reading from `commitments`.
    pub fn new(
        dispatcher: EvmTxDispatcher<E>,
        store: S,
        light_client: Address,
        contract_ids: ContractIdSequence,
        rate_limit: Duration,
        commitments: mpsc::Receiver<BeefyRelayInfo>,
        token: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            store,
            light_client,
            contract_ids,
            rate_limit,
            commitments,
            token,
        }
    }

    /// Runs until the commitment channel closes, the token is cancelled or
    /// a contract call fails.
    #[tracing::instrument(skip_all, fields(light_client = %self.light_client))]
    pub async fn run(mut self) -> Result<()> {
        let result = self.write_loop().await;
        tracing::info!(
            reason = ?result.as_ref().err(),
            "Shutting down beefy ethereum writer"
        );
        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    async fn write_loop(&mut self) -> Result<()> {
        loop {
            let info = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Error::Cancelled),
                info = self.commitments.recv() => info,
            };
            let Some(info) = info else {
                tracing::debug!("Commitment channel closed");
                return Ok(());
            };
            self.write(&info).await?;
        }
    }

    /// Runs the phase `info`'s status calls for.
    pub async fn write(&self, info: &BeefyRelayInfo) -> Result<()> {
        match info.status {
            CommitmentStatus::CommitmentWitnessed => {
                self.write_initial_verification(info).await
            }
            CommitmentStatus::ReadyToComplete => {
                self.write_complete_verification(info).await
            }
            status => {
                tracing::debug!(
                    %status,
                    block_number = info.signed_commitment.commitment.block_number,
                    "Nothing to do for commitment"
                );
                Ok(())
            }
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(block_number = info.signed_commitment.commitment.block_number)
    )]
    async fn write_initial_verification(
        &self,
        info: &BeefyRelayInfo,
    ) -> Result<()> {
        let signed = &info.signed_commitment;
        let positions = signed.signer_positions();
        let claimant = *positions.first().ok_or(Error::NoSigners)?;

        let initial = CreateInitialBitfieldCall {
            bits_to_set: bits_to_set(&positions),
            length: U256::from(signed.signatures.len()),
        };
        let output = self
            .dispatcher
            .chain()
            .call(&initial.to_call(self.light_client))
            .await?;
        let bitfield = decode_bitfield(&output)?;
        tracing::debug!(
            bitfield = %bitfield_to_string(&bitfield),
            claimant,
            "Initial bitfield"
        );

        let signature = signed
            .signatures
            .get(claimant)
            .and_then(Option::as_ref)
            .ok_or(Error::MissingSignature(claimant))?;
        let public_key = info
            .validator_addresses
            .get(claimant)
            .copied()
            .ok_or(Error::ValidatorNotFound(claimant))?;
        let call = NewSignatureCommitmentCall {
            commitment_hash: eth_h256(info.key()),
            validator_claims_bitfield: bitfield,
            validator_signature: eth_signature(signature),
            validator_position: U256::from(claimant),
            validator_public_key: public_key,
            validator_public_key_merkle_proof: validator_merkle_proof(
                &info.validator_addresses,
                claimant,
            )?,
        };
        let tx_hash = self
            .dispatcher
            .dispatch(&call.to_call(self.light_client))
            .await?;
        self.store
            .update(info.key(), &RecordUpdate::initial_sent(tx_hash))?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::CommitmentWriter,
            status = %CommitmentStatus::InitialVerificationTxSent,
            %tx_hash,
        );
        self.pause().await
    }

    #[tracing::instrument(
        skip_all,
        fields(
            block_number = info.signed_commitment.commitment.block_number,
            contract_id = info.contract_id,
        )
    )]
    async fn write_complete_verification(
        &self,
        info: &BeefyRelayInfo,
    ) -> Result<()> {
        if !self.contract_ids.try_advance(info.contract_id) {
            tracing::error!(
                expected = self.contract_ids.expected(),
                "Wrong contract id, skipping commitment"
            );
            return Ok(());
        }

        let random = CreateRandomBitfieldCall {
            id: U256::from(info.contract_id),
        };
        let output = self
            .dispatcher
            .chain()
            .call(&random.to_call(self.light_client))
            .await?;
        let bitfield = decode_bitfield(&output)?;
        tracing::debug!(
            bitfield = %bitfield_to_string(&bitfield),
            "Random bitfield"
        );

        let validator_proof = build_validator_proof(info, &bitfield)?;
        let leaf_proof =
            info.mmr_leaf_proof.as_ref().ok_or(Error::MissingMmrProof)?;
        let commitment = &info.signed_commitment.commitment;
        let leaf = &leaf_proof.leaf;
        let (parent_number, parent_hash) = leaf.parent_number_and_hash;
        let call = CompleteSignatureCommitmentCall {
            id: U256::from(info.contract_id),
            commitment: CommitmentTuple {
                payload: eth_h256(commitment.payload),
                block_number: commitment.block_number.into(),
                validator_set_id: u32::try_from(commitment.validator_set_id)
                    .map_err(|_| {
                        Error::Generic("validator set id overflows u32")
                    })?,
            },
            validator_proof,
            latest_mmr_leaf: BeefyMmrLeafTuple {
                version: leaf.version,
                parent_number,
                parent_hash: eth_h256(parent_hash),
                next_authority_set_id: leaf.beefy_next_authority_set.id,
                next_authority_set_len: leaf.beefy_next_authority_set.len,
                next_authority_set_root: eth_h256(
                    leaf.beefy_next_authority_set.root,
                ),
                digest_hash: eth_h256(leaf.digest_hash),
            },
            mmr_leaf_index: U256::from(leaf_proof.proof.leaf_index),
            mmr_leaf_count: U256::from(leaf_proof.proof.leaf_count),
            mmr_proof_items: leaf_proof
                .proof
                .items
                .iter()
                .copied()
                .map(eth_h256)
                .collect(),
        };
        tracing::debug!(
            input = %serde_json::to_string(&call)?,
            "Complete signature commitment input"
        );

        let tx_hash = self
            .dispatcher
            .dispatch(&call.to_call(self.light_client))
            .await?;
        self.store
            .update(info.key(), &RecordUpdate::completed(tx_hash))?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::CommitmentWriter,
            status = %CommitmentStatus::CompleteVerificationTxSent,
            %tx_hash,
        );
        self.pause().await
    }

    /// Waits out the rate limit, so the next transaction does not race this
    /// one for the same account nonce.
    async fn pause(&self) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.rate_limit) => Ok(()),
            _ = self.token.cancelled() => Err(Error::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use beefy_relayer_store::InMemoryStore;

    use super::*;
    use crate::test_utils::*;

    fn writer(
        chain: Arc<MockLightClient>,
        store: InMemoryStore,
        next_id: u64,
    ) -> BeefyEthereumWriter<MockLightClient, InMemoryStore> {
        let (_tx, rx) = mpsc::channel(1);
        BeefyEthereumWriter::new(
            EvmTxDispatcher::new(chain, None),
            store,
            light_client(),
            ContractIdSequence::new(next_id),
            Duration::ZERO,
            rx,
            CancellationToken::new(),
        )
    }

    fn ready(store: &InMemoryStore, contract_id: u64) -> BeefyRelayInfo {
        let info = witnessed(30);
        store.create(&info).unwrap();
        let tx = ethers::types::H256::repeat_byte(1);
        store
            .update(info.key(), &RecordUpdate::initial_sent(tx))
            .unwrap();
        store
            .update(info.key(), &RecordUpdate::ready_to_complete(contract_id))
            .unwrap();
        store.get(info.key()).unwrap().unwrap()
    }

    #[test]
    fn only_the_expected_id_advances() {
        let ids = ContractIdSequence::new(7);
        assert!(!ids.try_advance(8));
        assert_eq!(ids.expected(), 7);
        assert!(ids.try_advance(7));
        assert!(!ids.try_advance(7));
        assert_eq!(ids.expected(), 8);
    }

    #[tokio::test]
    async fn concurrent_attempts_on_one_id_advance_once() {
        let ids = ContractIdSequence::new(3);
        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let ids = ids.clone();
                tokio::spawn(async move { ids.try_advance(3) })
            })
            .collect();
        let mut advanced = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                advanced += 1;
            }
        }
        assert_eq!(advanced, 1);
        assert_eq!(ids.expected(), 4);
    }

    #[tokio::test]
    async fn initial_verification_moves_the_record() {
        let chain = Arc::new(MockLightClient {
            initial_bitfield: vec![U256::from(0b101u64)],
            ..Default::default()
        });
        let store = InMemoryStore::default();
        let info = witnessed(30);
        store.create(&info).unwrap();

        writer(chain.clone(), store.clone(), 0)
            .write(&info)
            .await
            .unwrap();

        let submitted = chain.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].label, NewSignatureCommitmentCall::NAME);
        let record = store.get(info.key()).unwrap().unwrap();
        assert_eq!(record.status, CommitmentStatus::InitialVerificationTxSent);
        assert_eq!(
            record.initial_verification_tx_hash,
            Some(ethers::types::H256::from_low_u64_be(1))
        );
    }

    #[tokio::test]
    async fn justification_without_signatures_is_an_error() {
        let chain = Arc::new(MockLightClient::default());
        let mut info = witnessed(30);
        info.signed_commitment.signatures = vec![None, None, None];
        let result = writer(chain.clone(), InMemoryStore::default(), 0)
            .write(&info)
            .await;
        assert!(matches!(result, Err(Error::NoSigners)));
        assert!(chain.submitted.lock().is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn complete_verification_runs_once_per_contract_id() {
        let chain = Arc::new(MockLightClient {
            random_bitfield: vec![U256::from(0b100u64)],
            ..Default::default()
        });
        let store = InMemoryStore::default();
        let info = ready(&store, 5);
        let writer = writer(chain.clone(), store.clone(), 5);

        writer.write(&info).await.unwrap();
        assert_eq!(writer.contract_ids.expected(), 6);
        let record = store.get(info.key()).unwrap().unwrap();
        assert_eq!(record.status, CommitmentStatus::CompleteVerificationTxSent);
        assert_eq!(
            chain.submitted.lock()[0].label,
            CompleteSignatureCommitmentCall::NAME
        );

        writer.write(&info).await.unwrap();
        assert!(logs_contain("Wrong contract id"));
        assert_eq!(writer.contract_ids.expected(), 6);
        assert_eq!(chain.submitted.lock().len(), 1);
        assert_eq!(store.get(info.key()).unwrap().unwrap(), record);
    }

    #[tokio::test]
    async fn complete_verification_needs_the_mmr_leaf() {
        let chain = Arc::new(MockLightClient {
            random_bitfield: vec![U256::one()],
            ..Default::default()
        });
        let store = InMemoryStore::default();
        let mut info = ready(&store, 0);
        info.mmr_leaf_proof = None;
        let result = writer(chain, store, 0).write(&info).await;
        assert!(matches!(result, Err(Error::MissingMmrProof)));
    }

    #[tokio::test]
    async fn failed_submission_stops_the_writer() {
        let chain = Arc::new(MockLightClient {
            initial_bitfield: vec![U256::one()],
            fail_submission: true,
            ..Default::default()
        });
        let store = InMemoryStore::default();
        let info = witnessed(30);
        store.create(&info).unwrap();
        let (tx, rx) = mpsc::channel(1);
        let writer = BeefyEthereumWriter::new(
            EvmTxDispatcher::new(chain, None),
            store.clone(),
            light_client(),
            ContractIdSequence::new(0),
            Duration::ZERO,
            rx,
            CancellationToken::new(),
        );
        tx.send(info.clone()).await.unwrap();
        assert!(matches!(
            writer.run().await,
            Err(Error::TransactionReverted(_))
        ));
        let record = store.get(info.key()).unwrap().unwrap();
        assert_eq!(record.status, CommitmentStatus::CommitmentWitnessed);
    }

    #[tokio::test]
    async fn cancelled_writer_exits_cleanly() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let writer = BeefyEthereumWriter::new(
            EvmTxDispatcher::new(Arc::new(MockLightClient::default()), None),
            InMemoryStore::default(),
            light_client(),
            ContractIdSequence::new(0),
            Duration::from_secs(2),
            rx,
            token.clone(),
        );
        token.cancel();
        assert!(writer.run().await.is_ok());
    }
}
