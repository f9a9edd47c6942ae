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

use std::collections::HashSet;
use std::time::Duration;

use beefy_relayer_store::CommitmentStore;
use beefy_relayer_types::beefy::{BeefyRelayInfo, CommitmentStatus};
use beefy_relayer_utils::{probe, Error, Result};
use sp_core::H256;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Statuses the writer acts on.
const ACTIONABLE: [CommitmentStatus; 2] = [
    CommitmentStatus::CommitmentWitnessed,
    CommitmentStatus::ReadyToComplete,
];

/// Polls the store for records waiting on the writer and hands each of
/// them over once per status.
pub struct CommitmentFeeder<S> {
    store: S,
    poll_interval: Duration,
    commitments: mpsc::Sender<BeefyRelayInfo>,
    token: CancellationToken,
    sent: HashSet<(H256, CommitmentStatus)>,
}

impl<S: CommitmentStore> CommitmentFeeder<S> {
    /// Creates a new feeder sending into `commitments`.
    pub fn new(
        store: S,
        poll_interval: Duration,
        commitments: mpsc::Sender<BeefyRelayInfo>,
        token: CancellationToken,
    ) -> Self {
        Self {
            store,
            poll_interval,
            commitments,
            token,
            sent: HashSet::new(),
        }
    }

    /// Polls until cancelled or until the store fails.
    #[tracing::instrument(skip_all)]
    pub async fn run(mut self) -> Result<()> {
        let result = self.poll_loop().await;
        tracing::info!(
            reason = ?result.as_ref().err(),
            "Shutting down commitment feeder"
        );
        match result {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    async fn poll_loop(&mut self) -> Result<()> {
        loop {
            self.poll_once().await?;
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.token.cancelled() => return Err(Error::Cancelled),
            }
        }
    }

    async fn poll_once(&mut self) -> Result<()> {
        let records = self.store.records_with_status(&ACTIONABLE)?;
        let pending: HashSet<_> =
            records.iter().map(|r| (r.key(), r.status)).collect();
        // records that moved on never come back to the same status
        self.sent.retain(|entry| pending.contains(entry));

        for record in records {
            if !self.sent.insert((record.key(), record.status)) {
                continue;
            }
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::StoreFeeder,
                block_number = record.signed_commitment.commitment.block_number,
                status = %record.status,
            );
            tokio::select! {
                sent = self.commitments.send(record) => {
                    sent.map_err(|_| Error::ChannelClosed)?;
                }
                _ = self.token.cancelled() => return Err(Error::Cancelled),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beefy_relayer_store::InMemoryStore;
    use beefy_relayer_types::beefy::RecordUpdate;

    use super::*;
    use crate::test_utils::witnessed;

    #[tokio::test]
    async fn each_status_is_fed_once() {
        let store = InMemoryStore::default();
        let first = witnessed(10);
        let second = witnessed(11);
        store.create(&second).unwrap();
        store.create(&first).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let feeder = CommitmentFeeder::new(
            store.clone(),
            Duration::from_millis(5),
            tx,
            token.clone(),
        );
        let handle = tokio::spawn(feeder.run());

        assert_eq!(rx.recv().await.unwrap().key(), first.key());
        assert_eq!(rx.recv().await.unwrap().key(), second.key());
        let quiet =
            tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(quiet.is_err());

        let tx_hash = ethers::types::H256::repeat_byte(1);
        store
            .update(first.key(), &RecordUpdate::initial_sent(tx_hash))
            .unwrap();
        store
            .update(first.key(), &RecordUpdate::ready_to_complete(4))
            .unwrap();
        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.key(), first.key());
        assert_eq!(ready.status, CommitmentStatus::ReadyToComplete);
        assert_eq!(ready.contract_id, 4);

        token.cancel();
        handle.await.unwrap().unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_writer_is_an_error() {
        let store = InMemoryStore::default();
        store.create(&witnessed(10)).unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let feeder = CommitmentFeeder::new(
            store,
            Duration::from_millis(5),
            tx,
            CancellationToken::new(),
        );
        assert!(matches!(feeder.run().await, Err(Error::ChannelClosed)));
    }
}
