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

use std::path::Path;

use beefy_relayer_types::beefy::{
    BeefyRelayInfo, CommitmentStatus, RecordUpdate,
};
use beefy_relayer_utils::{Error, Result};
use sled::transaction::ConflictableTransactionError;
use sp_core::H256;

use crate::{check_create, check_update, sort_by_block, CommitmentStore};

const COMMITMENTS_TREE: &str = "beefy_commitments";

/// SledStore keeps commitment records in a [Sled](https://sled.rs)-based database.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    /// Create a new SledStore.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .temporary(cfg!(test))
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db })
    }
    /// Creates a temporary SledStore.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db })
    }

    fn tree(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(COMMITMENTS_TREE)?)
    }
}

type TxResult<T> =
    std::result::Result<T, ConflictableTransactionError<std::io::Error>>;

fn decode(bytes: &[u8]) -> TxResult<BeefyRelayInfo> {
    serde_json::from_slice(bytes)
        .map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

fn encode(record: &BeefyRelayInfo) -> TxResult<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

impl CommitmentStore for SledStore {
    #[tracing::instrument(skip_all, fields(key = ?record.key()))]
    fn create(&self, record: &BeefyRelayInfo) -> Result<()> {
        let tree = self.tree()?;
        let key = record.key();
        // read, check and write in one transaction so a concurrent writer
        // cannot slip a later status in between.
        let outcome = tree.transaction::<_, _, std::io::Error>(|db| {
            let existing = match db.get(key.as_bytes())? {
                Some(bytes) => Some(decode(&bytes)?),
                None => None,
            };
            if let Err(e) = check_create(existing.as_ref(), record) {
                return Ok(Err(e));
            }
            db.insert(key.as_bytes(), encode(record)?)?;
            Ok(Ok(()))
        })?;
        outcome?;
        self.db.flush()?;
        tracing::trace!(status = %record.status, "commitment record stored");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn update(&self, key: H256, update: &RecordUpdate) -> Result<()> {
        let tree = self.tree()?;
        let outcome = tree.transaction::<_, _, std::io::Error>(|db| {
            let mut record = match db.get(key.as_bytes())? {
                Some(bytes) => decode(&bytes)?,
                None => return Ok(Err(Error::RecordNotFound)),
            };
            if let Err(e) = check_update(record.status, update.status) {
                return Ok(Err(e));
            }
            record.apply(update);
            db.insert(key.as_bytes(), encode(&record)?)?;
            Ok(Ok(()))
        })?;
        outcome?;
        self.db.flush()?;
        Ok(())
    }

    fn get(&self, key: H256) -> Result<Option<BeefyRelayInfo>> {
        let tree = self.tree()?;
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    fn records_with_status(
        &self,
        statuses: &[CommitmentStatus],
    ) -> Result<Vec<BeefyRelayInfo>> {
        let tree = self.tree()?;
        let mut records = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            let record: BeefyRelayInfo = serde_json::from_slice(&bytes)?;
            if statuses.contains(&record.status) {
                records.push(record);
            }
        }
        sort_by_block(&mut records);
        Ok(records)
    }
}
