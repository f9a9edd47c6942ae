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

use std::collections::HashMap;
use std::sync::Arc;

use beefy_relayer_types::beefy::{
    BeefyRelayInfo, CommitmentStatus, RecordUpdate,
};
use beefy_relayer_utils::{Error, Result};
use parking_lot::RwLock;
use sp_core::H256;

use crate::{check_create, check_update, sort_by_block, CommitmentStore};

/// InMemoryStore keeps commitment records in memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<H256, BeefyRelayInfo>>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl CommitmentStore for InMemoryStore {
    #[tracing::instrument(skip_all, fields(key = ?record.key()))]
    fn create(&self, record: &BeefyRelayInfo) -> Result<()> {
        let mut guard = self.records.write();
        let key = record.key();
        check_create(guard.get(&key), record)?;
        guard.insert(key, record.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn update(&self, key: H256, update: &RecordUpdate) -> Result<()> {
        let mut guard = self.records.write();
        let record = guard.get_mut(&key).ok_or(Error::RecordNotFound)?;
        check_update(record.status, update.status)?;
        record.apply(update);
        Ok(())
    }

    fn get(&self, key: H256) -> Result<Option<BeefyRelayInfo>> {
        Ok(self.records.read().get(&key).cloned())
    }

    #[tracing::instrument(skip(self))]
    fn records_with_status(
        &self,
        statuses: &[CommitmentStatus],
    ) -> Result<Vec<BeefyRelayInfo>> {
        let guard = self.records.read();
        let mut records: Vec<_> = guard
            .values()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect();
        sort_by_block(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_moves_forward_only() {
        crate::test_utils::exercise_store(InMemoryStore::default());
    }
}
