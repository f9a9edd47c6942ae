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

use std::future::Future;

use beefy_relayer_utils::{Error, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A group of service tasks that fail together.
///
/// The first task that returns a real error cancels the shared token, so
/// every sibling winds down, and [`TaskGroup::wait`] returns that error.
/// Tasks returning [`Error::Cancelled`] count as a clean exit.
pub struct TaskGroup {
    tasks: JoinSet<(&'static str, Result<()>)>,
    token: CancellationToken,
}

impl TaskGroup {
    /// A group cancelling `token` on the first failure.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token,
        }
    }

    /// Spawns `task` into the group under `name`.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        tracing::debug!(task = name, "Starting task");
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the group has no running task.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every task and returns the first error.
    pub async fn wait(mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            let err = match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!(task = name, "Task finished");
                    continue;
                }
                Ok((name, Err(e))) if e.is_cancelled() => {
                    tracing::debug!(task = name, "Task cancelled");
                    continue;
                }
                Ok((name, Err(e))) => {
                    tracing::error!(task = name, error = %e, "Task failed");
                    e
                }
                Err(e) => {
                    tracing::error!(error = %e, "Task panicked");
                    Error::TaskStoppedAbnormally
                }
            };
            self.token.cancel();
            first_error.get_or_insert(err);
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn until_cancelled(token: CancellationToken) -> Result<()> {
        token.cancelled().await;
        Err(Error::Cancelled)
    }

    #[tokio::test]
    async fn first_error_cancels_siblings() {
        let token = CancellationToken::new();
        let mut group = TaskGroup::new(token.clone());
        group.spawn("waiter-1", until_cancelled(token.clone()));
        group.spawn("waiter-2", until_cancelled(token.clone()));
        group.spawn("failing", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(Error::NoSigners)
        });
        let outcome = group.wait().await;
        assert!(matches!(outcome, Err(Error::NoSigners)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn clean_shutdown_is_ok() {
        let token = CancellationToken::new();
        let mut group = TaskGroup::new(token.clone());
        group.spawn("waiter", until_cancelled(token.clone()));
        group.spawn("done", async { Ok(()) });
        assert_eq!(group.len(), 2);
        token.cancel();
        assert!(group.wait().await.is_ok());
    }

    #[tokio::test]
    async fn panics_are_errors() {
        let token = CancellationToken::new();
        let mut group = TaskGroup::new(token.clone());
        let explode = true;
        group.spawn("panicking", async move {
            if explode {
                panic!("boom");
            }
            Ok(())
        });
        assert!(matches!(
            group.wait().await,
            Err(Error::TaskStoppedAbnormally)
        ));
        assert!(token.is_cancelled());
    }
}
