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
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

//! Backoff policy for dialing chain endpoints at startup.

use std::time::Duration;

use backoff::backoff::Backoff;

/// A dial policy that waits a constant interval between attempts and gives
/// up after `max_attempts` retries.
#[derive(Debug, Clone)]
pub struct DialBackoff {
    interval: Duration,
    max_attempts: usize,
    attempt: usize,
}

impl DialBackoff {
    /// Creates a new policy retrying every `interval` at most `max_attempts` times.
    pub fn new(interval: Duration, max_attempts: usize) -> Self {
        Self {
            interval,
            max_attempts,
            attempt: 0,
        }
    }
}

impl Default for DialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), 5)
    }
}

impl Backoff for DialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        (self.attempt < self.max_attempts).then(|| {
            self.attempt += 1;
            tracing::event!(
                target: crate::probe::TARGET,
                tracing::Level::DEBUG,
                kind = %crate::probe::Kind::Retry,
                attempt = self.attempt,
                max_attempts = self.max_attempts,
            );
            self.interval
        })
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}
