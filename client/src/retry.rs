// Registrar Client
// Copyright (C) 2020 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Bounded exponential backoff for ledger reads.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::timer::Timer;

/// How often and how patiently a read is repeated after a transient [Error].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryPolicy {
    /// Total number of tries including the first one.
    pub attempts: u32,
    pub initial_delay_ms: u64,
    pub factor: u32,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 4,
            initial_delay_ms: 500,
            factor: 2,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Try exactly once.
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            ..RetryPolicy::default()
        }
    }

    /// Delay before the try following the failed try number `failed` (starting at zero).
    pub fn delay(&self, failed: u32) -> Duration {
        let growth = u64::from(self.factor).saturating_pow(failed);
        let delay = self.initial_delay_ms.saturating_mul(growth);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Run `operation` until it succeeds, fails permanently or the policy is exhausted.
///
/// Only errors for which [Error::is_transient] holds are retried. The last error is returned.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    timer: &dyn Timer,
    what: &str,
    mut operation: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut failed = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && failed + 1 < policy.attempts => {
                let delay = policy.delay(failed);
                log::warn!("{} failed: {}. Retrying in {:?}", what, error, delay);
                timer.sleep(delay).await;
                failed += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
