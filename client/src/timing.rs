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

//! Timing of the reveal relative to the commit.

use std::time::Duration;

use log::debug;

use registrar_core::{Commitment, Timestamp};

use crate::error::Error;
use crate::registrar::Registrar;

/// What the ledger reports about the age of a commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Maturity {
    /// Zero if the ledger has not observed the commitment.
    pub accepted_at: Timestamp,
    pub min_age: u64,
    pub now: Timestamp,
}

impl Maturity {
    /// Seconds until the commitment is old enough to be revealed.
    ///
    /// An unobserved commitment needs the full minimum age. A ledger clock behind the acceptance
    /// time counts as zero elapsed.
    pub fn remaining(&self) -> u64 {
        if self.accepted_at == 0 {
            return self.min_age;
        }
        let elapsed = self.now.saturating_sub(self.accepted_at);
        self.min_age.saturating_sub(elapsed)
    }

    pub fn is_mature(&self) -> bool {
        self.accepted_at != 0 && self.remaining() == 0
    }
}

/// Computes how long to wait before revealing and performs the wait.
#[derive(Clone)]
pub struct TimingCoordinator {
    registrar: Registrar,
    safety_buffer: Duration,
}

impl TimingCoordinator {
    pub fn new(registrar: Registrar, safety_buffer: Duration) -> Self {
        TimingCoordinator {
            registrar,
            safety_buffer,
        }
    }

    pub async fn maturity(&self, commitment: Commitment) -> Result<Maturity, Error> {
        let accepted_at = self.registrar.commitment_accepted_at(commitment).await?;
        let min_age = self.registrar.min_commitment_age().await?;
        let now = self.registrar.ledger_time().await?;
        Ok(Maturity {
            accepted_at,
            min_age,
            now,
        })
    }

    /// The remaining age of `maturity` plus the safety buffer.
    pub fn wait_for(&self, maturity: &Maturity) -> Duration {
        Duration::from_secs(maturity.remaining()) + self.safety_buffer
    }

    pub async fn compute_wait(&self, commitment: Commitment) -> Result<Duration, Error> {
        let maturity = self.maturity(commitment).await?;
        let wait = self.wait_for(&maturity);
        debug!(
            "Commitment {} accepted at {}, ledger time {}, waiting {:?}",
            commitment, maturity.accepted_at, maturity.now, wait
        );
        Ok(wait)
    }

    /// Sleep for `duration`. Never wakes early.
    pub async fn sleep(&self, duration: Duration) {
        self.registrar.timer().sleep(duration).await
    }
}
