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

//! Simulation of the reveal before any value is spent on it.

use log::warn;

use registrar_core::RevertReason;

use crate::backend::{CallOutcome, CallRequest};
use crate::error::Error;
use crate::registrar::Registrar;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreflightOutcome {
    Passed,
    /// The backend cannot simulate. The reveal goes ahead unverified.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    /// The simulated reveal reverted.
    #[error("Simulation reverted: {0}")]
    Rejected(RevertReason),

    /// The ledger could not be reached. Treated like a rejection.
    #[error(transparent)]
    Ledger(Error),
}

/// Simulates state changing calls with the exact call data, sender and value.
#[derive(Clone)]
pub struct PreflightValidator {
    registrar: Registrar,
}

impl PreflightValidator {
    pub fn new(registrar: Registrar) -> Self {
        PreflightValidator { registrar }
    }

    pub async fn simulate(&self, request: &CallRequest) -> Result<PreflightOutcome, PreflightError> {
        match self.registrar.simulate(request).await {
            Ok(CallOutcome::Returned(_)) => Ok(PreflightOutcome::Passed),
            Ok(CallOutcome::Reverted(data)) => {
                Err(PreflightError::Rejected(RevertReason::decode(&data)))
            }
            Err(Error::Reverted(reason)) => Err(PreflightError::Rejected(reason)),
            Err(Error::Unsupported) => {
                warn!("Backend cannot simulate calls, skipping preflight");
                Ok(PreflightOutcome::Skipped)
            }
            Err(error) => Err(PreflightError::Ledger(error)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    use registrar_core::{AccountId, RegistrationRequest, RegistrationScheme, Secret};

    use crate::backend::{Emulator, EmulatorTimer};
    use crate::retry::RetryPolicy;
    use crate::transaction::{KeyPair, Signer as _};

    fn validator(emulator: &Emulator) -> PreflightValidator {
        PreflightValidator::new(Registrar::new(
            Arc::new(emulator.clone()),
            Arc::new(EmulatorTimer::new(emulator.clone())),
            emulator.address(),
            RetryPolicy::default(),
        ))
    }

    fn reveal_without_commit(emulator: &Emulator) -> CallRequest {
        let owner = KeyPair::from_seed_str("//Alice").account_id();
        let request = RegistrationRequest::new("example", 31_536_000, owner).unwrap();
        let data = RegistrationScheme::ens_v3()
            .reveal
            .encode_call(&request, &Secret::generate())
            .unwrap();
        CallRequest {
            from: owner,
            to: emulator.address(),
            value: 10_000u32.into(),
            data,
        }
    }

    #[async_std::test]
    async fn revert_is_a_rejection() {
        let emulator = Emulator::new();
        let request = reveal_without_commit(&emulator);
        match validator(&emulator).simulate(&request).await {
            Err(PreflightError::Rejected(reason)) => {
                assert_eq!(reason.custom_name(), Some("InvalidCommitment"))
            }
            result => panic!("Unexpected result {:?}", result),
        }
    }

    #[async_std::test]
    async fn unsupported_simulation_is_skipped() {
        let emulator = Emulator::new();
        emulator.disable_simulation();
        let request = reveal_without_commit(&emulator);
        assert_eq!(
            validator(&emulator).simulate(&request).await.unwrap(),
            PreflightOutcome::Skipped
        );
    }

    #[async_std::test]
    async fn unreachable_ledger_fails_closed() {
        let emulator = Emulator::new();
        emulator.fail_next_reads(10);
        let request = reveal_without_commit(&emulator);
        assert!(matches!(
            validator(&emulator).simulate(&request).await,
            Err(PreflightError::Ledger(Error::Transport(_)))
        ));
    }

    #[async_std::test]
    async fn calls_to_other_accounts_pass() {
        let emulator = Emulator::new();
        let mut request = reveal_without_commit(&emulator);
        request.to = AccountId([9; 20]);
        assert_eq!(
            validator(&emulator).simulate(&request).await.unwrap(),
            PreflightOutcome::Passed
        );
    }
}
