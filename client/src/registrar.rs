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

//! Provides [Registrar], the typed view of a registrar contract on a [Backend].

use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero as _;

use registrar_core::{AccountId, Commitment, Label, RawPrice, RevertReason, Timestamp, TxHash};

use crate::backend::{Backend, CallOutcome, CallRequest, TxStatus};
use crate::error::Error;
use crate::message::{self, Query};
use crate::retry::{retry, RetryPolicy};
use crate::timer::Timer;

/// Registrar contract at a fixed address.
///
/// Every read goes through the [RetryPolicy]. Cloning is cheap and clones share the backend.
#[derive(Clone)]
pub struct Registrar {
    backend: Arc<dyn Backend>,
    timer: Arc<dyn Timer>,
    address: AccountId,
    retry_policy: RetryPolicy,
}

impl Registrar {
    pub fn new(
        backend: Arc<dyn Backend>,
        timer: Arc<dyn Timer>,
        address: AccountId,
        retry_policy: RetryPolicy,
    ) -> Self {
        Registrar {
            backend,
            timer,
            address,
            retry_policy,
        }
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn timer(&self) -> &dyn Timer {
        self.timer.as_ref()
    }

    /// Run a read-only registrar function.
    ///
    /// A revert is returned as [Error::Reverted] with the decoded reason.
    pub async fn query<Q: Query>(&self, query: Q) -> Result<Q::Output, Error> {
        let request = CallRequest {
            from: AccountId::zero(),
            to: self.address,
            value: BigUint::zero(),
            data: query.call_data()?,
        };
        let outcome = retry(&self.retry_policy, self.timer(), "registrar query", || {
            self.backend.call(request.clone())
        })
        .await?;
        match outcome {
            CallOutcome::Returned(data) => Ok(Q::decode_output(&data)?),
            CallOutcome::Reverted(data) => Err(Error::Reverted(RevertReason::decode(&data))),
        }
    }

    /// Execute a state changing call without recording it. Transient errors are retried.
    pub async fn simulate(&self, request: &CallRequest) -> Result<CallOutcome, Error> {
        retry(&self.retry_policy, self.timer(), "simulation", || {
            self.backend.simulate(request.clone())
        })
        .await
    }

    pub async fn is_available(&self, label: &Label) -> Result<bool, Error> {
        self.query(message::Available {
            label: label.clone(),
        })
        .await
    }

    /// Time the ledger accepted `commitment`, zero if it never did.
    pub async fn commitment_accepted_at(&self, commitment: Commitment) -> Result<Timestamp, Error> {
        self.query(message::Commitments { commitment }).await
    }

    pub async fn min_commitment_age(&self) -> Result<u64, Error> {
        self.query(message::MinCommitmentAge).await
    }

    pub async fn max_commitment_age(&self) -> Result<u64, Error> {
        self.query(message::MaxCommitmentAge).await
    }

    pub async fn rent_price(&self, label: &Label, duration: u64) -> Result<RawPrice, Error> {
        self.query(message::RentPrice {
            label: label.clone(),
            duration,
        })
        .await
    }

    /// Current owner of `label`, `None` if it is not registered or has expired.
    pub async fn owner_of(&self, label: &Label) -> Result<Option<AccountId>, Error> {
        match self
            .query(message::OwnerOf {
                label: label.clone(),
            })
            .await
        {
            Ok(owner) => Ok(Some(owner)),
            Err(Error::Reverted(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn ledger_time(&self) -> Result<Timestamp, Error> {
        retry(&self.retry_policy, self.timer(), "ledger time", || {
            self.backend.ledger_time()
        })
        .await
    }

    pub async fn account_nonce(&self, account_id: AccountId) -> Result<u64, Error> {
        retry(&self.retry_policy, self.timer(), "account nonce", || {
            self.backend.account_nonce(account_id)
        })
        .await
    }

    pub async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, Error> {
        retry(&self.retry_policy, self.timer(), "transaction status", || {
            self.backend.transaction_status(tx_hash)
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::{Emulator, EmulatorTimer, GENESIS_TIME};

    fn registrar(emulator: &Emulator) -> Registrar {
        Registrar::new(
            Arc::new(emulator.clone()),
            Arc::new(EmulatorTimer::new(emulator.clone())),
            emulator.address(),
            RetryPolicy::default(),
        )
    }

    #[async_std::test]
    async fn reads_survive_transient_failures() {
        let _ = env_logger::try_init();
        let emulator = Emulator::new();
        emulator.fail_next_reads(3);
        let label: Label = "example".parse().unwrap();
        assert!(registrar(&emulator).is_available(&label).await.unwrap());
    }

    #[async_std::test]
    async fn reads_give_up_after_the_retry_budget() {
        let emulator = Emulator::new();
        emulator.fail_next_reads(4);
        let result = registrar(&emulator).ledger_time().await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[async_std::test]
    async fn commitment_ages() {
        let emulator = Emulator::new();
        let registrar = registrar(&emulator);
        assert_eq!(registrar.min_commitment_age().await.unwrap(), 60);
        assert_eq!(registrar.max_commitment_age().await.unwrap(), 86_400);
        assert_eq!(registrar.ledger_time().await.unwrap(), GENESIS_TIME);
    }

    #[async_std::test]
    async fn owner_of_unregistered_name() {
        let emulator = Emulator::new();
        let label: Label = "example".parse().unwrap();
        assert_eq!(registrar(&emulator).owner_of(&label).await.unwrap(), None);
    }
}
