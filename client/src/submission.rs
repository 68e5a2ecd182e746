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

//! Signing, submission and inclusion tracking of transactions.
//!
//! Transactions are never resubmitted blindly. When the outcome of a submission is unclear the
//! executor asks the ledger for the status of the transaction hash instead.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Either};
use futures::lock::Mutex;
use log::{debug, info, warn};

use registrar_core::{AccountId, Balance, RevertReason, TxHash};

use crate::backend::{ExecutionStatus, InclusionReceipt, TxStatus};
use crate::error::Error;
use crate::registrar::Registrar;
use crate::transaction::{Signer, Transaction, TransactionPayload};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The transaction was not executed. Nothing was spent on it.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Transaction {tx_hash} reverted: {reason}")]
    Reverted {
        tx_hash: TxHash,
        reason: RevertReason,
    },

    /// The transaction may still be included. It must not be resubmitted.
    #[error("Outcome of transaction {tx_hash} is unknown")]
    Ambiguous { tx_hash: TxHash },

    /// The transaction could not be prepared because the ledger was unreachable.
    #[error(transparent)]
    Ledger(Error),
}

/// Bounds on waiting for inclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InclusionPolicy {
    pub timeout: Duration,
    /// Status queries after a timed out wait.
    pub status_polls: u32,
    pub status_poll_interval: Duration,
}

/// Submits transactions authored by one [Signer].
#[derive(Clone)]
pub struct SubmissionExecutor {
    registrar: Registrar,
    signer: Arc<dyn Signer>,
    policy: InclusionPolicy,
    /// Last nonce handed out. Held while a nonce is read and its transaction submitted.
    last_nonce: Arc<Mutex<Option<u64>>>,
}

impl SubmissionExecutor {
    pub fn new(registrar: Registrar, signer: Arc<dyn Signer>, policy: InclusionPolicy) -> Self {
        SubmissionExecutor {
            registrar,
            signer,
            policy,
            last_nonce: Arc::new(Mutex::new(None)),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.signer.account_id()
    }

    /// Sign and submit a call and wait for its inclusion.
    pub async fn submit(
        &self,
        to: AccountId,
        value: Balance,
        data: Vec<u8>,
    ) -> Result<InclusionReceipt, SubmissionError> {
        let tx_hash = self.send(to, value, data).await?;
        self.await_inclusion(tx_hash).await
    }

    /// Sign and submit a call with the next nonce of the signer.
    ///
    /// The returned hash identifies a transaction the ledger may include. The nonce is only
    /// recorded once the ledger answered, so the future must not be dropped before it resolves.
    pub async fn send(
        &self,
        to: AccountId,
        value: Balance,
        data: Vec<u8>,
    ) -> Result<TxHash, SubmissionError> {
        let mut last_nonce = self.last_nonce.lock().await;
        let ledger_nonce = self
            .registrar
            .account_nonce(self.account_id())
            .await
            .map_err(SubmissionError::Ledger)?;
        let nonce = match *last_nonce {
            Some(last) if last >= ledger_nonce => last + 1,
            _ => ledger_nonce,
        };

        let transaction = Transaction::new_signed(
            self.signer.as_ref(),
            TransactionPayload {
                to,
                value,
                data,
                nonce,
            },
        )
        .map_err(|error| SubmissionError::Rejected(error.to_string()))?;
        let tx_hash = transaction.hash();

        match self.registrar.backend().submit(transaction).await {
            Ok(_) => {
                debug!("Submitted transaction {} with nonce {}", tx_hash, nonce);
                *last_nonce = Some(nonce);
                Ok(tx_hash)
            }
            Err(error) if error.is_transient() => {
                warn!(
                    "Submission of {} failed with {}, checking its status",
                    tx_hash, error
                );
                match self.registrar.transaction_status(tx_hash).await {
                    Ok(TxStatus::Unknown) => Err(SubmissionError::Rejected(error.to_string())),
                    Ok(_) => {
                        *last_nonce = Some(nonce);
                        Ok(tx_hash)
                    }
                    Err(_) => {
                        *last_nonce = Some(nonce);
                        Err(SubmissionError::Ambiguous { tx_hash })
                    }
                }
            }
            Err(error) => Err(SubmissionError::Rejected(error.to_string())),
        }
    }

    /// Wait for the inclusion of `tx_hash` and classify its execution.
    ///
    /// A wait that times out or fails is followed by up to
    /// [InclusionPolicy::status_polls] status queries.
    pub async fn await_inclusion(
        &self,
        tx_hash: TxHash,
    ) -> Result<InclusionReceipt, SubmissionError> {
        let inclusion = self.registrar.backend().await_inclusion(tx_hash);
        let timeout = self.registrar.timer().sleep(self.policy.timeout);
        match future::select(inclusion, timeout).await {
            Either::Left((Ok(receipt), _)) => classify(receipt),
            Either::Left((Err(error), _)) => {
                warn!("Waiting for {} failed: {}", tx_hash, error);
                self.poll_status(tx_hash).await
            }
            Either::Right(((), _)) => {
                warn!(
                    "Transaction {} not included after {:?}",
                    tx_hash, self.policy.timeout
                );
                self.poll_status(tx_hash).await
            }
        }
    }

    async fn poll_status(&self, tx_hash: TxHash) -> Result<InclusionReceipt, SubmissionError> {
        for poll in 0..self.policy.status_polls {
            match self.registrar.transaction_status(tx_hash).await {
                Ok(TxStatus::Included(receipt)) => return classify(receipt),
                Ok(TxStatus::Unknown) => {
                    return Err(SubmissionError::Rejected(format!(
                        "transaction {} was dropped",
                        tx_hash
                    )))
                }
                Ok(TxStatus::Pending) => debug!("Transaction {} is pending", tx_hash),
                Err(error) => warn!("Status of {} unavailable: {}", tx_hash, error),
            }
            if poll + 1 < self.policy.status_polls {
                self.registrar
                    .timer()
                    .sleep(self.policy.status_poll_interval)
                    .await;
            }
        }
        Err(SubmissionError::Ambiguous { tx_hash })
    }
}

fn classify(receipt: InclusionReceipt) -> Result<InclusionReceipt, SubmissionError> {
    match receipt.status {
        ExecutionStatus::Succeeded => {
            info!(
                "Transaction {} included in block {}",
                receipt.tx_hash, receipt.block_number
            );
            Ok(receipt)
        }
        ExecutionStatus::Reverted(data) => Err(SubmissionError::Reverted {
            tx_hash: receipt.tx_hash,
            reason: RevertReason::decode(&data),
        }),
    }
}
