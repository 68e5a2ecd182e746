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

//! The registration state machine.
//!
//! An attempt moves strictly forward through
//! `Idle → CheckingAvailability → Committing → AwaitingMaturity → Pricing → Preflighting →
//! Revealing` and ends in `Succeeded` or `Failed`. Nothing is retried across states.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use num_traits::Zero as _;
use zeroize::{Zeroize as _, Zeroizing};

use registrar_core::{
    commitment, Balance, Commitment, EncodingError, Label, PriceQuote, RegistrationRequest,
    RegistrationScheme, RevertReason, Secret, TxHash,
};

use crate::backend::{Backend, CallRequest, InclusionReceipt};
use crate::cancel::{CancelToken, Cancelled};
use crate::config::Config;
use crate::error::Error;
use crate::message::{Commit, Message as _, Reveal};
use crate::preflight::{PreflightError, PreflightValidator};
use crate::pricing::{PricingError, PricingOracle};
use crate::registrar::Registrar;
use crate::submission::{SubmissionError, SubmissionExecutor};
use crate::timer::Timer;
use crate::timing::TimingCoordinator;
use crate::transaction::Signer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    CheckingAvailability,
    Committing,
    AwaitingMaturity,
    Pricing,
    Preflighting,
    Revealing,
    Succeeded,
    Failed,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why an attempt ended in [RegistrationState::Failed].
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("The name is not available")]
    NameUnavailable,

    #[error("The registration cannot be encoded: {0}")]
    Encoding(#[from] EncodingError),

    #[error("The ledger is unavailable: {0}")]
    LedgerUnavailable(Error),

    #[error("No usable price: {0}")]
    PriceUnavailable(String),

    #[error("Commit failed: {0}")]
    CommitFailed(SubmissionError),

    #[error("Preflight simulation rejected the reveal: {0}")]
    PreflightRejected(RevertReason),

    #[error("Reveal reverted: {0}")]
    RevealReverted(RevertReason),

    #[error("Reveal failed: {0}")]
    RevealFailed(SubmissionError),

    /// The reveal was sent but neither its receipt nor the ownership of the name could be
    /// confirmed. It must not be sent again.
    #[error("Reveal {tx_hash} was sent but the registration could not be confirmed")]
    RevealUnconfirmed { tx_hash: TxHash },

    #[error("The registration was cancelled")]
    Cancelled,
}

impl From<Cancelled> for RegistrationError {
    fn from(_: Cancelled) -> Self {
        RegistrationError::Cancelled
    }
}

impl From<PricingError> for RegistrationError {
    fn from(error: PricingError) -> Self {
        match error {
            PricingError::PriceUnavailable(reason) => RegistrationError::PriceUnavailable(reason),
            PricingError::Ledger(error) => RegistrationError::LedgerUnavailable(error),
        }
    }
}

/// A failed attempt with everything known about it.
#[derive(Debug, thiserror::Error)]
#[error("Registration of {label} failed: {error}")]
pub struct RegistrationFailure {
    pub label: Label,
    /// Set once the commitment was built.
    pub commitment: Option<Commitment>,
    /// Visited states ending with [RegistrationState::Failed].
    pub states: Vec<RegistrationState>,
    #[source]
    pub error: RegistrationError,
}

/// A successful registration.
#[derive(Clone, Debug)]
pub struct Registered {
    pub label: Label,
    pub commitment: Commitment,
    pub commit_tx: TxHash,
    pub reveal_tx: TxHash,
    /// `None` if the registration was confirmed through the ownership of the name because the
    /// receipt of the reveal could not be obtained.
    pub reveal: Option<InclusionReceipt>,
    pub quote: PriceQuote,
    /// Value attached to the reveal.
    pub paid: Balance,
    /// Total time slept while waiting for maturity.
    pub waited: Duration,
    /// Visited states ending with [RegistrationState::Succeeded].
    pub states: Vec<RegistrationState>,
}

/// Bookkeeping of a single attempt.
struct Attempt {
    label: Label,
    commitment: Option<Commitment>,
    states: Vec<RegistrationState>,
}

impl Attempt {
    fn new(label: Label) -> Self {
        Attempt {
            label,
            commitment: None,
            states: vec![RegistrationState::Idle],
        }
    }

    fn enter(&mut self, state: RegistrationState) {
        match self.commitment {
            Some(commitment) => info!("{} ({}): {}", self.label, commitment, state),
            None => info!("{}: {}", self.label, state),
        }
        self.states.push(state);
    }

    fn fail(mut self, error: RegistrationError) -> RegistrationFailure {
        warn!("Registration of {} failed: {}", self.label, error);
        self.enter(RegistrationState::Failed);
        RegistrationFailure {
            label: self.label,
            commitment: self.commitment,
            states: self.states,
            error,
        }
    }
}

/// Runs registration attempts against one registrar with one [Signer].
///
/// Attempts are independent and may run concurrently on a shared orchestrator. Each attempt
/// owns its [Secret].
#[derive(Clone)]
pub struct Orchestrator {
    registrar: Registrar,
    scheme: RegistrationScheme,
    recheck_maturity: bool,
    pricing: PricingOracle,
    timing: TimingCoordinator,
    preflight: PreflightValidator,
    submission: SubmissionExecutor,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        signer: Arc<dyn Signer>,
        timer: Arc<dyn Timer>,
        scheme: RegistrationScheme,
        config: &Config,
    ) -> Self {
        let registrar = Registrar::new(backend, timer, config.registrar, config.retry.clone());
        Orchestrator {
            scheme,
            recheck_maturity: config.recheck_maturity,
            pricing: PricingOracle::new(registrar.clone(), config.margin_bps),
            timing: TimingCoordinator::new(registrar.clone(), config.safety_buffer()),
            preflight: PreflightValidator::new(registrar.clone()),
            submission: SubmissionExecutor::new(
                registrar.clone(),
                signer,
                config.inclusion_policy(),
            ),
            registrar,
        }
    }

    pub fn scheme(&self) -> &RegistrationScheme {
        &self.scheme
    }

    /// Register the name described by `request`.
    ///
    /// Once `cancel` fires no further transaction is submitted and the attempt fails with
    /// [RegistrationError::Cancelled]. A transaction that was already sent is always followed
    /// until its outcome is known, so a cancelled attempt can still succeed.
    pub async fn register(
        &self,
        request: RegistrationRequest,
        cancel: &CancelToken,
    ) -> Result<Registered, RegistrationFailure> {
        let mut attempt = Attempt::new(request.label().clone());
        match self.run(&request, cancel, &mut attempt).await {
            Ok(registered) => Ok(registered),
            Err(error) => Err(attempt.fail(error)),
        }
    }

    async fn run(
        &self,
        request: &RegistrationRequest,
        cancel: &CancelToken,
        attempt: &mut Attempt,
    ) -> Result<Registered, RegistrationError> {
        let label = request.label();

        attempt.enter(RegistrationState::CheckingAvailability);
        let available = cancel
            .run(self.registrar.is_available(label))
            .await?
            .map_err(RegistrationError::LedgerUnavailable)?;
        if !available {
            return Err(RegistrationError::NameUnavailable);
        }

        // Encode everything before spending anything.
        let secret = Secret::generate();
        let commitment = commitment::build(request, &secret, &self.scheme.commitment)?;
        attempt.commitment = Some(commitment);
        let commit_data = Commit { commitment }.call_data()?;
        let reveal_data = Zeroizing::new(
            Reveal {
                shape: &self.scheme.reveal,
                request,
                secret: &secret,
            }
            .call_data()?,
        );

        attempt.enter(RegistrationState::Committing);
        if cancel.is_cancelled() {
            return Err(RegistrationError::Cancelled);
        }
        let commit_tx = self
            .submission
            .send(self.registrar.address(), Balance::zero(), commit_data)
            .await
            .map_err(RegistrationError::CommitFailed)?;
        self.submission
            .await_inclusion(commit_tx)
            .await
            .map_err(RegistrationError::CommitFailed)?;

        attempt.enter(RegistrationState::AwaitingMaturity);
        let waited = self.await_maturity(commitment, cancel).await?;

        attempt.enter(RegistrationState::Pricing);
        let quote = cancel
            .run(self.pricing.quote(label, request.duration()))
            .await??;
        let value = quote.payable();

        attempt.enter(RegistrationState::Preflighting);
        let mut reveal_call = CallRequest {
            from: self.submission.account_id(),
            to: self.registrar.address(),
            value: value.clone(),
            data: reveal_data.to_vec(),
        };
        let simulated = cancel.run(self.preflight.simulate(&reveal_call)).await;
        reveal_call.data.zeroize();
        match simulated? {
            Ok(_) => {}
            Err(PreflightError::Rejected(reason)) => {
                return Err(RegistrationError::PreflightRejected(reason))
            }
            Err(PreflightError::Ledger(error)) => {
                return Err(RegistrationError::LedgerUnavailable(error))
            }
        }

        attempt.enter(RegistrationState::Revealing);
        if cancel.is_cancelled() {
            return Err(RegistrationError::Cancelled);
        }
        let sent = self
            .submission
            .send(self.registrar.address(), value.clone(), reveal_data.to_vec())
            .await;
        drop(reveal_data);
        let (reveal_tx, inclusion) = match sent {
            Ok(tx_hash) => (tx_hash, self.submission.await_inclusion(tx_hash).await),
            Err(SubmissionError::Ambiguous { tx_hash }) => {
                (tx_hash, Err(SubmissionError::Ambiguous { tx_hash }))
            }
            Err(error) => return Err(RegistrationError::RevealFailed(error)),
        };
        let reveal = match inclusion {
            Ok(receipt) => Some(receipt),
            Err(SubmissionError::Reverted { reason, .. }) => {
                return Err(RegistrationError::RevealReverted(reason))
            }
            Err(SubmissionError::Ambiguous { tx_hash }) => {
                self.confirm_ownership(request, tx_hash).await?;
                None
            }
            Err(error) => return Err(RegistrationError::RevealFailed(error)),
        };

        attempt.enter(RegistrationState::Succeeded);
        info!("Registered {} paying {}", label, value);
        Ok(Registered {
            label: label.clone(),
            commitment,
            commit_tx,
            reveal_tx,
            reveal,
            quote,
            paid: value,
            waited,
            states: attempt.states.clone(),
        })
    }

    /// Settle a reveal without receipt by asking the registrar who owns the name now.
    async fn confirm_ownership(
        &self,
        request: &RegistrationRequest,
        tx_hash: TxHash,
    ) -> Result<(), RegistrationError> {
        match self.registrar.owner_of(request.label()).await {
            Ok(Some(owner)) if owner == request.owner() => {
                info!(
                    "Reveal {} has no receipt but {} is owned by {}",
                    tx_hash,
                    request.label(),
                    owner
                );
                Ok(())
            }
            Ok(owner) => {
                warn!(
                    "Reveal {} unconfirmed, {} is owned by {:?}",
                    tx_hash,
                    request.label(),
                    owner
                );
                Err(RegistrationError::RevealUnconfirmed { tx_hash })
            }
            Err(error) => {
                warn!("Ownership of {} unavailable: {}", request.label(), error);
                Err(RegistrationError::RevealUnconfirmed { tx_hash })
            }
        }
    }

    /// Sleep until the ledger considers `commitment` old enough plus the safety buffer.
    async fn await_maturity(
        &self,
        commitment: Commitment,
        cancel: &CancelToken,
    ) -> Result<Duration, RegistrationError> {
        let wait = cancel
            .run(self.timing.compute_wait(commitment))
            .await?
            .map_err(RegistrationError::LedgerUnavailable)?;
        cancel.run(self.timing.sleep(wait)).await?;
        let mut waited = wait;

        if self.recheck_maturity {
            let maturity = cancel
                .run(self.timing.maturity(commitment))
                .await?
                .map_err(RegistrationError::LedgerUnavailable)?;
            if !maturity.is_mature() {
                let again = self.timing.wait_for(&maturity);
                warn!(
                    "Commitment {} still immature at {}, waiting another {:?}",
                    commitment, maturity.now, again
                );
                cancel.run(self.timing.sleep(again)).await?;
                waited += again;
            }
        }
        Ok(waited)
    }
}
