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

//! Client for commit-reveal name registrars.
//!
//! [Orchestrator] drives a registration from the availability check over commit, maturity wait,
//! pricing and preflight simulation to the reveal. It talks to the ledger through a
//! [backend::Backend]. [backend::Emulator] runs a registrar in memory which is useful for
//! developing and testing.

pub mod backend;
mod cancel;
mod config;
mod error;
pub mod message;
mod orchestrator;
mod preflight;
mod pricing;
mod registrar;
mod retry;
mod submission;
mod timer;
mod timing;
mod transaction;

pub use registrar_core::*;

pub use crate::cancel::{cancellation, CancelHandle, CancelToken, Cancelled};
pub use crate::config::{Config, DEFAULT_MARGIN_BPS, DEFAULT_SAFETY_BUFFER_SECS};
pub use crate::error::Error;
pub use crate::orchestrator::{
    Orchestrator, Registered, RegistrationError, RegistrationFailure, RegistrationState,
};
pub use crate::preflight::{PreflightError, PreflightOutcome, PreflightValidator};
pub use crate::pricing::{PricingError, PricingOracle};
pub use crate::registrar::Registrar;
pub use crate::retry::{retry, RetryPolicy};
pub use crate::submission::{InclusionPolicy, SubmissionError, SubmissionExecutor};
pub use crate::timer::{SystemTimer, Timer};
pub use crate::timing::{Maturity, TimingCoordinator};
pub use crate::transaction::{KeyPair, Signer, Transaction, TransactionPayload};
