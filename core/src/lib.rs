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

//! Basic types and pure functions for commit-reveal name registration.
//!
//! Nothing in this crate performs I/O. The ledger facing parts live in `registrar-client`.

pub mod abi;
pub mod commitment;
pub mod price;
pub mod resolver;
pub mod revert;
pub mod scheme;

mod error;
pub use error::EncodingError;

mod hash;
pub use hash::{keccak256, AccountId, ParseBytesError, H256};

mod label;
pub use label::{BasicNormalizer, InvalidLabelError, Label, Normalizer};

mod request;
pub use request::RegistrationRequest;

mod secret;
pub use secret::Secret;

pub use commitment::{Commitment, CommitmentScheme, Encoding, RequestField};
pub use price::{PriceQuote, RawPrice};
pub use revert::RevertReason;
pub use scheme::{RegistrationScheme, RevealShape};

/// Amount of the ledger's native currency in its smallest unit.
pub type Balance = num_bigint::BigUint;

/// Ledger time in seconds since the Unix epoch.
pub type Timestamp = u64;

/// Hash identifying a transaction.
pub type TxHash = H256;
