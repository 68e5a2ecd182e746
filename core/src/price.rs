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

//! Rent prices as returned by the registrar and the margin applied before paying them.

use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::abi::{self, AbiError, ParamType};
use crate::{Balance, Timestamp};

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// The price the registrar quoted, in one of the two return shapes deployments use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawPrice {
    Scalar(Balance),
    Split { base: Balance, premium: Balance },
}

impl RawPrice {
    /// Decode the return data of `rentPrice`. One word is a scalar, two words are
    /// `(base, premium)`.
    pub fn decode(data: &[u8]) -> Result<Self, AbiError> {
        match data.len() {
            32 => {
                let mut tokens = abi::decode(&[ParamType::Uint(256)], data)?;
                let amount = tokens.pop().and_then(|token| token.into_uint());
                amount
                    .map(RawPrice::Scalar)
                    .ok_or(AbiError::InvalidValue("rent price"))
            }
            64 => {
                let tokens = abi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], data)?;
                let mut words = tokens.into_iter().filter_map(|token| token.into_uint());
                match (words.next(), words.next()) {
                    (Some(base), Some(premium)) => Ok(RawPrice::Split { base, premium }),
                    _ => Err(AbiError::InvalidValue("rent price")),
                }
            }
            _ => Err(AbiError::InvalidValue("rent price return shape")),
        }
    }

    /// The exact amount owed before any margin.
    pub fn total(&self) -> Balance {
        match self {
            RawPrice::Scalar(amount) => amount.clone(),
            RawPrice::Split { base, premium } => base + premium,
        }
    }
}

impl fmt::Display for RawPrice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawPrice::Scalar(amount) => write!(f, "{}", amount),
            RawPrice::Split { base, premium } => write!(f, "{} (base) + {} (premium)", base, premium),
        }
    }
}

/// A fresh price with the ledger time it was read at and the margin to pay on top.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub raw: RawPrice,
    pub quoted_at: Timestamp,
    pub margin_bps: u32,
}

impl PriceQuote {
    pub fn total(&self) -> Balance {
        self.raw.total()
    }

    /// The value attached to the reveal: the total plus the margin, rounded up.
    pub fn payable(&self) -> Balance {
        apply_margin(&self.total(), self.margin_bps)
    }
}

/// `ceil(amount * (10_000 + margin_bps) / 10_000)`
pub fn apply_margin(amount: &BigUint, margin_bps: u32) -> BigUint {
    let denominator = BigUint::from(BPS_DENOMINATOR);
    let scaled = amount * (BigUint::from(BPS_DENOMINATOR) + margin_bps);
    let quotient = &scaled / &denominator;
    if (scaled % denominator).is_zero() {
        quotient
    } else {
        quotient + 1u32
    }
}
