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

//! Fresh price quotes with a safety margin.

use log::debug;

use registrar_core::{Label, PriceQuote};

use crate::error::Error;
use crate::registrar::Registrar;

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    /// The registrar refused to quote or returned an unknown shape.
    #[error("No usable price: {0}")]
    PriceUnavailable(String),

    #[error(transparent)]
    Ledger(Error),
}

/// Quotes the rent for a label right before it is paid.
///
/// Quotes are never cached. A rent that changed between commit and reveal is picked up
/// automatically.
#[derive(Clone)]
pub struct PricingOracle {
    registrar: Registrar,
    margin_bps: u32,
}

impl PricingOracle {
    pub fn new(registrar: Registrar, margin_bps: u32) -> Self {
        PricingOracle {
            registrar,
            margin_bps,
        }
    }

    pub async fn quote(&self, label: &Label, duration: u64) -> Result<PriceQuote, PricingError> {
        let quoted_at = self
            .registrar
            .ledger_time()
            .await
            .map_err(PricingError::Ledger)?;
        let raw = match self.registrar.rent_price(label, duration).await {
            Ok(raw) => raw,
            Err(Error::Reverted(reason)) => {
                return Err(PricingError::PriceUnavailable(reason.to_string()))
            }
            Err(Error::Decode(error)) => {
                return Err(PricingError::PriceUnavailable(error.to_string()))
            }
            Err(error) => return Err(PricingError::Ledger(error)),
        };
        let quote = PriceQuote {
            raw,
            quoted_at,
            margin_bps: self.margin_bps,
        };
        debug!(
            "Quoted {} for {} at {}, paying {}",
            quote.raw,
            label,
            quoted_at,
            quote.payable()
        );
        Ok(quote)
    }
}
