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

//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use registrar_core::AccountId;

use crate::retry::RetryPolicy;
use crate::submission::InclusionPolicy;

/// Default margin on quoted prices, +5%.
pub const DEFAULT_MARGIN_BPS: u32 = 500;

/// Default time waited beyond the minimum commitment age.
pub const DEFAULT_SAFETY_BUFFER_SECS: u64 = 60;

/// Settings of an [crate::Orchestrator]. Everything but the registrar address has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Address of the registrar contract.
    pub registrar: AccountId,

    /// Margin added to the quoted price in basis points.
    #[serde(default = "default_margin_bps")]
    pub margin_bps: u32,

    #[serde(default = "default_safety_buffer_secs")]
    pub safety_buffer_secs: u64,

    /// Check the commitment age again after waiting and wait more if the ledger disagrees.
    #[serde(default = "default_recheck_maturity")]
    pub recheck_maturity: bool,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default = "default_inclusion_timeout_secs")]
    pub inclusion_timeout_secs: u64,

    #[serde(default = "default_status_polls")]
    pub status_polls: u32,

    #[serde(default = "default_status_poll_interval_secs")]
    pub status_poll_interval_secs: u64,
}

fn default_margin_bps() -> u32 {
    DEFAULT_MARGIN_BPS
}

fn default_safety_buffer_secs() -> u64 {
    DEFAULT_SAFETY_BUFFER_SECS
}

fn default_recheck_maturity() -> bool {
    true
}

fn default_inclusion_timeout_secs() -> u64 {
    120
}

fn default_status_polls() -> u32 {
    10
}

fn default_status_poll_interval_secs() -> u64 {
    6
}

impl Config {
    /// Default settings for the registrar at `registrar`.
    pub fn new(registrar: AccountId) -> Self {
        Config {
            registrar,
            margin_bps: default_margin_bps(),
            safety_buffer_secs: default_safety_buffer_secs(),
            recheck_maturity: default_recheck_maturity(),
            retry: RetryPolicy::default(),
            inclusion_timeout_secs: default_inclusion_timeout_secs(),
            status_polls: default_status_polls(),
            status_poll_interval_secs: default_status_poll_interval_secs(),
        }
    }

    pub fn safety_buffer(&self) -> Duration {
        Duration::from_secs(self.safety_buffer_secs)
    }

    pub fn inclusion_policy(&self) -> InclusionPolicy {
        InclusionPolicy {
            timeout: Duration::from_secs(self.inclusion_timeout_secs),
            status_polls: self.status_polls,
            status_poll_interval: Duration::from_secs(self.status_poll_interval_secs),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "registrar": "0x5252525252525252525252525252525252525252",
                "safety-buffer-secs": 15,
                "retry": { "attempts": 2 }
            }"#,
        )
        .unwrap();

        let mut expected = Config::new(AccountId([0x52; 20]));
        expected.safety_buffer_secs = 15;
        expected.retry.attempts = 2;
        assert_eq!(config, expected);
        assert_eq!(config.margin_bps, 500);
        assert!(config.recheck_maturity);
    }

    #[test]
    fn registrar_is_required() {
        assert!(serde_json::from_str::<Config>("{}").is_err());
    }
}
