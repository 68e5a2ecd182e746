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

//! `Label` is the normalized name that is registered, for example `example` in `example.eth`.
//!
//! Normalization is pluggable through [Normalizer]. [BasicNormalizer] implements the rules the
//! registrar enforces for plain ASCII labels.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::{keccak256, H256};

/// A normalized label.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Minimum number of characters of a label.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum number of characters of a label.
    pub const MAX_LENGTH: usize = 63;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// keccak-256 of the label bytes. This is the `label_hash` commitment field and the
    /// token id of the name.
    pub fn hash(&self) -> H256 {
        keccak256(self.0.as_bytes())
    }

    /// The full name of the label under the given top level domain.
    pub fn full_name(&self, tld: &str) -> String {
        format!("{}.{}", self.0, tld)
    }

    fn from_normalized(input: String) -> Result<Self, InvalidLabelError> {
        let length = input.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(InvalidLabelError("must be at least 3 characters"));
        }
        if length > Self::MAX_LENGTH {
            return Err(InvalidLabelError("must not exceed 63 characters"));
        }
        if !input
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-')
        {
            return Err(InvalidLabelError("must only include a-z, 0-9 and '-'"));
        }
        if input.starts_with('-') {
            return Err(InvalidLabelError("must not start with a '-'"));
        }
        if input.ends_with('-') {
            return Err(InvalidLabelError("must not end with a '-'"));
        }
        if input.contains("--") {
            return Err(InvalidLabelError(
                "must not have more than one consecutive '-'",
            ));
        }
        Ok(Label(input))
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl TryFrom<String> for Label {
    type Error = InvalidLabelError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        BasicNormalizer.normalize(&input)
    }
}

impl TryFrom<&str> for Label {
    type Error = InvalidLabelError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        BasicNormalizer.normalize(input)
    }
}

impl FromStr for Label {
    type Err = InvalidLabelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        BasicNormalizer.normalize(input)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a raw label cannot be normalized.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid label: {0}")]
pub struct InvalidLabelError(&'static str);

impl InvalidLabelError {
    /// Description of the violated rule.
    pub fn what(&self) -> &'static str {
        self.0
    }
}

/// Turns a raw user supplied label into its canonical [Label].
pub trait Normalizer {
    fn normalize(&self, raw: &str) -> Result<Label, InvalidLabelError>;
}

/// Trims surrounding whitespace, lowercases ASCII and validates the result.
///
/// Non-ASCII labels are rejected rather than mapped.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicNormalizer;

impl Normalizer for BasicNormalizer {
    fn normalize(&self, raw: &str) -> Result<Label, InvalidLabelError> {
        Label::from_normalized(raw.trim().to_ascii_lowercase())
    }
}
