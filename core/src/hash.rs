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

//! Fixed size byte strings used on the ledger: [H256] and [AccountId].
//!
//! Both types display and parse as `0x` prefixed lowercase hex and serialize to that string.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::Keccak;

/// Compute the keccak-256 digest of `input`.
pub fn keccak256(input: &[u8]) -> H256 {
    let mut output = [0u8; 32];
    Keccak::keccak256(input, &mut output);
    H256(output)
}

/// Error returned when parsing a fixed size byte string fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseBytesError {
    #[error("invalid hex string")]
    Hex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes but got {found}")]
    Length { expected: usize, found: usize },
}

macro_rules! fixed_bytes {
    ($(#[$attr:meta])* $name:ident, $len:expr) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Number of bytes.
            pub const LEN: usize = $len;

            pub fn zero() -> Self {
                $name([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|byte| *byte == 0)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0[..]
            }

            /// Build a value from a slice that must have exactly [Self::LEN] bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseBytesError> {
                if bytes.len() != $len {
                    return Err(ParseBytesError::Length {
                        expected: $len,
                        found: bytes.len(),
                    });
                }
                let mut inner = [0u8; $len];
                inner.copy_from_slice(bytes);
                Ok($name(inner))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = ParseBytesError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                Self::from_slice(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "0x{}", hex::encode(&self.0[..]))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseBytesError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                let digits = input.strip_prefix("0x").unwrap_or(input);
                let bytes = hex::decode(digits)?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let input = String::deserialize(deserializer)?;
                input.parse().map_err(de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// 32 byte hash value.
    H256,
    32
);

fixed_bytes!(
    /// 20 byte account address.
    ///
    /// Identifies externally owned accounts as well as contracts like the registrar and
    /// resolvers.
    AccountId,
    20
);

impl AccountId {
    /// Derive the account address from a public key: the last 20 bytes of its keccak-256 digest.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = keccak256(public_key);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest.0[12..]);
        AccountId(address)
    }
}
