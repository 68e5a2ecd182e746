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

//! Provides [Secret], the blinding value of a commitment.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore as _;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::EncodingError;

/// Random value that blinds a commitment.
///
/// A secret belongs to exactly one registration attempt and does not implement [Clone]. It is
/// held in memory only and wiped when dropped. Commitment preimages built from it are wiped as
/// well. Reveal call data is wiped by its holder once the reveal was sent.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_LEN]);

const SECRET_LEN: usize = 32;

impl Secret {
    /// Length of a secret in bytes.
    pub const LEN: usize = SECRET_LEN;

    /// Generate a fresh secret from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Secret(bytes)
    }

    /// Use existing secret material, for example to recompute a commitment.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != Self::LEN {
            return Err(EncodingError::SecretLength {
                expected: Self::LEN,
                found: bytes.len(),
            });
        }
        let mut secret = [0u8; SECRET_LEN];
        secret.copy_from_slice(bytes);
        Ok(Secret(secret))
    }

    pub fn expose(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Secret(..)")
    }
}
