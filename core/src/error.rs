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

//! Errors of the pure encoding layer.

use crate::abi::AbiError;
use crate::commitment::RequestField;
use crate::label::InvalidLabelError;

/// A registration field could not be canonically encoded.
///
/// This is always a defect of the caller input or of the configured scheme and never worth a
/// retry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error(transparent)]
    Label(#[from] InvalidLabelError),

    #[error("registration duration must be positive")]
    NonPositiveDuration,

    #[error("secret must be {expected} bytes but is {found} bytes")]
    SecretLength { expected: usize, found: usize },

    #[error("the commitment scheme does not select any field")]
    EmptyScheme,

    #[error("the reveal call does not carry the `{0}` field")]
    MissingField(RequestField),

    #[error("ABI encoding failed: {0}")]
    Abi(#[from] AbiError),
}
