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

//! The commitment builder.
//!
//! A commitment is the keccak-256 fingerprint of a tuple of registration fields. Which fields
//! participate, in which order and how they are encoded is not fixed by the protocol but by the
//! registrar deployment. [CommitmentScheme] makes that choice explicit data.

use std::fmt;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::abi::{self, ParamType, Token};
use crate::error::EncodingError;
use crate::hash::{keccak256, H256};
use crate::request::RegistrationRequest;
use crate::secret::Secret;

/// Fingerprint of a registration that is posted in the commit step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(H256);

impl Commitment {
    pub fn hash(&self) -> H256 {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A value of a [RegistrationRequest] (or its [Secret]) that can be part of a commitment or of
/// the reveal call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestField {
    /// The label as a `string`.
    Label,
    /// keccak-256 of the label as `bytes32`.
    LabelHash,
    Owner,
    Duration,
    Secret,
    /// The resolver `address`, zero if unset.
    Resolver,
    /// Resolver instructions as `bytes[]`.
    Data,
    ReverseRecord,
    /// Owner controlled fuses as `uint16`.
    Fuses,
}

impl RequestField {
    pub fn param_type(self) -> ParamType {
        match self {
            RequestField::Label => ParamType::String,
            RequestField::LabelHash | RequestField::Secret => ParamType::FixedBytes(32),
            RequestField::Owner | RequestField::Resolver => ParamType::Address,
            RequestField::Duration => ParamType::Uint(256),
            RequestField::Data => ParamType::Array(Box::new(ParamType::Bytes)),
            RequestField::ReverseRecord => ParamType::Bool,
            RequestField::Fuses => ParamType::Uint(16),
        }
    }

    pub fn token(self, request: &RegistrationRequest, secret: &Secret) -> Token {
        match self {
            RequestField::Label => Token::String(request.label().as_str().to_string()),
            RequestField::LabelHash => Token::FixedBytes(request.label().hash().as_bytes().to_vec()),
            RequestField::Owner => Token::Address(request.owner()),
            RequestField::Duration => Token::uint256(request.duration()),
            RequestField::Secret => Token::FixedBytes(secret.expose().to_vec()),
            RequestField::Resolver => Token::Address(request.resolver_or_zero()),
            RequestField::Data => Token::Array(
                request
                    .data()
                    .iter()
                    .map(|payload| Token::Bytes(payload.clone()))
                    .collect(),
            ),
            RequestField::ReverseRecord => Token::Bool(request.is_reverse_record()),
            RequestField::Fuses => Token::Uint(16, request.fuse_value().into()),
        }
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RequestField::Label => "label",
            RequestField::LabelHash => "label_hash",
            RequestField::Owner => "owner",
            RequestField::Duration => "duration",
            RequestField::Secret => "secret",
            RequestField::Resolver => "resolver",
            RequestField::Data => "data",
            RequestField::ReverseRecord => "reverse_record",
            RequestField::Fuses => "fuses",
        };
        write!(f, "{}", name)
    }
}

/// How the selected fields are serialized before hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// `abi.encode`
    Abi,
    /// `abi.encodePacked`
    Packed,
}

/// Selects the fields of a commitment, their order and their encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentScheme {
    pub encoding: Encoding,
    pub fields: Vec<RequestField>,
}

/// Compute the commitment for `request` and `secret` under `scheme`.
///
/// This is a pure function: identical inputs always give identical commitments. Label and
/// duration are validated when the [RegistrationRequest] is built and the secret length by
/// [Secret]. What can still fail here is a scheme that selects no field or a field that the
/// chosen encoding cannot represent.
pub fn build(
    request: &RegistrationRequest,
    secret: &Secret,
    scheme: &CommitmentScheme,
) -> Result<Commitment, EncodingError> {
    if scheme.fields.is_empty() {
        return Err(EncodingError::EmptyScheme);
    }
    // The preimage contains the secret.
    let tokens = Zeroizing::new(
        scheme
            .fields
            .iter()
            .map(|field| field.token(request, secret))
            .collect::<Vec<Token>>(),
    );
    let encoded = Zeroizing::new(match scheme.encoding {
        Encoding::Abi => abi::encode(&tokens)?,
        Encoding::Packed => abi::encode_packed(&tokens)?,
    });
    Ok(Commitment(keccak256(&encoded)))
}
