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

//! Decoding of revert data returned by a failed call or transaction.

use std::fmt;

use num_bigint::BigUint;

use crate::abi::{self, AbiError, Function, ParamType, Token};

const ERROR_STRING: &str = "Error(string)";
const PANIC: &str = "Panic(uint256)";

/// Custom errors raised by the registrar contract.
pub fn registrar_errors() -> Vec<Function> {
    let bytes32 = || vec![ParamType::FixedBytes(32)];
    vec![
        Function::new("InvalidCommitment", bytes32()),
        Function::new("CommitmentTooNew", bytes32()),
        Function::new("CommitmentTooOld", bytes32()),
        Function::new("UnexpiredCommitmentExists", bytes32()),
        Function::new("NameNotAvailable", vec![ParamType::String]),
        Function::new("DurationTooShort", vec![ParamType::Uint(256)]),
        Function::new("InsufficientValue", vec![]),
        Function::new("ResolverRequiredWhenDataSupplied", vec![]),
    ]
}

/// Why the ledger refused to execute a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevertReason {
    /// The call reverted without any data.
    Empty,
    /// `Error(string)` as produced by `require` and `revert("..")`.
    Error(String),
    /// `Panic(uint256)` with the panic code.
    Panic(BigUint),
    /// One of the [registrar_errors].
    Custom { name: String, args: Vec<Token> },
    Unrecognized(Vec<u8>),
}

impl RevertReason {
    /// Decode revert data. Never fails: data that matches no known layout is kept raw.
    pub fn decode(data: &[u8]) -> Self {
        if data.is_empty() {
            return RevertReason::Empty;
        }
        if data.len() < 4 {
            return RevertReason::Unrecognized(data.to_vec());
        }
        let unrecognized = || RevertReason::Unrecognized(data.to_vec());

        if data[..4] == abi::selector(ERROR_STRING) {
            return abi::decode(&[ParamType::String], &data[4..])
                .ok()
                .and_then(|mut tokens| tokens.pop())
                .and_then(Token::into_string)
                .map(RevertReason::Error)
                .unwrap_or_else(unrecognized);
        }
        if data[..4] == abi::selector(PANIC) {
            return abi::decode(&[ParamType::Uint(256)], &data[4..])
                .ok()
                .and_then(|mut tokens| tokens.pop())
                .and_then(Token::into_uint)
                .map(RevertReason::Panic)
                .unwrap_or_else(unrecognized);
        }
        registrar_errors()
            .into_iter()
            .find(|error| data[..4] == error.selector())
            .and_then(|error| {
                let args = error.decode_call(data).ok()?;
                Some(RevertReason::Custom {
                    name: error.name,
                    args,
                })
            })
            .unwrap_or_else(unrecognized)
    }

    /// Name of a custom error, if this is one.
    pub fn custom_name(&self) -> Option<&str> {
        match self {
            RevertReason::Custom { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Build revert data for a registrar custom error.
    pub fn custom(name: &str, args: Vec<Token>) -> Result<Vec<u8>, AbiError> {
        let error = registrar_errors()
            .into_iter()
            .find(|error| error.name == name)
            .ok_or_else(|| AbiError::InvalidSignature(name.to_string()))?;
        error.encode_call(&args)
    }

    /// Build `Error(string)` revert data.
    pub fn message(message: &str) -> Vec<u8> {
        let mut data = abi::selector(ERROR_STRING).to_vec();
        // A single string token always encodes.
        data.extend(abi::encode(&[Token::String(message.to_string())]).unwrap_or_default());
        data
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RevertReason::Empty => write!(f, "reverted without reason"),
            RevertReason::Error(message) => write!(f, "{}", message),
            RevertReason::Panic(code) => write!(f, "Panic(0x{})", code.to_str_radix(16)),
            RevertReason::Custom { name, .. } => write!(f, "{}", name),
            RevertReason::Unrecognized(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}
