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

use registrar_core::{abi::AbiError, RevertReason, TxHash};

/// Error that may be returned by a [crate::backend::Backend] or the [crate::Registrar].
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The connection to the ledger failed. Worth a retry.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The ledger did not answer in time. Worth a retry.
    #[error("The ledger did not respond in time")]
    Timeout,

    /// The ledger refused to accept a transaction
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Decoding the received data failed
    #[error("Decoding the received data failed: {0}")]
    Decode(#[from] AbiError),

    /// A call was executed and reverted
    #[error("Execution reverted: {0}")]
    Reverted(RevertReason),

    /// The backend does not implement the requested operation
    #[error("Operation not supported by the backend")]
    Unsupported,

    #[error("Unknown transaction {0}")]
    UnknownTransaction(TxHash),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether the failed operation may succeed when repeated unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout => true,
            _ => false,
        }
    }
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.into())
    }
}
