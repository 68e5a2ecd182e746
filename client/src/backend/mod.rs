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

//! Define trait for client backends and provide the emulator implementation
use registrar_core::{AccountId, Balance, Timestamp, TxHash};

use crate::error::Error;
use crate::transaction::Transaction;

mod emulator;

pub use emulator::{
    Emulator, EmulatorConfig, EmulatorTimer, NameRecord, SubmittedCall, GENESIS_TIME,
    REGISTRAR_ADDRESS,
};

/// Parameters of a call that is executed without being recorded on the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub value: Balance,
    pub data: Vec<u8>,
}

/// Result of executing a [CallRequest].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Returned(Vec<u8>),
    /// The call reverted with the given revert data.
    Reverted(Vec<u8>),
}

/// Whether a transaction was executed successfully after inclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    Succeeded,
    Reverted(Vec<u8>),
}

/// Indicator that a transaction has been included in a block and has been executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InclusionReceipt {
    pub tx_hash: TxHash,
    /// Number of the block the transaction is included in.
    pub block_number: u64,
    pub block_time: Timestamp,
    pub status: ExecutionStatus,
}

/// What the ledger knows about a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Accepted but not yet included.
    Pending,
    Included(InclusionReceipt),
    /// Never seen or dropped.
    Unknown,
}

/// Backend for talking to the ledger.
///
/// The interface is low-level and agnostic of the registrar contract. Every method may fail
/// with a transient [Error::Transport] or [Error::Timeout].
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Execute a read-only call against the latest state.
    async fn call(&self, request: CallRequest) -> Result<CallOutcome, Error>;

    /// Execute a state changing call against the latest state without recording it.
    ///
    /// Backends that cannot simulate return [Error::Unsupported].
    async fn simulate(&self, request: CallRequest) -> Result<CallOutcome, Error> {
        let _ = request;
        Err(Error::Unsupported)
    }

    /// Submit a signed transaction. Returns once the ledger accepted it for inclusion.
    async fn submit(&self, transaction: Transaction) -> Result<TxHash, Error>;

    /// Wait until the transaction is included in a block.
    async fn await_inclusion(&self, tx_hash: TxHash) -> Result<InclusionReceipt, Error>;

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, Error>;

    /// Timestamp of the latest block.
    async fn ledger_time(&self) -> Result<Timestamp, Error>;

    /// Nonce the next transaction of `account_id` must carry.
    async fn account_nonce(&self, account_id: AccountId) -> Result<u64, Error>;
}
