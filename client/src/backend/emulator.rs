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

//! Provides [Emulator] backend to run a registrar ledger in memory.

use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use num_bigint::BigUint;
use num_traits::Zero as _;

use registrar_core::abi::{self, AbiError, Token};
use registrar_core::{
    commitment, AccountId, Balance, Label, RegistrationScheme, RevertReason, Timestamp, TxHash,
    H256,
};

use crate::backend::{self, CallOutcome, CallRequest, ExecutionStatus, InclusionReceipt, TxStatus};
use crate::error::Error;
use crate::message::{
    self, AVAILABLE, COMMIT, COMMITMENTS, MAX_COMMITMENT_AGE, MIN_COMMITMENT_AGE, OWNER_OF,
    RENT_PRICE,
};
use crate::timer::Timer;
use crate::transaction::{KeyPair, Signer as _, Transaction};

/// Ledger time of the genesis block.
pub const GENESIS_TIME: Timestamp = 1_000;

/// Address the emulated registrar contract lives at.
pub const REGISTRAR_ADDRESS: AccountId = AccountId([0x52; 20]);

const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Parameters of the emulated ledger and registrar contract.
#[derive(Clone, Debug)]
pub struct EmulatorConfig {
    pub genesis_time: Timestamp,
    pub min_commitment_age: u64,
    pub max_commitment_age: u64,
    pub min_registration_duration: u64,
    /// Yearly rent for labels with 3, 4 and 5 or more characters.
    pub rent_per_year: [u64; 3],
    /// If set `rentPrice` returns `(base, premium)` instead of a single amount.
    pub premium: Option<u64>,
    /// The scheme the registrar uses to recompute commitments when a name is revealed.
    pub scheme: RegistrationScheme,
    /// Accounts funded at genesis.
    pub endowed: Vec<(AccountId, Balance)>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        let alice = KeyPair::from_seed_str("//Alice").account_id();
        EmulatorConfig {
            genesis_time: GENESIS_TIME,
            min_commitment_age: 60,
            max_commitment_age: 86_400,
            min_registration_duration: 28 * 24 * 60 * 60,
            rent_per_year: [640_000, 160_000, 5_000],
            premium: None,
            scheme: RegistrationScheme::ens_v3(),
            endowed: vec![(alice, BigUint::from(1_000_000_000_000_000_000u64))],
        }
    }
}

/// A registered name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRecord {
    pub owner: AccountId,
    pub expires: Timestamp,
    pub resolver: Option<AccountId>,
}

/// A transaction as it was handed to [backend::Backend::submit], accepted or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedCall {
    pub tx_hash: TxHash,
    pub from: AccountId,
    pub to: AccountId,
    pub value: Balance,
    pub data: Vec<u8>,
}

impl SubmittedCall {
    /// Whether the call data invokes `function`.
    pub fn invokes(&self, function: &abi::Function) -> bool {
        self.data.len() >= 4 && self.data[..4] == function.selector()
    }
}

/// [backend::Backend] implementation that runs a registrar contract in memory.
///
/// # Differences with a real ledger
///
/// * Every accepted transaction is executed immediately and creates a new block that only
///   contains this transaction.
///
/// * The clock only moves through [Emulator::advance_time] or an [EmulatorTimer].
///
/// * Failures only happen when they are injected with one of the test hooks.
#[derive(Clone)]
pub struct Emulator {
    state: Arc<Mutex<EmulatorState>>,
}

/// Mutable state of the emulator.
struct EmulatorState {
    config: EmulatorConfig,
    now: Timestamp,
    block_number: u64,
    balances: HashMap<AccountId, Balance>,
    nonces: HashMap<AccountId, u64>,
    registrar: RegistrarState,
    receipts: HashMap<TxHash, InclusionReceipt>,
    /// Included transactions that are reported as pending for the given number of status polls.
    pending: HashMap<TxHash, u32>,
    dropped: HashSet<TxHash>,
    submitted: Vec<SubmittedCall>,
    hooks: Hooks,
}

#[derive(Default)]
struct Hooks {
    failing_reads: u32,
    simulation_disabled: bool,
    delay_next_inclusion: Option<u32>,
    drop_next_submission: bool,
    lose_next_submission_response: bool,
}

impl Emulator {
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        let balances = config.endowed.iter().cloned().collect();
        Emulator {
            state: Arc::new(Mutex::new(EmulatorState {
                now: config.genesis_time,
                block_number: 0,
                balances,
                nonces: HashMap::new(),
                registrar: RegistrarState::default(),
                receipts: HashMap::new(),
                pending: HashMap::new(),
                dropped: HashSet::new(),
                submitted: Vec::new(),
                hooks: Hooks::default(),
                config,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<EmulatorState> {
        self.state.lock().unwrap()
    }

    pub fn address(&self) -> AccountId {
        REGISTRAR_ADDRESS
    }

    /// The scheme the registrar recomputes commitments with.
    pub fn scheme(&self) -> RegistrationScheme {
        self.lock().config.scheme.clone()
    }

    pub fn now(&self) -> Timestamp {
        self.lock().now
    }

    pub fn advance_time(&self, seconds: u64) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(seconds);
    }

    pub fn fund(&self, account_id: AccountId, amount: Balance) {
        let mut state = self.lock();
        let balance = state.balances.entry(account_id).or_insert_with(BigUint::zero);
        *balance += amount;
    }

    pub fn balance(&self, account_id: AccountId) -> Balance {
        self.lock().balance(account_id)
    }

    /// The registration of `label`, expired or not.
    pub fn registration(&self, label: &str) -> Option<NameRecord> {
        self.lock().registrar.names.get(label).cloned()
    }

    /// Every transaction handed to [backend::Backend::submit] in submission order.
    pub fn submitted(&self) -> Vec<SubmittedCall> {
        self.lock().submitted.clone()
    }

    /// Let the next `count` reads fail with a transient transport error.
    pub fn fail_next_reads(&self, count: u32) {
        self.lock().hooks.failing_reads = count;
    }

    /// Make [backend::Backend::simulate] return [Error::Unsupported].
    pub fn disable_simulation(&self) {
        self.lock().hooks.simulation_disabled = true;
    }

    /// Report the next accepted transaction as pending for `polls` status queries.
    ///
    /// Waiting for its inclusion times out until then.
    pub fn delay_next_inclusion(&self, polls: u32) {
        self.lock().hooks.delay_next_inclusion = Some(polls);
    }

    /// Accept the next transaction but never include it.
    pub fn drop_next_submission(&self) {
        self.lock().hooks.drop_next_submission = true;
    }

    /// Include the next transaction but answer the submission with a transport error.
    pub fn lose_next_submission_response(&self) {
        self.lock().hooks.lose_next_submission_response = true;
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorState {
    fn balance(&self, account_id: AccountId) -> Balance {
        self.balances
            .get(&account_id)
            .cloned()
            .unwrap_or_else(BigUint::zero)
    }

    fn nonce(&self, account_id: AccountId) -> u64 {
        self.nonces.get(&account_id).copied().unwrap_or(0)
    }

    fn take_read_failure(&mut self) -> Result<(), Error> {
        if self.hooks.failing_reads > 0 {
            self.hooks.failing_reads -= 1;
            return Err(Error::Transport("injected transport failure".to_string()));
        }
        Ok(())
    }

    /// Run `request` against a copy of the registrar state.
    fn dry_run(&self, request: &CallRequest) -> CallOutcome {
        if request.to != REGISTRAR_ADDRESS {
            return CallOutcome::Returned(Vec::new());
        }
        let mut scratch = self.registrar.clone();
        match scratch.execute(&self.config, self.now, &request.value, &request.data) {
            Ok(execution) => CallOutcome::Returned(execution.output),
            Err(revert) => CallOutcome::Reverted(revert),
        }
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: &Balance) {
        if amount.is_zero() {
            return;
        }
        if let Some(balance) = self.balances.get_mut(&from) {
            *balance -= amount;
        }
        let balance = self.balances.entry(to).or_insert_with(BigUint::zero);
        *balance += amount;
    }

    /// Execute an accepted transaction in a new block.
    fn include(&mut self, transaction: &Transaction) -> InclusionReceipt {
        let author = transaction.author();
        let payload = transaction.payload();
        self.block_number += 1;

        let status = if payload.to == REGISTRAR_ADDRESS {
            let outcome =
                self.registrar
                    .execute(&self.config, self.now, &payload.value, &payload.data);
            match outcome {
                Ok(execution) => {
                    self.transfer(author, REGISTRAR_ADDRESS, &execution.charged);
                    ExecutionStatus::Succeeded
                }
                Err(revert) => ExecutionStatus::Reverted(revert),
            }
        } else {
            self.transfer(author, payload.to, &payload.value);
            ExecutionStatus::Succeeded
        };

        InclusionReceipt {
            tx_hash: transaction.hash(),
            block_number: self.block_number,
            block_time: self.now,
            status,
        }
    }
}

/// Storage of the registrar contract.
#[derive(Clone, Default)]
struct RegistrarState {
    commitments: HashMap<H256, Timestamp>,
    names: HashMap<String, NameRecord>,
}

/// Effects of a successful registrar call.
struct Execution {
    output: Vec<u8>,
    /// Part of the attached value the registrar keeps.
    charged: Balance,
}

fn returned(tokens: &[Token]) -> Result<Execution, Vec<u8>> {
    let output = abi::encode(tokens).map_err(|error| RevertReason::message(&error.to_string()))?;
    Ok(Execution {
        output,
        charged: BigUint::zero(),
    })
}

fn custom_error(name: &str, args: Vec<Token>) -> Vec<u8> {
    RevertReason::custom(name, args).unwrap_or_default()
}

fn invalid_input(error: impl std::fmt::Display) -> Vec<u8> {
    RevertReason::message(&format!("invalid input: {}", error))
}

fn single_arg(function: &abi::Function, data: &[u8]) -> Result<Token, Vec<u8>> {
    function
        .decode_call(data)
        .map_err(invalid_input)?
        .pop()
        .ok_or_else(|| invalid_input(AbiError::TooShort))
}

impl RegistrarState {
    /// Execute a registrar call. Returns the revert data on failure.
    fn execute(
        &mut self,
        config: &EmulatorConfig,
        now: Timestamp,
        value: &Balance,
        data: &[u8],
    ) -> Result<Execution, Vec<u8>> {
        if data.len() < 4 {
            return Err(Vec::new());
        }
        let selector = &data[..4];

        if selector == AVAILABLE.selector() {
            let label = single_arg(&AVAILABLE, data)?
                .into_string()
                .unwrap_or_default();
            returned(&[Token::Bool(self.is_available(&label, now))])
        } else if selector == COMMITMENTS.selector() {
            let commitment = single_arg(&COMMITMENTS, data)?;
            let key = H256::from_slice(&commitment.into_fixed_bytes().unwrap_or_default())
                .map_err(invalid_input)?;
            let accepted_at = self.commitments.get(&key).copied().unwrap_or(0);
            returned(&[Token::uint256(accepted_at)])
        } else if selector == MIN_COMMITMENT_AGE.selector() {
            returned(&[Token::uint256(config.min_commitment_age)])
        } else if selector == MAX_COMMITMENT_AGE.selector() {
            returned(&[Token::uint256(config.max_commitment_age)])
        } else if selector == RENT_PRICE.selector() {
            let mut args = RENT_PRICE.decode_call(data).map_err(invalid_input)?.into_iter();
            let label = args.next().and_then(Token::into_string).unwrap_or_default();
            let duration = args.next().and_then(Token::into_uint).unwrap_or_default();
            let base = rent(config, &label, &duration);
            match config.premium {
                Some(premium) => returned(&[Token::uint256(base), Token::uint256(premium)]),
                None => returned(&[Token::uint256(base)]),
            }
        } else if selector == OWNER_OF.selector() {
            let token_id = single_arg(&OWNER_OF, data)?.into_uint().unwrap_or_default();
            match self.owner_of(&token_id, now) {
                Some(owner) => returned(&[Token::Address(owner)]),
                None => Err(RevertReason::message("ERC721: invalid token ID")),
            }
        } else if selector == COMMIT.selector() {
            let commitment = single_arg(&COMMIT, data)?;
            let key = H256::from_slice(&commitment.into_fixed_bytes().unwrap_or_default())
                .map_err(invalid_input)?;
            self.commit(config, now, key)
        } else if selector == config.scheme.reveal.function().selector() {
            self.register(config, now, value, data)
        } else {
            Err(Vec::new())
        }
    }

    fn is_available(&self, label: &str, now: Timestamp) -> bool {
        Label::try_from(label).is_ok()
            && self
                .names
                .get(label)
                .map_or(true, |record| record.expires <= now)
    }

    fn owner_of(&self, token_id: &BigUint, now: Timestamp) -> Option<AccountId> {
        self.names
            .iter()
            .filter(|(_, record)| record.expires > now)
            .find(|(label, _)| {
                Label::try_from(label.as_str())
                    .map_or(false, |label| message::token_id(&label) == *token_id)
            })
            .map(|(_, record)| record.owner)
    }

    fn commit(
        &mut self,
        config: &EmulatorConfig,
        now: Timestamp,
        commitment: H256,
    ) -> Result<Execution, Vec<u8>> {
        if let Some(accepted_at) = self.commitments.get(&commitment) {
            if accepted_at.saturating_add(config.max_commitment_age) >= now {
                return Err(custom_error(
                    "UnexpiredCommitmentExists",
                    vec![Token::FixedBytes(commitment.as_bytes().to_vec())],
                ));
            }
        }
        self.commitments.insert(commitment, now);
        returned(&[])
    }

    fn register(
        &mut self,
        config: &EmulatorConfig,
        now: Timestamp,
        value: &Balance,
        data: &[u8],
    ) -> Result<Execution, Vec<u8>> {
        let (request, secret) = config
            .scheme
            .reveal
            .decode_call(data)
            .map_err(invalid_input)?;
        let commitment = commitment::build(&request, &secret, &config.scheme.commitment)
            .map_err(invalid_input)?
            .hash();
        let commitment_arg = || vec![Token::FixedBytes(commitment.as_bytes().to_vec())];

        let accepted_at = match self.commitments.get(&commitment) {
            Some(accepted_at) => *accepted_at,
            None => return Err(custom_error("InvalidCommitment", commitment_arg())),
        };
        if accepted_at.saturating_add(config.min_commitment_age) > now {
            return Err(custom_error("CommitmentTooNew", commitment_arg()));
        }
        if accepted_at.saturating_add(config.max_commitment_age) < now {
            return Err(custom_error("CommitmentTooOld", commitment_arg()));
        }

        let label = request.label().as_str();
        if !self.is_available(label, now) {
            return Err(custom_error(
                "NameNotAvailable",
                vec![Token::String(label.to_string())],
            ));
        }
        if request.duration() < config.min_registration_duration {
            return Err(custom_error(
                "DurationTooShort",
                vec![Token::uint256(request.duration())],
            ));
        }
        if !request.data().is_empty() && request.resolver_address().is_none() {
            return Err(custom_error("ResolverRequiredWhenDataSupplied", vec![]));
        }

        let base = rent(config, label, &BigUint::from(request.duration()));
        let price = base + config.premium.unwrap_or(0);
        if *value < price {
            return Err(custom_error("InsufficientValue", vec![]));
        }

        self.commitments.remove(&commitment);
        self.names.insert(
            label.to_string(),
            NameRecord {
                owner: request.owner(),
                expires: now.saturating_add(request.duration()),
                resolver: request.resolver_address(),
            },
        );
        Ok(Execution {
            output: Vec::new(),
            charged: price,
        })
    }
}

/// Yearly rent of the label's length tier prorated to `duration`.
fn rent(config: &EmulatorConfig, label: &str, duration: &BigUint) -> BigUint {
    let tier = match label.chars().count() {
        0..=3 => 0,
        4 => 1,
        _ => 2,
    };
    BigUint::from(config.rent_per_year[tier]) * duration / BigUint::from(SECONDS_PER_YEAR)
}

#[async_trait::async_trait]
impl backend::Backend for Emulator {
    async fn call(&self, request: CallRequest) -> Result<CallOutcome, Error> {
        let mut state = self.lock();
        state.take_read_failure()?;
        Ok(state.dry_run(&request))
    }

    async fn simulate(&self, request: CallRequest) -> Result<CallOutcome, Error> {
        let mut state = self.lock();
        if state.hooks.simulation_disabled {
            return Err(Error::Unsupported);
        }
        state.take_read_failure()?;
        if state.balance(request.from) < request.value {
            return Err(Error::InvalidTransaction("insufficient balance".to_string()));
        }
        Ok(state.dry_run(&request))
    }

    async fn submit(&self, transaction: Transaction) -> Result<TxHash, Error> {
        let mut state = self.lock();
        let tx_hash = transaction.hash();
        let author = transaction.author();
        let payload = transaction.payload().clone();
        state.submitted.push(SubmittedCall {
            tx_hash,
            from: author,
            to: payload.to,
            value: payload.value.clone(),
            data: payload.data.clone(),
        });

        if !transaction.verify() {
            return Err(Error::InvalidTransaction("invalid signature".to_string()));
        }
        let expected_nonce = state.nonce(author);
        if payload.nonce != expected_nonce {
            return Err(Error::InvalidTransaction(format!(
                "expected nonce {} but got {}",
                expected_nonce, payload.nonce
            )));
        }
        if state.balance(author) < payload.value {
            return Err(Error::InvalidTransaction("insufficient balance".to_string()));
        }
        state.nonces.insert(author, expected_nonce + 1);

        if state.hooks.drop_next_submission {
            state.hooks.drop_next_submission = false;
            state.dropped.insert(tx_hash);
            return Ok(tx_hash);
        }

        let receipt = state.include(&transaction);
        state.receipts.insert(tx_hash, receipt);
        if let Some(polls) = state.hooks.delay_next_inclusion.take() {
            state.pending.insert(tx_hash, polls);
        }

        if state.hooks.lose_next_submission_response {
            state.hooks.lose_next_submission_response = false;
            return Err(Error::Transport(
                "connection lost after submission".to_string(),
            ));
        }
        Ok(tx_hash)
    }

    async fn await_inclusion(&self, tx_hash: TxHash) -> Result<InclusionReceipt, Error> {
        let state = self.lock();
        if state.pending.contains_key(&tx_hash) {
            return Err(Error::Timeout);
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(Error::UnknownTransaction(tx_hash))
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, Error> {
        let mut state = self.lock();
        state.take_read_failure()?;
        if let Some(polls) = state.pending.get_mut(&tx_hash) {
            if *polls > 0 {
                *polls -= 1;
                return Ok(TxStatus::Pending);
            }
            state.pending.remove(&tx_hash);
        }
        Ok(state
            .receipts
            .get(&tx_hash)
            .cloned()
            .map_or(TxStatus::Unknown, TxStatus::Included))
    }

    async fn ledger_time(&self) -> Result<Timestamp, Error> {
        let mut state = self.lock();
        state.take_read_failure()?;
        Ok(state.now)
    }

    async fn account_nonce(&self, account_id: AccountId) -> Result<u64, Error> {
        let mut state = self.lock();
        state.take_read_failure()?;
        Ok(state.nonce(account_id))
    }
}

/// [Timer] that advances the clock of an [Emulator] instead of sleeping.
///
/// Every requested sleep is recorded. Fractions of a second are rounded up.
#[derive(Clone)]
pub struct EmulatorTimer {
    emulator: Emulator,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl EmulatorTimer {
    pub fn new(emulator: Emulator) -> Self {
        EmulatorTimer {
            emulator,
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All sleeps requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Timer for EmulatorTimer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let rounding = if duration.subsec_nanos() > 0 { 1 } else { 0 };
        self.emulator.advance_time(duration.as_secs() + rounding);
        async_std::task::yield_now().await;
    }
}
