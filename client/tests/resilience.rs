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

//! Registrations against an emulated registrar that misbehaves.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use registrar_client::backend::{Emulator, EmulatorTimer, GENESIS_TIME};
use registrar_client::*;
use registrar_test_utils::*;

type Hook = Box<dyn FnOnce(&Emulator) + Send>;

fn hook(hook: impl FnOnce(&Emulator) + Send + 'static) -> Hook {
    Box::new(hook)
}

/// Runs the next hook on every sleep and otherwise behaves like an [EmulatorTimer].
struct ScriptedTimer {
    inner: EmulatorTimer,
    emulator: Emulator,
    hooks: Mutex<VecDeque<Hook>>,
}

impl ScriptedTimer {
    fn new(emulator: &Emulator, hooks: Vec<Hook>) -> Self {
        ScriptedTimer {
            inner: EmulatorTimer::new(emulator.clone()),
            emulator: emulator.clone(),
            hooks: Mutex::new(hooks.into()),
        }
    }
}

#[async_trait::async_trait]
impl Timer for ScriptedTimer {
    async fn sleep(&self, duration: Duration) {
        let hook = self.hooks.lock().unwrap().pop_front();
        if let Some(hook) = hook {
            hook(&self.emulator);
        }
        self.inner.sleep(duration).await
    }
}

/// Cancels on the first sleep and never wakes up from it.
struct CancellingTimer {
    handle: Mutex<Option<CancelHandle>>,
}

#[async_trait::async_trait]
impl Timer for CancellingTimer {
    async fn sleep(&self, _duration: Duration) {
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.cancel();
        }
        futures::future::pending::<()>().await
    }
}

/// Advances the emulator clock ten seconds less than requested on the first sleep.
struct LaggingTimer {
    inner: EmulatorTimer,
    lagged: Mutex<bool>,
}

#[async_trait::async_trait]
impl Timer for LaggingTimer {
    async fn sleep(&self, duration: Duration) {
        let lag = {
            let mut lagged = self.lagged.lock().unwrap();
            let lag = !*lagged;
            *lagged = true;
            lag
        };
        if lag {
            self.inner.sleep(duration - Duration::from_secs(10)).await
        } else {
            self.inner.sleep(duration).await
        }
    }
}

fn orchestrator_with_timer(
    emulator: &Emulator,
    config: &Config,
    timer: Arc<dyn Timer>,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(emulator.clone()),
        Arc::new(alice()),
        timer,
        emulator.scheme(),
        config,
    )
}

#[async_std::test]
async fn transient_read_failures_are_retried() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, timer) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    emulator.fail_next_reads(3);

    orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        timer.sleeps()[..3],
        [
            Duration::from_millis(500),
            Duration::from_millis(1_000),
            Duration::from_millis(2_000)
        ]
    );
    assert_eq!(commits(&emulator).len(), 1);
}

#[async_std::test]
async fn exhausted_read_retries_fail_without_spending() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    emulator.fail_next_reads(4);

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        RegistrationError::LedgerUnavailable(Error::Transport(_))
    ));
    assert!(emulator.submitted().is_empty());
}

#[async_std::test]
async fn commit_inclusion_timeout_is_resolved_by_status_polls() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let config = config_with_buffer(&emulator, 15);
    let (orchestrator, timer) = emulated_orchestrator(&emulator, &config);
    emulator.delay_next_inclusion(2);

    let registered = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    // Two status poll intervals passed before the commit was seen.
    assert_eq!(
        timer.sleeps(),
        vec![
            Duration::from_secs(6),
            Duration::from_secs(6),
            Duration::from_secs(63)
        ]
    );
    assert_eq!(registered.waited, Duration::from_secs(63));
    assert_eq!(commits(&emulator).len(), 1);
}

#[async_std::test]
async fn dropped_commit_fails_before_maturity() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    emulator.drop_next_submission();

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        RegistrationError::CommitFailed(SubmissionError::Rejected(_))
    ));
    assert_eq!(
        failure.states,
        vec![
            RegistrationState::Idle,
            RegistrationState::CheckingAvailability,
            RegistrationState::Committing,
            RegistrationState::Failed,
        ]
    );
    assert!(reveals(&emulator, orchestrator.scheme()).is_empty());
}

#[async_std::test]
async fn lost_commit_response_is_not_resubmitted() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    emulator.lose_next_submission_response();

    orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(commits(&emulator).len(), 1);
    assert_eq!(reveals(&emulator, orchestrator.scheme()).len(), 1);
}

#[async_std::test]
async fn pending_reveal_is_confirmed_through_ownership() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let mut config = Config::new(emulator.address());
    config.status_polls = 3;
    let timer = ScriptedTimer::new(
        &emulator,
        vec![hook(|emulator| emulator.delay_next_inclusion(100))],
    );
    let orchestrator = orchestrator_with_timer(&emulator, &config, Arc::new(timer));

    let registered = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    assert!(registered.reveal.is_none());
    assert_eq!(registered.states.last(), Some(&RegistrationState::Succeeded));
    let reveals = reveals(&emulator, orchestrator.scheme());
    assert_eq!(reveals.len(), 1);
    assert_eq!(registered.reveal_tx, reveals[0].tx_hash);
    assert_eq!(
        emulator.registration("example").unwrap().owner,
        alice().account_id()
    );
}

#[async_std::test]
async fn unconfirmable_reveal_reports_its_transaction() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let mut config = Config::new(emulator.address());
    config.status_polls = 2;
    let timer = ScriptedTimer::new(
        &emulator,
        vec![
            hook(|emulator| emulator.delay_next_inclusion(100)),
            hook(|emulator| emulator.fail_next_reads(100)),
        ],
    );
    let orchestrator = orchestrator_with_timer(&emulator, &config, Arc::new(timer));

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    let reveals = reveals(&emulator, orchestrator.scheme());
    assert_eq!(reveals.len(), 1);
    match failure.error {
        RegistrationError::RevealUnconfirmed { tx_hash } => {
            assert_eq!(tx_hash, reveals[0].tx_hash)
        }
        error => panic!("Unexpected error {:?}", error),
    }
}

#[async_std::test]
async fn reverted_reveal_without_simulation() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let config = Config::new(emulator.address());
    let timer = ScriptedTimer::new(
        &emulator,
        vec![hook(|emulator| {
            emulator.disable_simulation();
            emulator.advance_time(100_000);
        })],
    );
    let orchestrator = orchestrator_with_timer(&emulator, &config, Arc::new(timer));

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    match failure.error {
        RegistrationError::RevealReverted(reason) => {
            assert_eq!(reason.to_string(), "CommitmentTooOld")
        }
        error => panic!("Unexpected error {:?}", error),
    }
    assert!(failure.states.contains(&RegistrationState::Revealing));
    assert!(emulator.registration("example").is_none());
}

#[async_std::test]
async fn skipped_preflight_still_registers() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    emulator.disable_simulation();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));

    orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    assert!(emulator.registration("example").is_some());
}

#[async_std::test]
async fn cancellation_during_maturity_wait_stops_before_reveal() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (handle, token) = cancellation();
    let timer = CancellingTimer {
        handle: Mutex::new(Some(handle)),
    };
    let orchestrator =
        orchestrator_with_timer(&emulator, &Config::new(emulator.address()), Arc::new(timer));

    let failure = orchestrator
        .register(request_for("example"), &token)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RegistrationError::Cancelled));
    assert_eq!(failure.states.last(), Some(&RegistrationState::Failed));
    assert!(failure.states.contains(&RegistrationState::AwaitingMaturity));
    assert!(!failure.states.contains(&RegistrationState::Pricing));
    assert_eq!(commits(&emulator).len(), 1);
    assert!(reveals(&emulator, orchestrator.scheme()).is_empty());
}

#[async_std::test]
async fn cancellation_during_reveal_inclusion_still_registers() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (handle, token) = cancellation();
    let timer = ScriptedTimer::new(
        &emulator,
        vec![
            hook(|emulator| emulator.delay_next_inclusion(2)),
            hook(move |_| handle.cancel()),
        ],
    );
    let orchestrator =
        orchestrator_with_timer(&emulator, &Config::new(emulator.address()), Arc::new(timer));

    let registered = orchestrator
        .register(request_for("example"), &token)
        .await
        .unwrap();

    assert!(token.is_cancelled());
    assert!(registered.reveal.is_some());
    assert_eq!(reveals(&emulator, orchestrator.scheme()).len(), 1);
    assert!(emulator.registration("example").is_some());
}

#[async_std::test]
async fn cancellation_during_commit_inclusion_stops_before_reveal() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    emulator.delay_next_inclusion(2);
    let (handle, token) = cancellation();
    let timer = ScriptedTimer::new(&emulator, vec![hook(move |_| handle.cancel())]);
    let orchestrator =
        orchestrator_with_timer(&emulator, &Config::new(emulator.address()), Arc::new(timer));

    let failure = orchestrator
        .register(request_for("example"), &token)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RegistrationError::Cancelled));
    assert!(failure.states.contains(&RegistrationState::AwaitingMaturity));
    assert_eq!(commits(&emulator).len(), 1);
    assert!(reveals(&emulator, orchestrator.scheme()).is_empty());

    // The commit was followed to its inclusion and the next nonce is free.
    let registered = orchestrator
        .register(request_for("sample"), &CancelToken::never())
        .await
        .unwrap();
    assert_eq!(registered.label.as_str(), "sample");
}

#[async_std::test]
async fn cancelled_before_start_submits_nothing() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    let (handle, token) = cancellation();
    handle.cancel();

    let failure = orchestrator
        .register(request_for("example"), &token)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RegistrationError::Cancelled));
    assert!(emulator.submitted().is_empty());
}

#[async_std::test]
async fn immature_commitment_is_waited_for_again() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let config = config_with_buffer(&emulator, 0);
    let timer = LaggingTimer {
        inner: EmulatorTimer::new(emulator.clone()),
        lagged: Mutex::new(false),
    };
    let orchestrator = orchestrator_with_timer(&emulator, &config, Arc::new(timer));

    let registered = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(registered.waited, Duration::from_secs(70));
    assert_eq!(registered.quote.quoted_at, GENESIS_TIME + 60);
}

#[async_std::test]
async fn concurrent_attempts_use_distinct_secrets() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));

    let first_cancel = CancelToken::never();
    let second_cancel = CancelToken::never();
    let (first, second) = futures::join!(
        orchestrator.register(request_for("example"), &first_cancel),
        orchestrator.register(request_for("sample"), &second_cancel),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_ne!(first.commitment, second.commitment);
    assert_eq!(commits(&emulator).len(), 2);
    assert_eq!(reveals(&emulator, orchestrator.scheme()).len(), 2);
    assert!(emulator.registration("example").is_some());
    assert!(emulator.registration("sample").is_some());
}

#[async_std::test]
async fn same_request_twice_gives_different_commitments() {
    let _ = env_logger::try_init();
    let mut commitments = Vec::new();
    for _ in 0..2 {
        let emulator = Emulator::new();
        let (orchestrator, _) =
            emulated_orchestrator(&emulator, &Config::new(emulator.address()));
        let registered = orchestrator
            .register(request_for("example"), &CancelToken::never())
            .await
            .unwrap();
        commitments.push(registered.commitment);
    }
    assert_ne!(commitments[0], commitments[1]);
}
