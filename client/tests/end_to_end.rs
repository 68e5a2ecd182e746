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

//! Run complete registrations against the emulated registrar.

use std::time::Duration;

use registrar_client::backend::{Emulator, EmulatorConfig, GENESIS_TIME};
use registrar_client::*;
use registrar_test_utils::*;

fn emulator_with_flat_price() -> Emulator {
    let mut config = EmulatorConfig::default();
    config.rent_per_year = [4_000, 2_000, 1_000];
    config.premium = Some(0);
    Emulator::with_config(config)
}

#[async_std::test]
async fn register_example() {
    let _ = env_logger::try_init();
    let emulator = emulator_with_flat_price();
    let config = config_with_buffer(&emulator, 15);
    let (orchestrator, timer) = emulated_orchestrator(&emulator, &config);

    let registered = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();

    let commit = &commits(&emulator)[0];
    assert_eq!(commit.from, alice().account_id());
    assert_eq!(timer.sleeps(), vec![Duration::from_secs(75)]);
    assert_eq!(registered.waited, Duration::from_secs(75));

    assert_eq!(
        registered.quote.raw,
        RawPrice::Split {
            base: 1_000u32.into(),
            premium: 0u32.into()
        }
    );
    assert_eq!(registered.quote.quoted_at, GENESIS_TIME + 75);
    assert_eq!(registered.paid, 1_050u32.into());

    let reveals = reveals(&emulator, orchestrator.scheme());
    assert_eq!(reveals.len(), 1);
    assert_eq!(reveals[0].value, 1_050u32.into());

    assert_eq!(
        registered.states,
        vec![
            RegistrationState::Idle,
            RegistrationState::CheckingAvailability,
            RegistrationState::Committing,
            RegistrationState::AwaitingMaturity,
            RegistrationState::Pricing,
            RegistrationState::Preflighting,
            RegistrationState::Revealing,
            RegistrationState::Succeeded,
        ]
    );

    let record = emulator.registration("example").unwrap();
    assert_eq!(record.owner, alice().account_id());
    assert_eq!(record.expires, GENESIS_TIME + 75 + ONE_YEAR);
}

#[async_std::test]
async fn unavailable_name_submits_nothing() {
    let _ = env_logger::try_init();
    let emulator = emulator_with_flat_price();
    let config = config_with_buffer(&emulator, 15);
    let (orchestrator, _) = emulated_orchestrator(&emulator, &config);
    orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap();
    let submitted_before = emulator.submitted().len();

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RegistrationError::NameUnavailable));
    assert_eq!(failure.commitment, None);
    assert_eq!(
        failure.states,
        vec![
            RegistrationState::Idle,
            RegistrationState::CheckingAvailability,
            RegistrationState::Failed,
        ]
    );
    assert_eq!(emulator.submitted().len(), submitted_before);
}

#[async_std::test]
async fn scheme_mismatch_is_caught_by_preflight() {
    let _ = env_logger::try_init();
    let mut emulator_config = EmulatorConfig::default();
    emulator_config.scheme = RegistrationScheme::packed_minimal();
    let emulator = Emulator::with_config(emulator_config);
    let config = config_with_buffer(&emulator, 15);
    let (orchestrator, _) =
        emulated_orchestrator_with_scheme(&emulator, &config, RegistrationScheme::ens_v3());

    let failure = orchestrator
        .register(request_for("example"), &CancelToken::never())
        .await
        .unwrap_err();

    match &failure.error {
        RegistrationError::PreflightRejected(reason) => {
            assert_eq!(reason.to_string(), "InvalidCommitment")
        }
        error => panic!("Unexpected error {:?}", error),
    }
    assert!(failure.commitment.is_some());
    assert_eq!(commits(&emulator).len(), 1);
    assert!(reveals(&emulator, &RegistrationScheme::ens_v3()).is_empty());
    assert_eq!(failure.states.last(), Some(&RegistrationState::Failed));
    assert!(!failure.states.contains(&RegistrationState::Revealing));
}

#[async_std::test]
async fn every_preset_registers_against_a_matching_registrar() {
    let _ = env_logger::try_init();
    for scheme in scheme::presets() {
        let mut emulator_config = EmulatorConfig::default();
        emulator_config.scheme = scheme.clone();
        let emulator = Emulator::with_config(emulator_config);
        let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));

        let label = random_label();
        let registered = orchestrator
            .register(request_for(&label), &CancelToken::never())
            .await
            .unwrap_or_else(|failure| panic!("{} failed: {}", scheme.name, failure));
        assert_eq!(registered.label.as_str(), label);
        assert!(emulator.registration(&label).is_some());
    }
}

#[async_std::test]
async fn resolver_instructions_are_committed_and_revealed() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    let resolver = AccountId([0x77; 20]);
    let instruction =
        resolver::set_addr_instruction("example.eth", alice().account_id()).unwrap();
    let request = request_for("example")
        .resolver(resolver)
        .instruction(instruction);

    orchestrator
        .register(request, &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        emulator.registration("example").unwrap().resolver,
        Some(resolver)
    );
}

#[async_std::test]
async fn instructions_without_resolver_are_rejected_before_reveal() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    let request = request_for("example").instruction(vec![1, 2, 3]);

    let failure = orchestrator
        .register(request, &CancelToken::never())
        .await
        .unwrap_err();

    match failure.error {
        RegistrationError::PreflightRejected(reason) => {
            assert_eq!(reason.custom_name(), Some("ResolverRequiredWhenDataSupplied"))
        }
        error => panic!("Unexpected error {:?}", error),
    }
    assert!(reveals(&emulator, orchestrator.scheme()).is_empty());
}

#[async_std::test]
async fn too_short_duration_is_rejected_before_reveal() {
    let _ = env_logger::try_init();
    let emulator = Emulator::new();
    let (orchestrator, _) = emulated_orchestrator(&emulator, &Config::new(emulator.address()));
    let request = RegistrationRequest::new("example", 3_600, alice().account_id()).unwrap();

    let failure = orchestrator
        .register(request, &CancelToken::never())
        .await
        .unwrap_err();

    match failure.error {
        RegistrationError::PreflightRejected(reason) => {
            assert_eq!(reason.custom_name(), Some("DurationTooShort"))
        }
        error => panic!("Unexpected error {:?}", error),
    }
}
