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

//! Miscellaneous helpers used throughout registrar tests.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use registrar_client::backend::{Emulator, EmulatorTimer, SubmittedCall};
use registrar_client::message::COMMIT;
use registrar_client::*;

/// One year in seconds.
pub const ONE_YEAR: u64 = 31_536_000;

pub fn alice() -> KeyPair {
    key_pair_from_string("Alice")
}

pub fn key_pair_from_string(value: impl AsRef<str>) -> KeyPair {
    KeyPair::from_seed_str(&format!("//{}", value.as_ref()))
}

/// An [Orchestrator] for `emulator` that signs as Alice with the emulator's scheme.
///
/// Returns the [EmulatorTimer] as well so that tests can inspect the requested sleeps.
pub fn emulated_orchestrator(
    emulator: &Emulator,
    config: &Config,
) -> (Orchestrator, EmulatorTimer) {
    emulated_orchestrator_with_scheme(emulator, config, emulator.scheme())
}

/// Like [emulated_orchestrator] but the client uses `scheme`, whatever the registrar enforces.
pub fn emulated_orchestrator_with_scheme(
    emulator: &Emulator,
    config: &Config,
    scheme: RegistrationScheme,
) -> (Orchestrator, EmulatorTimer) {
    let timer = EmulatorTimer::new(emulator.clone());
    let orchestrator = Orchestrator::new(
        Arc::new(emulator.clone()),
        Arc::new(alice()),
        Arc::new(timer.clone()),
        scheme,
        config,
    );
    (orchestrator, timer)
}

/// Configuration for the emulated registrar with the given safety buffer.
pub fn config_with_buffer(emulator: &Emulator, safety_buffer_secs: u64) -> Config {
    let mut config = Config::new(emulator.address());
    config.safety_buffer_secs = safety_buffer_secs;
    config
}

/// A one year registration of `label` owned by Alice.
pub fn request_for(label: &str) -> RegistrationRequest {
    RegistrationRequest::new(label, ONE_YEAR, alice().account_id()).unwrap()
}

/// A random valid label of 8 to 16 characters.
pub fn random_label() -> String {
    let size = rand::thread_rng().gen_range(8..17);
    random_alnum_string(size).to_lowercase()
}

pub fn random_alnum_string(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect::<String>()
}

/// Submitted calls that commit.
pub fn commits(emulator: &Emulator) -> Vec<SubmittedCall> {
    emulator
        .submitted()
        .into_iter()
        .filter(|call| call.invokes(&COMMIT))
        .collect()
}

/// Submitted calls that reveal under `scheme`.
pub fn reveals(emulator: &Emulator, scheme: &RegistrationScheme) -> Vec<SubmittedCall> {
    let reveal = scheme.reveal.function();
    emulator
        .submitted()
        .into_iter()
        .filter(|call| call.invokes(&reveal))
        .collect()
}
