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

//! Register a name against the in-memory registrar.
//!
//! The emulated clock advances whenever the client sleeps, so the example finishes immediately
//! even though the registration waits for the commitment to mature.
//!
//! Run with `RUST_LOG=info` to follow the attempt.

use std::sync::Arc;

use registrar_client::backend::{Emulator, EmulatorTimer};
use registrar_client::*;

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let emulator = Emulator::new();
    let alice = KeyPair::from_seed_str("//Alice");
    let request = RegistrationRequest::new("example", 31_536_000, alice.account_id())?;

    let orchestrator = Orchestrator::new(
        Arc::new(emulator.clone()),
        Arc::new(alice),
        Arc::new(EmulatorTimer::new(emulator.clone())),
        RegistrationScheme::ens_v3(),
        &Config::new(emulator.address()),
    );
    let registered = orchestrator.register(request, &CancelToken::never()).await?;

    println!(
        "Registered {} with commitment {} after waiting {:?}, paying {}",
        registered.label, registered.commitment, registered.waited, registered.paid
    );
    Ok(())
}
