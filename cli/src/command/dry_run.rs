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

use std::sync::Arc;

use registrar_client::backend::{Emulator, EmulatorConfig, EmulatorTimer};

use super::*;

#[derive(StructOpt, Debug, Clone)]
pub struct DryRun {
    #[structopt(flatten)]
    request_options: RequestOptions,

    #[structopt(flatten)]
    scheme_options: SchemeOptions,

    /// Preset the emulated registrar enforces. Defaults to the client's scheme.
    #[structopt(long, value_name = "preset")]
    registrar_scheme: Option<String>,

    /// Margin added to the quoted price in basis points.
    #[structopt(long, default_value = "500", env = "REGISTRAR_MARGIN_BPS")]
    margin_bps: u32,

    /// Seconds to wait beyond the minimum commitment age.
    #[structopt(long, default_value = "60", env = "REGISTRAR_SAFETY_BUFFER")]
    safety_buffer: u64,

    /// Seed of the signing key. The emulator funds the key of "Alice".
    #[structopt(long, default_value = "Alice", env = "REGISTRAR_AUTHOR_SEED")]
    author_key_seed: String,
}

#[async_trait::async_trait]
impl CommandT for DryRun {
    async fn run(&self) -> Result<(), CommandError> {
        let author = KeyPair::from_seed_str(&format!("//{}", self.author_key_seed));
        let request = self.request_options.request(author.account_id())?;
        let scheme = self.scheme_options.scheme()?;
        let registrar_scheme = match &self.registrar_scheme {
            Some(name) => crate::lookup_preset(name)?,
            None => scheme.clone(),
        };

        let emulator = Emulator::with_config(EmulatorConfig {
            scheme: registrar_scheme.clone(),
            ..EmulatorConfig::default()
        });
        let mut config = Config::new(emulator.address());
        config.margin_bps = self.margin_bps;
        config.safety_buffer_secs = self.safety_buffer;
        let orchestrator = Orchestrator::new(
            Arc::new(emulator.clone()),
            Arc::new(author),
            Arc::new(EmulatorTimer::new(emulator.clone())),
            scheme.clone(),
            &config,
        );

        println!(
            "Registering {} with scheme {} against a registrar using {}",
            request.label(),
            scheme.name,
            registrar_scheme.name
        );
        match orchestrator.register(request, &CancelToken::never()).await {
            Ok(registered) => {
                print_states(&registered.states);
                println!("Commitment: {}", registered.commitment);
                println!("Reveal:     {}", registered.reveal_tx);
                println!("Waited:     {:?}", registered.waited);
                println!("Quoted:     {}", registered.quote.raw);
                println!("Paid:       {}", registered.paid);
                println!("✓ {} is now registered.", registered.label);
                Ok(())
            }
            Err(failure) => {
                print_states(&failure.states);
                if let Some(commitment) = failure.commitment {
                    println!("Commitment: {}", commitment);
                }
                Err(failure.into())
            }
        }
    }
}

fn print_states(states: &[RegistrationState]) {
    let states: Vec<String> = states.iter().map(ToString::to_string).collect();
    println!("States:     {}", states.join(" -> "));
}
