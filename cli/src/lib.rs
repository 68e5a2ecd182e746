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

//! Command line interface for computing commitments and rehearsing registrations.

use std::path::{Path, PathBuf};

use registrar_client::abi::AbiError;
use registrar_client::*;
use structopt::StructOpt;
use thiserror::Error as ThisError;

mod command;
use command::{dry_run, presets, show_commitment};

#[derive(StructOpt, Clone)]
#[structopt(max_term_width = 80)]
pub struct CommandLine {
    #[structopt(subcommand)]
    pub command: Command,
}

impl CommandLine {
    pub async fn run(self) -> Result<(), CommandError> {
        self.command.run().await
    }
}

#[derive(StructOpt, Clone)]
pub enum Command {
    /// List the built-in registration schemes.
    Presets(presets::Presets),
    /// Compute the commitment of a registration without contacting a ledger.
    Commitment(show_commitment::ShowCommitment),
    /// Run a complete registration against an emulated registrar.
    DryRun(dry_run::DryRun),
}

#[async_trait::async_trait]
impl CommandT for Command {
    async fn run(&self) -> Result<(), CommandError> {
        match self {
            Command::Presets(cmd) => cmd.run().await,
            Command::Commitment(cmd) => cmd.run().await,
            Command::DryRun(cmd) => cmd.run().await,
        }
    }
}

#[async_trait::async_trait]
pub trait CommandT {
    async fn run(&self) -> Result<(), CommandError>;
}

/// Selects the registration scheme used to build commitments and reveals.
#[derive(StructOpt, Clone, Debug)]
pub struct SchemeOptions {
    /// Name of a built-in scheme. See the `presets` command.
    #[structopt(long, default_value = "ens-v3", env = "REGISTRAR_PRESET")]
    pub preset: String,

    /// JSON file with a custom scheme. Takes precedence over --preset.
    #[structopt(long, env = "REGISTRAR_SCHEME_FILE", parse(from_os_str))]
    pub scheme_file: Option<PathBuf>,
}

impl SchemeOptions {
    pub fn scheme(&self) -> Result<RegistrationScheme, CommandError> {
        match &self.scheme_file {
            Some(path) => load_scheme(path),
            None => lookup_preset(&self.preset),
        }
    }
}

/// The registration parameters that go into a commitment.
#[derive(StructOpt, Clone, Debug)]
pub struct RequestOptions {
    /// The label to register, without the top level domain.
    pub label: String,

    /// Account that will own the name. Defaults to the signing account.
    #[structopt(long, env = "REGISTRAR_OWNER")]
    pub owner: Option<AccountId>,

    /// Registration period in seconds.
    #[structopt(long, default_value = "31536000", env = "REGISTRAR_DURATION")]
    pub duration: u64,

    /// Resolver contract to set for the name.
    #[structopt(long)]
    pub resolver: Option<AccountId>,

    /// Point the name at this address through a `setAddr` resolver instruction.
    #[structopt(long, value_name = "address")]
    pub set_addr: Option<AccountId>,

    /// Top level domain the registrar manages.
    #[structopt(long, default_value = "eth", env = "REGISTRAR_TLD")]
    pub tld: String,
}

impl RequestOptions {
    pub fn request(&self, default_owner: AccountId) -> Result<RegistrationRequest, CommandError> {
        let owner = self.owner.unwrap_or(default_owner);
        let mut request = RegistrationRequest::new(&self.label, self.duration, owner)?;
        if let Some(resolver) = self.resolver {
            request = request.resolver(resolver);
        }
        if let Some(address) = self.set_addr {
            let name = request.label().full_name(&self.tld);
            request = request.instruction(resolver::set_addr_instruction(&name, address)?);
        }
        Ok(request)
    }
}

pub fn lookup_preset(name: &str) -> Result<RegistrationScheme, CommandError> {
    RegistrationScheme::preset(name).ok_or_else(|| CommandError::UnknownPreset {
        name: name.to_string(),
    })
}

fn load_scheme(path: &Path) -> Result<RegistrationScheme, CommandError> {
    log::debug!("Loading scheme from {}", path.display());
    let file = std::fs::File::open(path).map_err(|error| CommandError::SchemeFile {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(serde_json::from_reader(file)?)
}

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("an owner is required to compute a commitment offline")]
    MissingOwner,

    #[error("unknown scheme preset {name}")]
    UnknownPreset { name: String },

    #[error("cannot read scheme file {}", path.display())]
    SchemeFile {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid scheme JSON")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Registration(#[from] RegistrationFailure),
}

#[cfg(test)]
mod test {
    use super::*;

    const OWNER: &str = "0x1111111111111111111111111111111111111111";

    fn request_options(args: &[&str]) -> RequestOptions {
        let secret = "ab".repeat(32);
        let mut argv = vec!["registrar", "commitment"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["--secret", &secret]);
        match CommandLine::from_iter_safe(argv).unwrap().command {
            Command::Commitment(cmd) => cmd.request_options,
            _ => panic!("Parsed the wrong command"),
        }
    }

    #[test]
    fn request_defaults_to_one_year_without_resolver() {
        let options = request_options(&["example", "--owner", OWNER]);
        let request = options.request(AccountId::zero()).unwrap();
        assert_eq!(request.duration(), 31_536_000);
        assert_eq!(request.owner(), OWNER.parse::<AccountId>().unwrap());
        assert_eq!(request.resolver_address(), None);
        assert!(request.data().is_empty());
    }

    #[test]
    fn set_addr_becomes_a_resolver_instruction() {
        let options = request_options(&[
            "example",
            "--owner",
            OWNER,
            "--resolver",
            OWNER,
            "--set-addr",
            OWNER,
        ]);
        let request = options.request(AccountId::zero()).unwrap();
        let expected =
            resolver::set_addr_instruction("example.eth", OWNER.parse().unwrap()).unwrap();
        assert_eq!(request.data(), &[expected][..]);
    }

    #[test]
    fn invalid_label_is_an_encoding_error() {
        let options = request_options(&["ex", "--owner", OWNER]);
        assert!(matches!(
            options.request(AccountId::zero()),
            Err(CommandError::Encoding(_))
        ));
    }

    #[test]
    fn scheme_file_takes_precedence() {
        let path = std::env::temp_dir().join("registrar-cli-scheme-test.json");
        let custom = RegistrationScheme {
            name: "custom".to_string(),
            ..RegistrationScheme::packed_minimal()
        };
        std::fs::write(&path, serde_json::to_vec(&custom).unwrap()).unwrap();

        let options = SchemeOptions {
            preset: "ens-v3".to_string(),
            scheme_file: Some(path.clone()),
        };
        assert_eq!(options.scheme().unwrap(), custom);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn unknown_preset() {
        assert!(matches!(
            lookup_preset("nope"),
            Err(CommandError::UnknownPreset { .. })
        ));
    }
}
