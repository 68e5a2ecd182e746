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

use crate::{CommandError, CommandT, RequestOptions, SchemeOptions};
use registrar_client::*;

use structopt::StructOpt;

pub mod dry_run;
pub mod presets;
pub mod show_commitment;

fn print_scheme(scheme: &RegistrationScheme) {
    let fields: Vec<String> = scheme
        .commitment
        .fields
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("{}", scheme.name);
    println!("  commitment: {:?}({})", scheme.commitment.encoding, fields.join(", "));
    println!("  reveal:     {}", scheme.reveal.function().signature());
}
