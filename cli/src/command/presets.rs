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

use super::*;

#[derive(StructOpt, Debug, Clone)]
pub struct Presets {
    /// Print the schemes as JSON, usable with --scheme-file.
    #[structopt(long)]
    json: bool,
}

#[async_trait::async_trait]
impl CommandT for Presets {
    async fn run(&self) -> Result<(), CommandError> {
        let presets = scheme::presets();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&presets)?);
            return Ok(());
        }
        for scheme in &presets {
            print_scheme(scheme);
        }
        Ok(())
    }
}
