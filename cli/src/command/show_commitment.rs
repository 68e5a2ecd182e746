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
pub struct ShowCommitment {
    #[structopt(flatten)]
    pub(crate) request_options: RequestOptions,

    /// The 32 byte secret as hex.
    #[structopt(long)]
    secret: H256,

    #[structopt(flatten)]
    scheme_options: SchemeOptions,
}

#[async_trait::async_trait]
impl CommandT for ShowCommitment {
    async fn run(&self) -> Result<(), CommandError> {
        let owner = self
            .request_options
            .owner
            .ok_or(CommandError::MissingOwner)?;
        let request = self.request_options.request(owner)?;
        let secret = Secret::from_bytes(self.secret.as_bytes())?;
        let scheme = self.scheme_options.scheme()?;

        let commitment = commitment::build(&request, &secret, &scheme.commitment)?;
        println!("Scheme:     {}", scheme.name);
        println!("Label hash: {}", request.label().hash());
        println!("Commitment: {}", commitment);
        Ok(())
    }
}
