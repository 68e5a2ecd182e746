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

//! Registration schemes bundle a commitment layout with the shape of the matching reveal call.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::abi::{AbiError, Function, Token};
use crate::commitment::{CommitmentScheme, Encoding, RequestField};
use crate::error::EncodingError;
use crate::hash::AccountId;
use crate::request::RegistrationRequest;
use crate::secret::Secret;

pub const ENS_V3: &str = "ens-v3";
pub const PACKED_MINIMAL: &str = "packed-minimal";
pub const ENS_LEGACY: &str = "ens-legacy";

/// Name and argument list of the reveal function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealShape {
    pub function: String,
    pub args: Vec<RequestField>,
}

impl RevealShape {
    pub fn function(&self) -> Function {
        Function::new(
            self.function.clone(),
            self.args.iter().map(|field| field.param_type()).collect(),
        )
    }

    /// Call data of the reveal for `request` and `secret`.
    ///
    /// The call data contains the secret. Intermediate copies are wiped, the returned data is
    /// the caller's to wipe.
    pub fn encode_call(
        &self,
        request: &RegistrationRequest,
        secret: &Secret,
    ) -> Result<Vec<u8>, EncodingError> {
        let args = Zeroizing::new(
            self.args
                .iter()
                .map(|field| field.token(request, secret))
                .collect::<Vec<Token>>(),
        );
        Ok(self.function().encode_call(&args)?)
    }

    /// Recover the request and secret from reveal call data.
    ///
    /// The label is taken verbatim and must already be normalized. Fields the shape does not
    /// carry get their defaults, except for the label, owner, duration and secret which are
    /// required.
    pub fn decode_call(&self, data: &[u8]) -> Result<(RegistrationRequest, Secret), EncodingError> {
        let tokens = self.function().decode_call(data)?;

        let mut label = None;
        let mut owner = None;
        let mut duration = None;
        let mut secret = None;
        let mut resolver: Option<AccountId> = None;
        let mut instructions = Vec::new();
        let mut reverse_record = false;
        let mut fuses = 0u16;

        for (field, token) in self.args.iter().zip(tokens) {
            match field {
                RequestField::Label => label = token.into_string(),
                // A hash cannot be inverted. The label must be revealed separately.
                RequestField::LabelHash => {}
                RequestField::Owner => owner = token.into_address(),
                RequestField::Duration => {
                    let value = token.into_uint().ok_or(AbiError::InvalidValue("uint"))?;
                    duration = Some(value.to_u64().ok_or(AbiError::InvalidValue("duration"))?);
                }
                RequestField::Secret => secret = token.into_fixed_bytes(),
                RequestField::Resolver => {
                    resolver = token.into_address().filter(|address| !address.is_zero())
                }
                RequestField::Data => {
                    instructions = token
                        .into_array()
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(Token::into_bytes)
                        .collect()
                }
                RequestField::ReverseRecord => reverse_record = token.into_bool().unwrap_or(false),
                RequestField::Fuses => {
                    let value = token.into_uint().ok_or(AbiError::InvalidValue("uint"))?;
                    fuses = value.to_u16().ok_or(AbiError::InvalidValue("fuses"))?;
                }
            }
        }

        let label = label.ok_or(EncodingError::MissingField(RequestField::Label))?;
        let owner = owner.ok_or(EncodingError::MissingField(RequestField::Owner))?;
        let duration = duration.ok_or(EncodingError::MissingField(RequestField::Duration))?;
        let secret = secret.ok_or(EncodingError::MissingField(RequestField::Secret))?;

        let mut request = RegistrationRequest::for_label(label.parse()?, duration, owner)?
            .reverse_record(reverse_record)
            .fuses(fuses);
        if let Some(resolver) = resolver {
            request = request.resolver(resolver);
        }
        for instruction in instructions {
            request = request.instruction(instruction);
        }
        Ok((request, Secret::from_bytes(&secret)?))
    }
}

/// A commitment layout together with the reveal that a registrar deployment expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationScheme {
    pub name: String,
    pub commitment: CommitmentScheme,
    pub reveal: RevealShape,
}

impl RegistrationScheme {
    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        presets().into_iter().find(|scheme| scheme.name == name)
    }

    /// Full field set in ABI encoding, as used by current ENS registrar controllers.
    pub fn ens_v3() -> Self {
        RegistrationScheme {
            name: ENS_V3.to_string(),
            commitment: CommitmentScheme {
                encoding: Encoding::Abi,
                fields: vec![
                    RequestField::LabelHash,
                    RequestField::Owner,
                    RequestField::Duration,
                    RequestField::Secret,
                    RequestField::Resolver,
                    RequestField::Data,
                    RequestField::ReverseRecord,
                    RequestField::Fuses,
                ],
            },
            reveal: full_reveal(),
        }
    }

    /// Packed label, owner and secret with the full reveal.
    pub fn packed_minimal() -> Self {
        RegistrationScheme {
            name: PACKED_MINIMAL.to_string(),
            commitment: CommitmentScheme {
                encoding: Encoding::Packed,
                fields: vec![RequestField::Label, RequestField::Owner, RequestField::Secret],
            },
            reveal: full_reveal(),
        }
    }

    /// Packed label hash, owner and secret with a four argument reveal.
    pub fn ens_legacy() -> Self {
        RegistrationScheme {
            name: ENS_LEGACY.to_string(),
            commitment: CommitmentScheme {
                encoding: Encoding::Packed,
                fields: vec![
                    RequestField::LabelHash,
                    RequestField::Owner,
                    RequestField::Secret,
                ],
            },
            reveal: RevealShape {
                function: "register".to_string(),
                args: vec![
                    RequestField::Label,
                    RequestField::Owner,
                    RequestField::Duration,
                    RequestField::Secret,
                ],
            },
        }
    }
}

fn full_reveal() -> RevealShape {
    RevealShape {
        function: "register".to_string(),
        args: vec![
            RequestField::Label,
            RequestField::Owner,
            RequestField::Duration,
            RequestField::Secret,
            RequestField::Resolver,
            RequestField::Data,
            RequestField::ReverseRecord,
            RequestField::Fuses,
        ],
    }
}

/// All built-in schemes.
pub fn presets() -> Vec<RegistrationScheme> {
    vec![
        RegistrationScheme::ens_v3(),
        RegistrationScheme::packed_minimal(),
        RegistrationScheme::ens_legacy(),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commitment;

    fn request() -> RegistrationRequest {
        RegistrationRequest::new("example", 31_536_000, AccountId([1u8; 20]))
            .unwrap()
            .resolver(AccountId([2u8; 20]))
            .instruction(vec![1, 2, 3])
            .fuses(4)
    }

    #[test]
    fn preset_lookup() {
        assert!(RegistrationScheme::preset(ENS_V3).is_some());
        assert!(RegistrationScheme::preset(PACKED_MINIMAL).is_some());
        assert!(RegistrationScheme::preset(ENS_LEGACY).is_some());
        assert!(RegistrationScheme::preset("ens-v4").is_none());
    }

    #[test]
    fn ens_v3_reveal_signature() {
        let scheme = RegistrationScheme::preset(ENS_V3).unwrap();
        assert_eq!(
            scheme.reveal.function().signature(),
            "register(string,address,uint256,bytes32,address,bytes[],bool,uint16)"
        );
    }

    #[test]
    fn reveal_decodes_to_the_committed_request() {
        let scheme = RegistrationScheme::preset(ENS_V3).unwrap();
        let secret = Secret::from_bytes(&[9u8; 32]).unwrap();
        let data = scheme.reveal.encode_call(&request(), &secret).unwrap();

        let (revealed, revealed_secret) = scheme.reveal.decode_call(&data).unwrap();
        assert_eq!(revealed, request());
        assert_eq!(
            commitment::build(&revealed, &revealed_secret, &scheme.commitment).unwrap(),
            commitment::build(&request(), &secret, &scheme.commitment).unwrap()
        );
    }

    #[test]
    fn legacy_reveal_drops_optional_fields() {
        let scheme = RegistrationScheme::preset(ENS_LEGACY).unwrap();
        let secret = Secret::from_bytes(&[9u8; 32]).unwrap();
        let data = scheme.reveal.encode_call(&request(), &secret).unwrap();

        let (revealed, _) = scheme.reveal.decode_call(&data).unwrap();
        assert_eq!(revealed.label(), request().label());
        assert_eq!(revealed.resolver_address(), None);
        assert!(revealed.data().is_empty());
    }

    #[test]
    fn reveal_without_label_is_rejected() {
        let shape = RevealShape {
            function: "register".to_string(),
            args: vec![RequestField::Owner, RequestField::Secret],
        };
        let secret = Secret::from_bytes(&[9u8; 32]).unwrap();
        let data = shape.encode_call(&request(), &secret).unwrap();
        assert_eq!(
            shape.decode_call(&data).err(),
            Some(EncodingError::MissingField(RequestField::Label))
        );
    }

    #[test]
    fn scheme_serializes_to_json() {
        let scheme = RegistrationScheme::preset(PACKED_MINIMAL).unwrap();
        let json = serde_json::to_string(&scheme).unwrap();
        let parsed: RegistrationScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scheme);
    }
}
