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

//! Typed registrar queries and messages.
//!
//! Every registrar function the client uses is described once here. [Query] implementations
//! are read through [crate::Registrar::query]. [Message] implementations produce the call data
//! of a transaction.

use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::ToPrimitive as _;

use registrar_core::abi::{self, AbiError, Function, ParamType, Token};
use registrar_core::{
    AccountId, Commitment, EncodingError, Label, RawPrice, RegistrationRequest, RevealShape, Secret,
    Timestamp,
};

lazy_static! {
    pub static ref AVAILABLE: Function = Function::new("available", vec![ParamType::String]);
    pub static ref COMMITMENTS: Function =
        Function::new("commitments", vec![ParamType::FixedBytes(32)]);
    pub static ref MIN_COMMITMENT_AGE: Function = Function::new("minCommitmentAge", vec![]);
    pub static ref MAX_COMMITMENT_AGE: Function = Function::new("maxCommitmentAge", vec![]);
    pub static ref RENT_PRICE: Function =
        Function::new("rentPrice", vec![ParamType::String, ParamType::Uint(256)]);
    pub static ref COMMIT: Function = Function::new("commit", vec![ParamType::FixedBytes(32)]);
    pub static ref OWNER_OF: Function = Function::new("ownerOf", vec![ParamType::Uint(256)]);
}

/// Trait implemented for every read-only registrar function.
pub trait Query: Send + Sync {
    /// Decoded return value.
    type Output: Send + 'static;

    fn call_data(&self) -> Result<Vec<u8>, AbiError>;

    /// Decode the return data of the function.
    ///
    /// Fails if the data does not have the shape the function returns.
    fn decode_output(data: &[u8]) -> Result<Self::Output, AbiError>;
}

/// Trait implemented for every state changing registrar function.
pub trait Message: Send + Sync {
    fn call_data(&self) -> Result<Vec<u8>, EncodingError>;
}

fn decode_single(param: ParamType, data: &[u8]) -> Result<Token, AbiError> {
    abi::decode(&[param], data)?
        .pop()
        .ok_or(AbiError::TooShort)
}

fn decode_u64(data: &[u8]) -> Result<u64, AbiError> {
    decode_single(ParamType::Uint(256), data)?
        .into_uint()
        .and_then(|value| value.to_u64())
        .ok_or(AbiError::InvalidValue("uint64"))
}

/// `available(string) -> bool`
#[derive(Clone, Debug)]
pub struct Available {
    pub label: Label,
}

impl Query for Available {
    type Output = bool;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        AVAILABLE.encode_call(&[Token::String(self.label.as_str().to_string())])
    }

    fn decode_output(data: &[u8]) -> Result<bool, AbiError> {
        decode_single(ParamType::Bool, data)?
            .into_bool()
            .ok_or(AbiError::InvalidValue("bool"))
    }
}

/// `commitments(bytes32) -> uint256`, the time a commitment was accepted or zero.
#[derive(Clone, Debug)]
pub struct Commitments {
    pub commitment: Commitment,
}

impl Query for Commitments {
    type Output = Timestamp;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        COMMITMENTS.encode_call(&[Token::FixedBytes(self.commitment.as_bytes().to_vec())])
    }

    fn decode_output(data: &[u8]) -> Result<Timestamp, AbiError> {
        decode_u64(data)
    }
}

/// `minCommitmentAge() -> uint256` in seconds.
#[derive(Clone, Copy, Debug)]
pub struct MinCommitmentAge;

impl Query for MinCommitmentAge {
    type Output = u64;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        MIN_COMMITMENT_AGE.encode_call(&[])
    }

    fn decode_output(data: &[u8]) -> Result<u64, AbiError> {
        decode_u64(data)
    }
}

/// `maxCommitmentAge() -> uint256` in seconds.
#[derive(Clone, Copy, Debug)]
pub struct MaxCommitmentAge;

impl Query for MaxCommitmentAge {
    type Output = u64;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        MAX_COMMITMENT_AGE.encode_call(&[])
    }

    fn decode_output(data: &[u8]) -> Result<u64, AbiError> {
        decode_u64(data)
    }
}

/// `rentPrice(string,uint256)` returning either a single amount or `(base, premium)`.
#[derive(Clone, Debug)]
pub struct RentPrice {
    pub label: Label,
    pub duration: u64,
}

impl Query for RentPrice {
    type Output = RawPrice;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        RENT_PRICE.encode_call(&[
            Token::String(self.label.as_str().to_string()),
            Token::uint256(self.duration),
        ])
    }

    fn decode_output(data: &[u8]) -> Result<RawPrice, AbiError> {
        RawPrice::decode(data)
    }
}

/// `ownerOf(uint256) -> address` where the token id is the label hash.
///
/// Reverts if the name is not registered or has expired.
#[derive(Clone, Debug)]
pub struct OwnerOf {
    pub label: Label,
}

/// Token id of `label` in the registrar.
pub fn token_id(label: &Label) -> BigUint {
    BigUint::from_bytes_be(label.hash().as_bytes())
}

impl Query for OwnerOf {
    type Output = AccountId;

    fn call_data(&self) -> Result<Vec<u8>, AbiError> {
        OWNER_OF.encode_call(&[Token::uint256(token_id(&self.label))])
    }

    fn decode_output(data: &[u8]) -> Result<AccountId, AbiError> {
        decode_single(ParamType::Address, data)?
            .into_address()
            .ok_or(AbiError::InvalidValue("address"))
    }
}

/// `commit(bytes32)`
#[derive(Clone, Debug)]
pub struct Commit {
    pub commitment: Commitment,
}

impl Message for Commit {
    fn call_data(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(COMMIT.encode_call(&[Token::FixedBytes(self.commitment.as_bytes().to_vec())])?)
    }
}

/// The reveal call in the shape the registration scheme prescribes.
pub struct Reveal<'a> {
    pub shape: &'a RevealShape,
    pub request: &'a RegistrationRequest,
    pub secret: &'a Secret,
}

impl Message for Reveal<'_> {
    fn call_data(&self) -> Result<Vec<u8>, EncodingError> {
        self.shape.encode_call(self.request, self.secret)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selectors() {
        assert_eq!(hex::encode(COMMIT.selector()), "f14fcbc8");
        assert_eq!(hex::encode(AVAILABLE.selector()), "aeb8ce9b");
        assert_eq!(hex::encode(COMMITMENTS.selector()), "839df945");
        assert_eq!(hex::encode(MIN_COMMITMENT_AGE.selector()), "8d839ffe");
        assert_eq!(hex::encode(RENT_PRICE.selector()), "83e7f6ff");
        assert_eq!(hex::encode(OWNER_OF.selector()), "6352211e");
    }

    #[test]
    fn commitments_output_must_fit() {
        let data = abi::encode(&[Token::uint256(1000u32)]).unwrap();
        assert_eq!(Commitments::decode_output(&data), Ok(1000));
        assert!(Commitments::decode_output(&[0xff; 32]).is_err());
        assert!(Commitments::decode_output(&[]).is_err());
    }

    #[test]
    fn owner_of_takes_the_label_hash() {
        let label: Label = "example".parse().unwrap();
        let data = OwnerOf {
            label: label.clone(),
        }
        .call_data()
        .unwrap();
        assert_eq!(&data[4..], label.hash().as_bytes());

        let output = abi::encode(&[Token::Address(AccountId([7; 20]))]).unwrap();
        assert_eq!(OwnerOf::decode_output(&output), Ok(AccountId([7; 20])));
    }

    #[test]
    fn reveal_uses_the_scheme_shape() {
        let scheme = registrar_core::RegistrationScheme::preset(registrar_core::scheme::ENS_LEGACY)
            .unwrap();
        let request = RegistrationRequest::new("example", 31_536_000, AccountId([1; 20])).unwrap();
        let secret = Secret::generate();
        let data = Reveal {
            shape: &scheme.reveal,
            request: &request,
            secret: &secret,
        }
        .call_data()
        .unwrap();
        assert_eq!(
            data[..4],
            abi::selector("register(string,address,uint256,bytes32)")
        );
    }
}
