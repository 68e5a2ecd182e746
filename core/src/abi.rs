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

//! The subset of the Solidity contract ABI needed to talk to a registrar.
//!
//! Supports the standard encoding (`abi.encode`), the packed encoding (`abi.encodePacked`),
//! decoding of call and return data, and function selectors. Tuples and fixed size arrays are not
//! supported since no registrar function uses them.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use zeroize::{Zeroize, Zeroizing};

use crate::hash::{keccak256, AccountId};

const WORD: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("value {value} does not fit into uint{bits}")]
    UintOverflow { bits: usize, value: BigUint },

    #[error("{0} cannot be packed")]
    Unpackable(&'static str),

    #[error("expected a token of type {expected}")]
    TypeMismatch { expected: String },

    #[error("expected {expected} arguments but got {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("input data is too short")]
    TooShort,

    #[error("invalid offset or length in input data")]
    InvalidOffset,

    #[error("invalid {0} value in input data")]
    InvalidValue(&'static str),

    #[error("call data does not start with the selector of {0}")]
    SelectorMismatch(String),

    #[error("invalid type signature `{0}`")]
    InvalidSignature(String),
}

/// Type of a function parameter or return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    /// Unsigned integer with the given number of bits.
    Uint(usize),
    /// `bytes1` to `bytes32`.
    FixedBytes(usize),
    String,
    Bytes,
    /// Dynamically sized array `T[]`.
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Bytes | ParamType::Array(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => write!(f, "string"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

impl FromStr for ParamType {
    type Err = AbiError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || AbiError::InvalidSignature(input.to_string());
        let input = input.trim();
        if let Some(inner) = input.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(inner.parse()?)));
        }
        match input {
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            _ => {
                if let Some(bits) = input.strip_prefix("uint") {
                    let bits: usize = bits.parse().map_err(|_| invalid())?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(invalid());
                    }
                    Ok(ParamType::Uint(bits))
                } else if let Some(size) = input.strip_prefix("bytes") {
                    let size: usize = size.parse().map_err(|_| invalid())?;
                    if size == 0 || size > WORD {
                        return Err(invalid());
                    }
                    Ok(ParamType::FixedBytes(size))
                } else {
                    Err(invalid())
                }
            }
        }
    }
}

/// A value that can be ABI encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(AccountId),
    Bool(bool),
    /// Unsigned integer of the given bit width.
    Uint(usize, BigUint),
    FixedBytes(Vec<u8>),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Token>),
}

impl Token {
    pub fn uint256(value: impl Into<BigUint>) -> Self {
        Token::Uint(256, value.into())
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Bytes(_) | Token::Array(_) => true,
            _ => false,
        }
    }

    /// Returns true if the token is a valid value of `param`.
    pub fn matches(&self, param: &ParamType) -> bool {
        match (self, param) {
            (Token::Address(_), ParamType::Address) => true,
            (Token::Bool(_), ParamType::Bool) => true,
            (Token::Uint(bits, _), ParamType::Uint(expected)) => bits == expected,
            (Token::FixedBytes(bytes), ParamType::FixedBytes(size)) => bytes.len() == *size,
            (Token::String(_), ParamType::String) => true,
            (Token::Bytes(_), ParamType::Bytes) => true,
            (Token::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            _ => false,
        }
    }

    pub fn into_address(self) -> Option<AccountId> {
        match self {
            Token::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<BigUint> {
        match self {
            Token::Uint(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn into_fixed_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::FixedBytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Wipes byte and string contents. Numbers, addresses and booleans are left as they are.
impl Zeroize for Token {
    fn zeroize(&mut self) {
        match self {
            Token::FixedBytes(bytes) | Token::Bytes(bytes) => bytes.zeroize(),
            Token::String(value) => value.zeroize(),
            Token::Array(items) => items.zeroize(),
            Token::Address(_) | Token::Bool(_) | Token::Uint(_, _) => {}
        }
    }
}

/// Standard ABI encoding of `tokens` as if they were the members of a tuple.
pub fn encode(tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_tail(token)?);
        } else {
            head.extend_from_slice(&encode_static(token)?);
        }
    }
    head.extend(tail);
    Ok(head)
}

/// Non-standard packed encoding as produced by `abi.encodePacked`.
///
/// Arrays are packed with every element padded to 32 bytes. Arrays of dynamic elements are
/// rejected.
pub fn encode_packed(tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    let mut output = Vec::new();
    for token in tokens {
        match token {
            Token::Address(address) => output.extend_from_slice(address.as_bytes()),
            Token::Bool(value) => output.push(*value as u8),
            Token::Uint(bits, value) => {
                let word = uint_word(*bits, value)?;
                output.extend_from_slice(&word[WORD - bits / 8..]);
            }
            Token::FixedBytes(bytes) | Token::Bytes(bytes) => output.extend_from_slice(bytes),
            Token::String(value) => output.extend_from_slice(value.as_bytes()),
            Token::Array(items) => {
                for item in items {
                    if item.is_dynamic() {
                        return Err(AbiError::Unpackable("array of dynamic values"));
                    }
                    output.extend_from_slice(&encode_static(item)?);
                }
            }
        }
    }
    Ok(output)
}

/// Decode `data` as a tuple with members of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    for (index, param) in types.iter().enumerate() {
        let head = word_at(data, index * WORD)?;
        let token = if param.is_dynamic() {
            let offset = word_to_usize(head)?;
            decode_dynamic(param, data, offset)?
        } else {
            decode_static(param, head)?
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn encode_static(token: &Token) -> Result<[u8; WORD], AbiError> {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(address) => word[WORD - AccountId::LEN..].copy_from_slice(address.as_bytes()),
        Token::Bool(value) => word[WORD - 1] = *value as u8,
        Token::Uint(bits, value) => word = uint_word(*bits, value)?,
        Token::FixedBytes(bytes) => {
            if bytes.len() > WORD {
                return Err(AbiError::TypeMismatch {
                    expected: "bytes32".to_string(),
                });
            }
            word[..bytes.len()].copy_from_slice(bytes);
        }
        Token::String(_) | Token::Bytes(_) | Token::Array(_) => {
            return Err(AbiError::TypeMismatch {
                expected: "static type".to_string(),
            })
        }
    }
    Ok(word)
}

fn encode_tail(token: &Token) -> Result<Vec<u8>, AbiError> {
    match token {
        Token::String(value) => Ok(encode_bytes(value.as_bytes())),
        Token::Bytes(bytes) => Ok(encode_bytes(bytes)),
        Token::Array(items) => {
            let mut output = usize_word(items.len()).to_vec();
            output.extend(encode(items)?);
            Ok(output)
        }
        _ => encode_static(token).map(|word| word.to_vec()),
    }
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut output = usize_word(bytes.len()).to_vec();
    output.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    output.extend(std::iter::repeat(0u8).take(padding));
    output
}

fn uint_word(bits: usize, value: &BigUint) -> Result<[u8; WORD], AbiError> {
    if bits == 0 || bits > 256 || bits % 8 != 0 || value.bits() as usize > bits {
        return Err(AbiError::UintOverflow {
            bits,
            value: value.clone(),
        });
    }
    let bytes = value.to_bytes_be();
    let mut word = [0u8; WORD];
    // `to_bytes_be` of zero is `[0]`, which still fits.
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::InvalidOffset)?;
    data.get(offset..end).ok_or(AbiError::TooShort)
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    BigUint::from_bytes_be(word)
        .to_usize()
        .ok_or(AbiError::InvalidOffset)
}

fn decode_static(param: &ParamType, word: &[u8]) -> Result<Token, AbiError> {
    match param {
        ParamType::Address => {
            if word[..WORD - AccountId::LEN].iter().any(|byte| *byte != 0) {
                return Err(AbiError::InvalidValue("address"));
            }
            let address = AccountId::from_slice(&word[WORD - AccountId::LEN..])
                .map_err(|_| AbiError::InvalidValue("address"))?;
            Ok(Token::Address(address))
        }
        ParamType::Bool => {
            if word[..WORD - 1].iter().any(|byte| *byte != 0) || word[WORD - 1] > 1 {
                return Err(AbiError::InvalidValue("bool"));
            }
            Ok(Token::Bool(word[WORD - 1] == 1))
        }
        ParamType::Uint(bits) => {
            let value = BigUint::from_bytes_be(word);
            if value.bits() as usize > *bits {
                return Err(AbiError::InvalidValue("uint"));
            }
            Ok(Token::Uint(*bits, value))
        }
        ParamType::FixedBytes(size) => Ok(Token::FixedBytes(word[..*size].to_vec())),
        ParamType::String | ParamType::Bytes | ParamType::Array(_) => {
            Err(AbiError::InvalidValue("static type"))
        }
    }
}

fn decode_dynamic(param: &ParamType, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    let length = word_to_usize(word_at(data, offset)?)?;
    let start = offset + WORD;
    match param {
        ParamType::String | ParamType::Bytes => {
            let end = start.checked_add(length).ok_or(AbiError::InvalidOffset)?;
            let bytes = data.get(start..end).ok_or(AbiError::TooShort)?.to_vec();
            if *param == ParamType::String {
                let value = String::from_utf8(bytes).map_err(|_| AbiError::InvalidValue("string"))?;
                Ok(Token::String(value))
            } else {
                Ok(Token::Bytes(bytes))
            }
        }
        ParamType::Array(inner) => {
            let items = data.get(start..).ok_or(AbiError::TooShort)?;
            // Every element occupies at least one head word.
            if length > items.len() / WORD {
                return Err(AbiError::TooShort);
            }
            let types = vec![(**inner).clone(); length];
            Ok(Token::Array(decode(&types, items)?))
        }
        _ => decode_static(param, word_at(data, offset)?),
    }
}

/// First four bytes of the keccak-256 digest of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest.0[..4]);
    selector
}

/// A contract function identified by its name and input types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<ParamType>,
}

impl Function {
    pub fn new(name: impl Into<String>, inputs: Vec<ParamType>) -> Self {
        Function {
            name: name.into(),
            inputs,
        }
    }

    /// Parse a canonical signature like `commit(bytes32)`.
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let invalid = || AbiError::InvalidSignature(signature.to_string());
        let open = signature.find('(').ok_or_else(invalid)?;
        let inner = signature[open + 1..]
            .strip_suffix(')')
            .ok_or_else(invalid)?;
        let name = signature[..open].trim();
        if name.is_empty() {
            return Err(invalid());
        }
        let inputs = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(str::parse)
                .collect::<Result<Vec<ParamType>, AbiError>>()?
        };
        Ok(Function::new(name, inputs))
    }

    pub fn signature(&self) -> String {
        let inputs = self
            .inputs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>();
        format!("{}({})", self.name, inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    /// Call data for invoking the function with `args`.
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount {
                expected: self.inputs.len(),
                found: args.len(),
            });
        }
        if let Some(param) = self
            .inputs
            .iter()
            .zip(args)
            .find_map(|(param, arg)| if arg.matches(param) { None } else { Some(param) })
        {
            return Err(AbiError::TypeMismatch {
                expected: param.to_string(),
            });
        }
        let mut data = self.selector().to_vec();
        data.extend_from_slice(&Zeroizing::new(encode(args)?));
        Ok(data)
    }

    /// Decode the arguments from call data produced by [Function::encode_call].
    pub fn decode_call(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        if data.len() < 4 || data[..4] != self.selector() {
            return Err(AbiError::SelectorMismatch(self.signature()));
        }
        decode(&self.inputs, &data[4..])
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn word(value: u64) -> String {
        format!("{:064x}", value)
    }

    #[test]
    fn static_call_encoding() {
        let function = Function::parse("baz(uint32,bool)").unwrap();
        let data = function
            .encode_call(&[Token::Uint(32, 69u32.into()), Token::Bool(true)])
            .unwrap();
        assert_eq!(
            hex::encode(data),
            format!("cdcd77c0{}{}", word(69), word(1))
        );
    }

    #[test]
    fn dynamic_call_encoding() {
        let function = Function::parse("sam(bytes,bool,uint256[])").unwrap();
        let args = [
            Token::Bytes(b"dave".to_vec()),
            Token::Bool(true),
            Token::Array(vec![
                Token::uint256(1u32),
                Token::uint256(2u32),
                Token::uint256(3u32),
            ]),
        ];
        let data = function.encode_call(&args).unwrap();
        let expected = format!(
            "a5643bf2{}{}{}{}{}{}{}{}{}",
            word(0x60),
            word(1),
            word(0xa0),
            word(4),
            format!("{:0<64}", "64617665"),
            word(3),
            word(1),
            word(2),
            word(3),
        );
        assert_eq!(hex::encode(&data), expected);
        assert_eq!(function.decode_call(&data).unwrap(), args.to_vec());
    }

    #[test]
    fn nested_dynamic_array() {
        let types = [ParamType::Array(Box::new(ParamType::Bytes)), ParamType::Bool];
        let tokens = vec![
            Token::Array(vec![Token::Bytes(vec![1, 2, 3]), Token::Bytes(vec![0xff; 40])]),
            Token::Bool(false),
        ];
        let encoded = encode(&tokens).unwrap();
        assert_eq!(decode(&types, &encoded).unwrap(), tokens);
    }

    #[test]
    fn packed_encoding() {
        let packed = encode_packed(&[
            Token::FixedBytes(vec![0x42]),
            Token::Uint(16, 3u32.into()),
            Token::String("Hello, world!".to_string()),
        ])
        .unwrap();
        assert_eq!(
            hex::encode(packed),
            "42000348656c6c6f2c20776f726c6421"
        );
    }

    #[test]
    fn packed_rejects_nested_dynamic_arrays() {
        let result = encode_packed(&[Token::Array(vec![Token::Bytes(vec![1])])]);
        assert!(result.is_err());
    }

    #[test]
    fn uint_overflow() {
        let result = encode(&[Token::Uint(16, 70_000u32.into())]);
        assert!(matches!(result, Err(AbiError::UintOverflow { bits: 16, .. })));
    }

    #[test]
    fn argument_type_mismatch() {
        let function = Function::parse("commit(bytes32)").unwrap();
        assert!(function.encode_call(&[Token::Bool(true)]).is_err());
        assert!(function.encode_call(&[]).is_err());
    }

    #[test]
    fn param_type_round_trip_through_display() {
        for signature in &["address", "bool", "uint16", "bytes32", "string", "bytes", "bytes[]"] {
            let param: ParamType = signature.parse().unwrap();
            assert_eq!(param.to_string(), *signature);
        }
        assert!("uint7".parse::<ParamType>().is_err());
        assert!("bytes33".parse::<ParamType>().is_err());
        assert!("tuple".parse::<ParamType>().is_err());
    }

    #[test]
    fn decode_rejects_truncated_data() {
        let types = [ParamType::String];
        let mut encoded = encode(&[Token::String("example".to_string())]).unwrap();
        encoded.truncate(70);
        assert_eq!(decode(&types, &encoded), Err(AbiError::TooShort));
    }

    #[test]
    fn zeroized_tokens_hold_no_bytes() {
        let mut secret = Token::FixedBytes(vec![0xab; 32]);
        secret.zeroize();
        assert_eq!(secret, Token::FixedBytes(vec![]));

        let mut nested = Token::Array(vec![
            Token::Bytes(vec![1, 2, 3]),
            Token::String("label".to_string()),
        ]);
        nested.zeroize();
        assert_eq!(nested, Token::Array(vec![]));

        let mut flag = Token::Bool(true);
        flag.zeroize();
        assert_eq!(flag, Token::Bool(true));
    }
}
