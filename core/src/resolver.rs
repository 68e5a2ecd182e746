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

//! Name hashing and resolver instructions.

use crate::abi::{AbiError, Function, ParamType, Token};
use crate::hash::{keccak256, AccountId, H256};

/// Recursive name hash of a dotted name. The empty name hashes to zero.
pub fn namehash(name: &str) -> H256 {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return H256(node);
    }
    for label in name.rsplit('.') {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(&node);
        preimage[32..].copy_from_slice(keccak256(label.as_bytes()).as_bytes());
        node = keccak256(&preimage).0;
    }
    H256(node)
}

/// Call data for `setAddr(bytes32 node, address a)` on the resolver of `name`.
///
/// Registrars forward these instructions to the resolver when the name is registered.
pub fn set_addr_instruction(name: &str, address: AccountId) -> Result<Vec<u8>, AbiError> {
    let function = Function::new("setAddr", vec![ParamType::FixedBytes(32), ParamType::Address]);
    function.encode_call(&[
        Token::FixedBytes(namehash(name).as_bytes().to_vec()),
        Token::Address(address),
    ])
}
