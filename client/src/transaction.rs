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

//! Provides [Transaction], [TransactionPayload] and the [Signer] abstraction.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

use registrar_core::abi::{self, Token};
use registrar_core::{keccak256, AccountId, Balance, TxHash};

use crate::error::Error;

/// Length of a public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Key material that authorizes transactions.
pub trait Signer: Send + Sync {
    fn public_key(&self) -> [u8; PUBLIC_KEY_LEN];

    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN];

    /// The ledger account controlled by this signer.
    fn account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.public_key())
    }
}

/// Ed25519 key pair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        KeyPair {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministically derive a key pair from a seed string like `//Alice`.
    pub fn from_seed_str(seed: &str) -> Self {
        KeyPair {
            signing_key: SigningKey::from_bytes(&keccak256(seed.as_bytes()).0),
        }
    }
}

impl Signer for KeyPair {
    fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.account_id())
    }
}

/// The signed part of a [Transaction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPayload {
    pub to: AccountId,
    pub value: Balance,
    pub data: Vec<u8>,
    /// Number of transactions the author submitted before this one.
    pub nonce: u64,
}

impl TransactionPayload {
    fn encode(&self) -> Result<Vec<u8>, Error> {
        abi::encode(&[
            Token::Address(self.to),
            Token::uint256(self.value.clone()),
            Token::Bytes(self.data.clone()),
            Token::uint256(self.nonce),
        ])
        .map_err(|error| Error::InvalidTransaction(error.to_string()))
    }
}

/// Transaction that can be submitted to the ledger.
///
/// A transaction includes
/// * the payload with recipient, attached value, call data and nonce
/// * the public key of the author
/// * a signature over the encoded payload
///
/// A transaction can be created with [Transaction::new_signed]. The nonce must be obtained from
/// the ledger with [crate::backend::Backend::account_nonce].
#[derive(Clone, Debug)]
pub struct Transaction {
    payload: TransactionPayload,
    public_key: [u8; PUBLIC_KEY_LEN],
    signature: [u8; SIGNATURE_LEN],
    encoded_payload: Vec<u8>,
}

impl Transaction {
    /// Create and sign a transaction for the given payload.
    ///
    /// Fails if the attached value does not fit into 256 bits.
    pub fn new_signed(signer: &dyn Signer, payload: TransactionPayload) -> Result<Self, Error> {
        let encoded_payload = payload.encode()?;
        let signature = signer.sign(&encoded_payload);
        Ok(Transaction {
            payload,
            public_key: signer.public_key(),
            signature,
            encoded_payload,
        })
    }

    pub fn payload(&self) -> &TransactionPayload {
        &self.payload
    }

    pub fn author(&self) -> AccountId {
        AccountId::from_public_key(&self.public_key)
    }

    pub fn hash(&self) -> TxHash {
        let mut encoded = self.encoded_payload.clone();
        encoded.extend_from_slice(&self.public_key);
        encoded.extend_from_slice(&self.signature);
        keccak256(&encoded)
    }

    /// Check that the signature was made by the author over the payload.
    pub fn verify(&self) -> bool {
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature);
        VerifyingKey::from_bytes(&self.public_key)
            .map(|key| key.verify(&self.encoded_payload, &signature).is_ok())
            .unwrap_or(false)
    }
}
