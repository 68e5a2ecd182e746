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

//! Provides [RegistrationRequest], the caller input of a registration.

use std::convert::TryFrom;

use crate::error::EncodingError;
use crate::hash::AccountId;
use crate::label::{Label, Normalizer};

/// What to register and for whom.
///
/// Built with [RegistrationRequest::new] and refined with the consuming builder methods. Once
/// handed to the orchestrator a request is never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
    label: Label,
    duration: u64,
    owner: AccountId,
    resolver: Option<AccountId>,
    data: Vec<Vec<u8>>,
    reverse_record: bool,
    fuses: u16,
}

impl RegistrationRequest {
    /// Create a request for a label that is normalized with
    /// [BasicNormalizer](crate::label::BasicNormalizer).
    ///
    /// Fails if the label is invalid or the duration is zero.
    pub fn new(label: &str, duration: u64, owner: AccountId) -> Result<Self, EncodingError> {
        let label = Label::try_from(label)?;
        Self::for_label(label, duration, owner)
    }

    /// Same as [RegistrationRequest::new] but with a custom [Normalizer].
    pub fn with_normalizer(
        normalizer: &dyn Normalizer,
        label: &str,
        duration: u64,
        owner: AccountId,
    ) -> Result<Self, EncodingError> {
        let label = normalizer.normalize(label)?;
        Self::for_label(label, duration, owner)
    }

    pub fn for_label(label: Label, duration: u64, owner: AccountId) -> Result<Self, EncodingError> {
        if duration == 0 {
            return Err(EncodingError::NonPositiveDuration);
        }
        Ok(RegistrationRequest {
            label,
            duration,
            owner,
            resolver: None,
            data: Vec::new(),
            reverse_record: false,
            fuses: 0,
        })
    }

    pub fn resolver(mut self, resolver: AccountId) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Append a resolver instruction, for example one built with
    /// [set_addr_instruction](crate::resolver::set_addr_instruction).
    pub fn instruction(mut self, payload: Vec<u8>) -> Self {
        self.data.push(payload);
        self
    }

    pub fn reverse_record(mut self, reverse_record: bool) -> Self {
        self.reverse_record = reverse_record;
        self
    }

    pub fn fuses(mut self, fuses: u16) -> Self {
        self.fuses = fuses;
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// The resolver or [AccountId::zero] if none is set. This is how an absent resolver is
    /// encoded on the ledger.
    pub fn resolver_or_zero(&self) -> AccountId {
        self.resolver.unwrap_or_else(AccountId::zero)
    }

    pub fn resolver_address(&self) -> Option<AccountId> {
        self.resolver
    }

    pub fn data(&self) -> &[Vec<u8>] {
        &self.data
    }

    pub fn is_reverse_record(&self) -> bool {
        self.reverse_record
    }

    pub fn fuse_value(&self) -> u16 {
        self.fuses
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_duration_is_rejected() {
        let result = RegistrationRequest::new("example", 0, AccountId::zero());
        assert_eq!(result, Err(EncodingError::NonPositiveDuration));
    }

    #[test]
    fn invalid_label_is_rejected() {
        let result = RegistrationRequest::new("a", 100, AccountId::zero());
        assert!(matches!(result, Err(EncodingError::Label(_))));
    }

    #[test]
    fn builder_sets_optional_fields() {
        let resolver = AccountId([9u8; 20]);
        let request = RegistrationRequest::new("Example", 100, AccountId::zero())
            .unwrap()
            .resolver(resolver)
            .instruction(vec![1, 2])
            .reverse_record(true)
            .fuses(4);
        assert_eq!(request.label().as_str(), "example");
        assert_eq!(request.resolver_or_zero(), resolver);
        assert_eq!(request.data(), &[vec![1u8, 2]][..]);
        assert!(request.is_reverse_record());
        assert_eq!(request.fuse_value(), 4);
    }
}
