// This file is part of Conduit.
//
// Conduit is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Conduit is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Conduit.
// If not, see https://www.gnu.org/licenses/.

use std::fmt::Debug;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::authorization::Eip7702Auth;

/// User Operation types for Entry Point v0.6
pub mod v0_6;
/// User Operation types for Entry Point v0.7
pub mod v0_7;

/// ERC-4337 Entry point version
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, strum::Display)]
pub enum EntryPointVersion {
    /// Version 0.6
    #[strum(serialize = "v0.6")]
    V0_6,
    /// Version 0.7
    #[strum(serialize = "v0.7")]
    V0_7,
}

/// User operation trait
pub trait UserOperation: Debug + Clone + Send + Sync + 'static {
    /// Get the entry point version for this UO
    fn entry_point_version() -> EntryPointVersion;

    /// Get the user operation sender address
    fn sender(&self) -> Address;

    /// Get the user operation nonce
    fn nonce(&self) -> U256;

    /// Get the user operation paymaster address, if any
    fn paymaster(&self) -> Option<Address>;

    /// Returns the call gas limit
    fn call_gas_limit(&self) -> u128;

    /// Returns the verification gas limit
    fn verification_gas_limit(&self) -> u128;

    /// Returns the pre-verification gas
    fn pre_verification_gas(&self) -> u128;

    /// Returns the max fee per gas
    fn max_fee_per_gas(&self) -> u128;

    /// Returns the max priority fee per gas
    fn max_priority_fee_per_gas(&self) -> u128;

    /// Returns the delegation authorization attached to this operation, if any
    fn authorization_tuple(&self) -> Option<&Eip7702Auth>;

    /// Hash a user operation with the given entry point and chain ID.
    ///
    /// The hash is used to uniquely identify a user operation in the entry point.
    /// It does not include the signature field.
    fn hash(&self, entry_point: Address, chain_id: u64) -> B256;

    /// Funds the entry point requires up front from the sender or paymaster, in wei
    fn required_prefund(&self) -> U256;
}

/// User operation enum supporting every entry point version
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserOperationVariant {
    /// User operation version 0.6
    V0_6(v0_6::UserOperation),
    /// User operation version 0.7
    V0_7(v0_7::UserOperation),
}

macro_rules! delegate {
    ($self:ident, $op:ident => $body:expr) => {
        match $self {
            UserOperationVariant::V0_6($op) => $body,
            UserOperationVariant::V0_7($op) => $body,
        }
    };
}

impl UserOperationVariant {
    /// The entry point version of the inner operation
    pub fn entry_point_version(&self) -> EntryPointVersion {
        match self {
            Self::V0_6(_) => EntryPointVersion::V0_6,
            Self::V0_7(_) => EntryPointVersion::V0_7,
        }
    }

    /// Get the user operation sender address
    pub fn sender(&self) -> Address {
        delegate!(self, op => op.sender())
    }

    /// Get the user operation nonce
    pub fn nonce(&self) -> U256 {
        delegate!(self, op => op.nonce())
    }

    /// Get the user operation paymaster address, if any
    pub fn paymaster(&self) -> Option<Address> {
        delegate!(self, op => op.paymaster())
    }

    /// Returns the call gas limit
    pub fn call_gas_limit(&self) -> u128 {
        delegate!(self, op => op.call_gas_limit())
    }

    /// Returns the verification gas limit
    pub fn verification_gas_limit(&self) -> u128 {
        delegate!(self, op => op.verification_gas_limit())
    }

    /// Returns the pre-verification gas
    pub fn pre_verification_gas(&self) -> u128 {
        delegate!(self, op => op.pre_verification_gas())
    }

    /// Returns the max fee per gas
    pub fn max_fee_per_gas(&self) -> u128 {
        delegate!(self, op => op.max_fee_per_gas())
    }

    /// Returns the max priority fee per gas
    pub fn max_priority_fee_per_gas(&self) -> u128 {
        delegate!(self, op => op.max_priority_fee_per_gas())
    }

    /// Returns the delegation authorization attached to this operation, if any
    pub fn authorization_tuple(&self) -> Option<&Eip7702Auth> {
        delegate!(self, op => op.authorization_tuple())
    }

    /// Hash the operation for the given entry point and chain
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        delegate!(self, op => op.hash(entry_point, chain_id))
    }

    /// Funds the entry point requires up front, in wei
    pub fn required_prefund(&self) -> U256 {
        delegate!(self, op => op.required_prefund())
    }

    /// Returns the v0.6 operation, if this is one
    pub fn as_v0_6(&self) -> Option<&v0_6::UserOperation> {
        match self {
            Self::V0_6(op) => Some(op),
            Self::V0_7(_) => None,
        }
    }

    /// Returns the v0.7 operation, if this is one
    pub fn as_v0_7(&self) -> Option<&v0_7::UserOperation> {
        match self {
            Self::V0_7(op) => Some(op),
            Self::V0_6(_) => None,
        }
    }
}

impl From<v0_6::UserOperation> for UserOperationVariant {
    fn from(op: v0_6::UserOperation) -> Self {
        Self::V0_6(op)
    }
}

impl From<v0_7::UserOperation> for UserOperationVariant {
    fn from(op: v0_7::UserOperation) -> Self {
        Self::V0_7(op)
    }
}

/// Concatenate two big endian 128 bit words into one 256 bit word, `high` first
pub(crate) fn concat_128(high: u128, low: u128) -> B256 {
    let mut out = [0_u8; 32];
    out[..16].copy_from_slice(&high.to_be_bytes());
    out[16..].copy_from_slice(&low.to_be_bytes());
    B256::from(out)
}

/// Returns the address in the first 20 bytes of `data`, if present
pub(crate) fn address_prefix(data: &Bytes) -> Option<Address> {
    (data.len() >= 20).then(|| Address::from_slice(&data[..20]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_128() {
        let word = concat_128(1, 2);
        assert_eq!(word[15], 1);
        assert_eq!(word[31], 2);
        assert!(word[..15].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_address_prefix() {
        let short = Bytes::from(vec![1_u8; 19]);
        assert_eq!(address_prefix(&short), None);

        let data: Bytes = "0x0123456789abcdef0123456789abcdef01234567ffff"
            .parse()
            .unwrap();
        assert_eq!(
            address_prefix(&data),
            Some(
                "0x0123456789abcdef0123456789abcdef01234567"
                    .parse()
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_variant_version() {
        let op: UserOperationVariant = v0_6::UserOperation::default().into();
        assert_eq!(op.entry_point_version(), EntryPointVersion::V0_6);
        assert!(op.as_v0_7().is_none());
        assert_eq!(EntryPointVersion::V0_7.to_string(), "v0.7");
    }
}
