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

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use conduit_contracts::v0_6::UserOperation as ContractUserOperation;
use serde::{Deserialize, Serialize};

use super::{address_prefix, EntryPointVersion, UserOperation as UserOperationTrait};
use crate::authorization::Eip7702Auth;

/// Verification gas is charged up to three times when a paymaster is present:
/// account validation, paymaster validation and paymaster post-op.
const PAYMASTER_VERIFICATION_GAS_MULTIPLIER: u128 = 3;

/// User Operation for Entry Point v0.6
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender
    pub sender: Address,
    /// Semi-abstracted nonce
    pub nonce: U256,
    /// Init code
    pub init_code: Bytes,
    /// Call data
    pub call_data: Bytes,
    /// Call gas limit
    pub call_gas_limit: u128,
    /// Verification gas limit
    pub verification_gas_limit: u128,
    /// Pre-verification gas
    pub pre_verification_gas: u128,
    /// Max fee per gas
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas
    pub max_priority_fee_per_gas: u128,
    /// Paymaster and data
    pub paymaster_and_data: Bytes,
    /// Signature
    pub signature: Bytes,
    /// EIP-7702 authorization for delegated senders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip7702_auth: Option<Eip7702Auth>,
}

impl UserOperation {
    fn pack_for_hash(&self) -> Vec<u8> {
        (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            U256::from(self.call_gas_limit),
            U256::from(self.verification_gas_limit),
            U256::from(self.pre_verification_gas),
            U256::from(self.max_fee_per_gas),
            U256::from(self.max_priority_fee_per_gas),
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode_params()
    }
}

impl UserOperationTrait for UserOperation {
    fn entry_point_version() -> EntryPointVersion {
        EntryPointVersion::V0_6
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> U256 {
        self.nonce
    }

    fn paymaster(&self) -> Option<Address> {
        address_prefix(&self.paymaster_and_data)
    }

    fn call_gas_limit(&self) -> u128 {
        self.call_gas_limit
    }

    fn verification_gas_limit(&self) -> u128 {
        self.verification_gas_limit
    }

    fn pre_verification_gas(&self) -> u128 {
        self.pre_verification_gas
    }

    fn max_fee_per_gas(&self) -> u128 {
        self.max_fee_per_gas
    }

    fn max_priority_fee_per_gas(&self) -> u128 {
        self.max_priority_fee_per_gas
    }

    fn authorization_tuple(&self) -> Option<&Eip7702Auth> {
        self.eip7702_auth.as_ref()
    }

    fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        keccak256(
            (
                keccak256(self.pack_for_hash()),
                entry_point,
                U256::from(chain_id),
            )
                .abi_encode_params(),
        )
    }

    fn required_prefund(&self) -> U256 {
        let multiplier = if self.paymaster().is_some() {
            PAYMASTER_VERIFICATION_GAS_MULTIPLIER
        } else {
            1
        };
        let gas = U256::from(self.call_gas_limit)
            + U256::from(self.verification_gas_limit) * U256::from(multiplier)
            + U256::from(self.pre_verification_gas);
        gas * U256::from(self.max_fee_per_gas)
    }
}

impl From<UserOperation> for ContractUserOperation {
    fn from(op: UserOperation) -> Self {
        ContractUserOperation {
            sender: op.sender,
            nonce: op.nonce,
            initCode: op.init_code,
            callData: op.call_data,
            callGasLimit: U256::from(op.call_gas_limit),
            verificationGasLimit: U256::from(op.verification_gas_limit),
            preVerificationGas: U256::from(op.pre_verification_gas),
            maxFeePerGas: U256::from(op.max_fee_per_gas),
            maxPriorityFeePerGas: U256::from(op.max_priority_fee_per_gas),
            paymasterAndData: op.paymaster_and_data,
            signature: op.signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_zeroed() {
        // Matches getUserOpHash() on an entry point deployed at
        // 0x66a15edcc3b50a663e72f1457ffd49b9ae284ddc on chain 1337.
        let operation = UserOperation::default();
        let entry_point = "0x66a15edcc3b50a663e72f1457ffd49b9ae284ddc"
            .parse()
            .unwrap();
        assert_eq!(
            operation.hash(entry_point, 1337),
            "0xdca97c3b49558ab360659f6ead939773be8bf26631e61bb17045bb70dc983b2d"
                .parse::<B256>()
                .unwrap()
        );
    }

    #[test]
    fn test_hash() {
        let operation = UserOperation {
            sender: "0x1306b01bc3e4ad202612d3843387e94737673f53"
                .parse()
                .unwrap(),
            nonce: U256::from(8942),
            init_code: "0x6942069420694206942069420694206942069420"
                .parse()
                .unwrap(),
            call_data: "0x0000000000000000000000000000000000000000080085"
                .parse()
                .unwrap(),
            call_gas_limit: 10000,
            verification_gas_limit: 100000,
            pre_verification_gas: 100,
            max_fee_per_gas: 99999,
            max_priority_fee_per_gas: 9999999,
            paymaster_and_data:
                "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
                    .parse()
                    .unwrap(),
            signature: "0xda0929f527cded8d0a1eaf2e8861d7f7e2d8160b7b13942f99dd367df4473a"
                .parse()
                .unwrap(),
            eip7702_auth: None,
        };
        let entry_point = "0x66a15edcc3b50a663e72f1457ffd49b9ae284ddc"
            .parse()
            .unwrap();
        assert_eq!(
            operation.hash(entry_point, 1337),
            "0x484add9e4d8c3172d11b5feb6a3cc712280e176d278027cfa02ee396eb28afa1"
                .parse::<B256>()
                .unwrap()
        );
    }

    #[test]
    fn test_required_prefund() {
        let mut op = UserOperation {
            call_gas_limit: 100,
            verification_gas_limit: 10,
            pre_verification_gas: 1,
            max_fee_per_gas: 2,
            ..Default::default()
        };
        assert_eq!(op.required_prefund(), U256::from(222));

        op.paymaster_and_data = Bytes::from(vec![0xab_u8; 20]);
        assert_eq!(op.required_prefund(), U256::from(262));
    }

    #[test]
    fn test_into_contract_type() {
        let op = UserOperation {
            call_gas_limit: 7,
            signature: Bytes::from_static(&[1, 2]),
            ..Default::default()
        };
        let encoded: ContractUserOperation = op.into();
        assert_eq!(encoded.callGasLimit, U256::from(7));
        assert_eq!(encoded.signature, Bytes::from_static(&[1, 2]));
    }
}
