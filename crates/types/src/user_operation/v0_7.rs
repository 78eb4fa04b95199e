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
use conduit_contracts::v0_7::PackedUserOperation;
use serde::{Deserialize, Serialize};

use super::{concat_128, EntryPointVersion, UserOperation as UserOperationTrait};
use crate::authorization::Eip7702Auth;

/// User Operation for Entry Point v0.7
///
/// Offchain version, must be packed before sending onchain
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender
    pub sender: Address,
    /// Semi-abstracted nonce
    pub nonce: U256,
    /// Factory, if the account is being deployed
    pub factory: Option<Address>,
    /// Factory data
    #[serde(default)]
    pub factory_data: Bytes,
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
    /// Paymaster, if sponsored
    pub paymaster: Option<Address>,
    /// Paymaster verification gas limit
    #[serde(default)]
    pub paymaster_verification_gas_limit: u128,
    /// Paymaster post-op gas limit
    #[serde(default)]
    pub paymaster_post_op_gas_limit: u128,
    /// Paymaster data
    #[serde(default)]
    pub paymaster_data: Bytes,
    /// Signature
    pub signature: Bytes,
    /// EIP-7702 authorization for delegated senders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip7702_auth: Option<Eip7702Auth>,
}

impl UserOperation {
    /// Pack into the onchain representation
    pub fn pack(&self) -> PackedUserOperation {
        let init_code = match self.factory {
            Some(factory) => {
                let mut init_code = factory.to_vec();
                init_code.extend_from_slice(&self.factory_data);
                Bytes::from(init_code)
            }
            None => Bytes::new(),
        };

        let paymaster_and_data = match self.paymaster {
            Some(paymaster) => {
                let mut paymaster_and_data = paymaster.to_vec();
                paymaster_and_data
                    .extend_from_slice(&self.paymaster_verification_gas_limit.to_be_bytes());
                paymaster_and_data.extend_from_slice(&self.paymaster_post_op_gas_limit.to_be_bytes());
                paymaster_and_data.extend_from_slice(&self.paymaster_data);
                Bytes::from(paymaster_and_data)
            }
            None => Bytes::new(),
        };

        PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            initCode: init_code,
            callData: self.call_data.clone(),
            accountGasLimits: concat_128(self.verification_gas_limit, self.call_gas_limit),
            preVerificationGas: U256::from(self.pre_verification_gas),
            gasFees: concat_128(self.max_priority_fee_per_gas, self.max_fee_per_gas),
            paymasterAndData: paymaster_and_data,
            signature: self.signature.clone(),
        }
    }
}

fn hash_packed_user_operation(
    puo: &PackedUserOperation,
    entry_point: Address,
    chain_id: u64,
) -> B256 {
    let inner = (
        puo.sender,
        puo.nonce,
        keccak256(&puo.initCode),
        keccak256(&puo.callData),
        puo.accountGasLimits,
        puo.preVerificationGas,
        puo.gasFees,
        keccak256(&puo.paymasterAndData),
    )
        .abi_encode_params();

    keccak256((keccak256(inner), entry_point, U256::from(chain_id)).abi_encode_params())
}

impl UserOperationTrait for UserOperation {
    fn entry_point_version() -> EntryPointVersion {
        EntryPointVersion::V0_7
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> U256 {
        self.nonce
    }

    fn paymaster(&self) -> Option<Address> {
        self.paymaster
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
        hash_packed_user_operation(&self.pack(), entry_point, chain_id)
    }

    fn required_prefund(&self) -> U256 {
        let gas = U256::from(self.verification_gas_limit)
            + U256::from(self.call_gas_limit)
            + U256::from(self.paymaster_verification_gas_limit)
            + U256::from(self.paymaster_post_op_gas_limit)
            + U256::from(self.pre_verification_gas);
        gas * U256::from(self.max_fee_per_gas)
    }
}

impl From<UserOperation> for PackedUserOperation {
    fn from(op: UserOperation) -> Self {
        op.pack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_gas_words() {
        let op = UserOperation {
            verification_gas_limit: 0x1111,
            call_gas_limit: 0x2222,
            max_priority_fee_per_gas: 0x33,
            max_fee_per_gas: 0x44,
            ..Default::default()
        };
        let packed = op.pack();

        let mut account_gas_limits = [0_u8; 32];
        account_gas_limits[14..16].copy_from_slice(&[0x11, 0x11]);
        account_gas_limits[30..32].copy_from_slice(&[0x22, 0x22]);
        assert_eq!(packed.accountGasLimits, B256::from(account_gas_limits));

        let mut gas_fees = [0_u8; 32];
        gas_fees[15] = 0x33;
        gas_fees[31] = 0x44;
        assert_eq!(packed.gasFees, B256::from(gas_fees));

        assert!(packed.initCode.is_empty());
        assert!(packed.paymasterAndData.is_empty());
    }

    #[test]
    fn test_pack_factory_and_paymaster() {
        let factory = Address::repeat_byte(0xfa);
        let paymaster = Address::repeat_byte(0xbb);
        let op = UserOperation {
            factory: Some(factory),
            factory_data: Bytes::from_static(&[1, 2, 3]),
            paymaster: Some(paymaster),
            paymaster_verification_gas_limit: 5,
            paymaster_post_op_gas_limit: 6,
            paymaster_data: Bytes::from_static(&[9]),
            ..Default::default()
        };
        let packed = op.pack();

        assert_eq!(&packed.initCode[..20], factory.as_slice());
        assert_eq!(&packed.initCode[20..], &[1, 2, 3]);

        assert_eq!(packed.paymasterAndData.len(), 20 + 16 + 16 + 1);
        assert_eq!(&packed.paymasterAndData[..20], paymaster.as_slice());
        assert_eq!(packed.paymasterAndData[35], 5);
        assert_eq!(packed.paymasterAndData[51], 6);
        assert_eq!(packed.paymasterAndData[52], 9);
    }

    #[test]
    fn test_hash_binds_entry_point_and_chain() {
        let op = UserOperation {
            sender: Address::repeat_byte(1),
            nonce: U256::from(3),
            ..Default::default()
        };
        let entry_point = Address::repeat_byte(0xee);
        let hash = op.hash(entry_point, 1);

        assert_eq!(hash, op.hash(entry_point, 1));
        assert_ne!(hash, op.hash(entry_point, 2));
        assert_ne!(hash, op.hash(Address::repeat_byte(0xef), 1));

        let mut resigned = op.clone();
        resigned.signature = Bytes::from_static(&[0xff]);
        assert_eq!(hash, resigned.hash(entry_point, 1));
    }

    #[test]
    fn test_required_prefund() {
        let op = UserOperation {
            verification_gas_limit: 10,
            call_gas_limit: 20,
            paymaster_verification_gas_limit: 30,
            paymaster_post_op_gas_limit: 40,
            pre_verification_gas: 50,
            max_fee_per_gas: 3,
            ..Default::default()
        };
        assert_eq!(op.required_prefund(), U256::from(450));
    }
}
