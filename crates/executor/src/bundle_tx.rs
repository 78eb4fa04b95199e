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

use alloy_consensus::{TxEip1559, TxEip7702, TxLegacy, TypedTransaction};
use alloy_primitives::{Address, Bytes, TxKind};
use alloy_sol_types::SolCall;
use conduit_contracts::{v0_6 as contracts_v0_6, v0_7 as contracts_v0_7};
use conduit_types::{
    executor::UserOperationInfo, BundleTransaction, Eip7702Auth, EntryPointVersion,
    TransactionFees,
};

use crate::ExecutorError;

/// Calldata of a `handleOps` call plus what the sender needs to know about it
#[derive(Clone, Debug)]
pub(crate) struct HandleOpsTx {
    pub(crate) entry_point: Address,
    pub(crate) calldata: Bytes,
    pub(crate) version: EntryPointVersion,
    pub(crate) is_replacement: bool,
}

impl HandleOpsTx {
    pub(crate) fn new(
        entry_point: Address,
        ops: &[UserOperationInfo],
        beneficiary: Address,
        is_replacement: bool,
    ) -> Result<Self, ExecutorError> {
        let version = batch_version(entry_point, ops)?.ok_or(ExecutorError::MixedVersions)?;
        Ok(Self {
            entry_point,
            calldata: handle_ops_calldata(version, ops, beneficiary)?,
            version,
            is_replacement,
        })
    }
}

/// Checks that every operation in a batch targets `entry_point` with the same version.
///
/// Returns `None` for an empty batch.
pub(crate) fn batch_version(
    entry_point: Address,
    ops: &[UserOperationInfo],
) -> Result<Option<EntryPointVersion>, ExecutorError> {
    let Some(first) = ops.first() else {
        return Ok(None);
    };
    let version = first.op.entry_point_version();

    for info in ops {
        if info.entry_point != entry_point {
            return Err(ExecutorError::MismatchedEntryPoint {
                expected: entry_point,
                actual: info.entry_point,
            });
        }
        if info.op.entry_point_version() != version {
            return Err(ExecutorError::MixedVersions);
        }
    }

    Ok(Some(version))
}

fn handle_ops_calldata(
    version: EntryPointVersion,
    ops: &[UserOperationInfo],
    beneficiary: Address,
) -> Result<Bytes, ExecutorError> {
    let calldata = match version {
        EntryPointVersion::V0_6 => {
            let ops = ops
                .iter()
                .map(|info| info.op.as_v0_6().cloned().map(Into::into))
                .collect::<Option<Vec<contracts_v0_6::UserOperation>>>()
                .ok_or(ExecutorError::MixedVersions)?;
            contracts_v0_6::IEntryPoint::handleOpsCall { ops, beneficiary }.abi_encode()
        }
        EntryPointVersion::V0_7 => {
            let ops = ops
                .iter()
                .map(|info| info.op.as_v0_7().map(|op| op.pack()))
                .collect::<Option<Vec<contracts_v0_7::PackedUserOperation>>>()
                .ok_or(ExecutorError::MixedVersions)?;
            contracts_v0_7::IEntryPoint::handleOpsCall { ops, beneficiary }.abi_encode()
        }
    };

    Ok(calldata.into())
}

/// Delegations carried by the operations, in batch order
pub(crate) fn authorization_list(ops: &[UserOperationInfo]) -> Vec<Eip7702Auth> {
    ops.iter()
        .filter_map(|info| info.op.authorization_tuple().cloned())
        .collect()
}

/// Build an unsigned transaction of the shape selected by `request.fees`
pub(crate) fn build_transaction(
    request: &BundleTransaction,
    input: Bytes,
    chain_id: u64,
) -> TypedTransaction {
    match &request.fees {
        TransactionFees::Legacy { gas_price } => TxLegacy {
            chain_id: Some(chain_id),
            nonce: request.nonce,
            gas_price: *gas_price,
            gas_limit: request.gas_limit,
            to: TxKind::Call(request.to),
            input,
            ..Default::default()
        }
        .into(),
        TransactionFees::Eip1559(fees) => TxEip1559 {
            chain_id,
            nonce: request.nonce,
            gas_limit: request.gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: TxKind::Call(request.to),
            input,
            ..Default::default()
        }
        .into(),
        TransactionFees::Eip7702 {
            fees,
            authorization_list,
        } => TxEip7702 {
            chain_id,
            nonce: request.nonce,
            gas_limit: request.gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: request.to,
            authorization_list: authorization_list
                .iter()
                .cloned()
                .map(Into::into)
                .collect(),
            input,
            ..Default::default()
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction;
    use alloy_primitives::U256;
    use conduit_types::{v0_6, v0_7, GasFees};

    use super::*;

    const ENTRY_POINT: Address = Address::repeat_byte(0xee);

    fn info_v0_6(nonce: u64) -> UserOperationInfo {
        let op = v0_6::UserOperation {
            nonce: U256::from(nonce),
            ..Default::default()
        };
        UserOperationInfo::new(op.into(), ENTRY_POINT, 1)
    }

    fn info_v0_7(nonce: u64) -> UserOperationInfo {
        let op = v0_7::UserOperation {
            nonce: U256::from(nonce),
            ..Default::default()
        };
        UserOperationInfo::new(op.into(), ENTRY_POINT, 1)
    }

    #[test]
    fn test_calldata_round_trips_ops() {
        let beneficiary = Address::repeat_byte(0xbe);
        let ops = vec![info_v0_6(0), info_v0_6(1)];
        let tx = HandleOpsTx::new(ENTRY_POINT, &ops, beneficiary, false).unwrap();
        assert_eq!(tx.version, EntryPointVersion::V0_6);

        let call = contracts_v0_6::IEntryPoint::handleOpsCall::abi_decode(&tx.calldata).unwrap();
        assert_eq!(call.beneficiary, beneficiary);
        assert_eq!(call.ops.len(), 2);
        assert_eq!(call.ops[1].nonce, U256::from(1));
    }

    #[test]
    fn test_v0_7_calldata_packs_ops() {
        let ops = vec![info_v0_7(3)];
        let tx = HandleOpsTx::new(ENTRY_POINT, &ops, Address::ZERO, true).unwrap();

        let call = contracts_v0_7::IEntryPoint::handleOpsCall::abi_decode(&tx.calldata).unwrap();
        assert_eq!(call.ops.len(), 1);
        assert_eq!(call.ops[0].nonce, U256::from(3));
        assert!(tx.is_replacement);
    }

    #[test]
    fn test_mixed_versions_rejected() {
        let ops = vec![info_v0_6(0), info_v0_7(1)];
        assert!(matches!(
            HandleOpsTx::new(ENTRY_POINT, &ops, Address::ZERO, false),
            Err(ExecutorError::MixedVersions)
        ));
    }

    #[test]
    fn test_mismatched_entry_point_rejected() {
        let mut other = info_v0_6(1);
        other.entry_point = Address::repeat_byte(1);
        let ops = vec![info_v0_6(0), other];
        assert!(matches!(
            batch_version(ENTRY_POINT, &ops),
            Err(ExecutorError::MismatchedEntryPoint { .. })
        ));
        assert_eq!(batch_version(ENTRY_POINT, &[]).unwrap(), None);
    }

    #[test]
    fn test_authorization_list() {
        let op = v0_7::UserOperation {
            eip7702_auth: Some(Eip7702Auth {
                chain_id: 1,
                address: Address::repeat_byte(5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let ops = vec![
            info_v0_7(0),
            UserOperationInfo::new(op.into(), ENTRY_POINT, 1),
        ];
        let list = authorization_list(&ops);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].address, Address::repeat_byte(5));
    }

    #[test]
    fn test_build_transaction_shapes() {
        let mut request = BundleTransaction {
            to: ENTRY_POINT,
            nonce: 7,
            gas_limit: 100_000,
            fees: TransactionFees::Legacy { gas_price: 50 },
        };

        let legacy = build_transaction(&request, Bytes::new(), 10);
        assert!(matches!(legacy, TypedTransaction::Legacy(_)));
        assert_eq!(legacy.gas_price(), Some(50));
        assert_eq!(legacy.chain_id(), Some(10));

        request.fees = TransactionFees::Eip1559(GasFees::new(100, 10));
        let eip1559 = build_transaction(&request, Bytes::from(vec![1, 2]), 10);
        assert!(matches!(eip1559, TypedTransaction::Eip1559(_)));
        assert_eq!(eip1559.max_fee_per_gas(), 100);
        assert_eq!(eip1559.max_priority_fee_per_gas(), Some(10));
        assert_eq!(eip1559.nonce(), 7);
        assert_eq!(eip1559.gas_limit(), 100_000);
        assert_eq!(eip1559.input().len(), 2);

        request.fees = TransactionFees::Eip7702 {
            fees: GasFees::new(100, 10),
            authorization_list: vec![Eip7702Auth::default()],
        };
        match build_transaction(&request, Bytes::new(), 10) {
            TypedTransaction::Eip7702(tx) => {
                assert_eq!(tx.to, ENTRY_POINT);
                assert_eq!(tx.authorization_list.len(), 1);
            }
            other => panic!("unexpected transaction {other:?}"),
        }
    }
}
