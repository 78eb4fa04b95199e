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

use conduit_types::executor::UserOperationInfo;

/// Gas the entry point reserves per operation on top of its call and verification limits
const INNER_HANDLE_OP_OVERHEAD: u128 = 5_000;

/// Added to every bundle limit, estimates tend to round down
const GAS_LIMIT_BUFFER: u64 = 10_000;

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Minimum gas the entry point needs to attempt every operation in the bundle
pub(crate) fn inner_handle_op_floor(ops: &[UserOperationInfo]) -> u64 {
    saturating_u64(ops.iter().fold(0_u128, |acc, info| {
        acc.saturating_add(info.op.call_gas_limit())
            .saturating_add(info.op.verification_gas_limit())
            .saturating_add(INNER_HANDLE_OP_OVERHEAD)
    }))
}

/// Worst case gas for the bundle derived only from the operations' limits
pub(crate) fn local_gas_limit(ops: &[UserOperationInfo]) -> u64 {
    saturating_u64(ops.iter().fold(0_u128, |acc, info| {
        acc.saturating_add(info.op.pre_verification_gas())
            .saturating_add(info.op.verification_gas_limit().saturating_mul(3))
            .saturating_add(info.op.call_gas_limit())
    }))
}

/// Final gas limit for a bundle of `ops`.
///
/// `estimate` is raised to the entry point floor, then buffered. A replacement never
/// goes below the limit of the transaction it replaces.
pub(crate) fn bundle_gas_limit(
    estimate: u64,
    ops: &[UserOperationInfo],
    prior_gas_limit: Option<u64>,
) -> u64 {
    let gas_limit = estimate
        .max(inner_handle_op_floor(ops))
        .saturating_add(GAS_LIMIT_BUFFER);

    match prior_gas_limit {
        Some(prior) => gas_limit.max(prior),
        None => gas_limit,
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use conduit_types::v0_6;

    use super::*;

    fn info(call: u128, verification: u128, pre_verification: u128) -> UserOperationInfo {
        let op = v0_6::UserOperation {
            call_gas_limit: call,
            verification_gas_limit: verification,
            pre_verification_gas: pre_verification,
            ..Default::default()
        };
        UserOperationInfo::new(op.into(), Address::ZERO, 1)
    }

    #[test]
    fn test_floor() {
        let ops = vec![info(100_000, 50_000, 0), info(20_000, 30_000, 0)];
        assert_eq!(inner_handle_op_floor(&ops), 210_000);
    }

    #[test]
    fn test_estimate_raised_to_floor() {
        let ops = vec![info(100_000, 50_000, 0)];
        assert_eq!(bundle_gas_limit(1_000, &ops, None), 165_000);
    }

    #[test]
    fn test_estimate_above_floor_is_buffered() {
        let ops = vec![info(100_000, 50_000, 0)];
        assert_eq!(bundle_gas_limit(500_000, &ops, None), 510_000);
    }

    #[test]
    fn test_never_below_prior() {
        let ops = vec![info(100_000, 50_000, 0)];
        assert_eq!(bundle_gas_limit(1_000, &ops, Some(900_000)), 900_000);
        assert_eq!(bundle_gas_limit(1_000, &ops, Some(1)), 165_000);
    }

    #[test]
    fn test_local_gas_limit() {
        let ops = vec![info(100_000, 50_000, 40_000), info(1, 2, 3)];
        assert_eq!(local_gas_limit(&ops), 290_000 + 10);
    }

    #[test]
    fn test_saturates() {
        let ops = vec![info(u128::MAX, u128::MAX, u128::MAX)];
        assert_eq!(inner_handle_op_floor(&ops), u64::MAX);
        assert_eq!(bundle_gas_limit(0, &ops, None), u64::MAX);
    }
}
