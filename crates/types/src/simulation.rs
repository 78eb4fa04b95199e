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

//! Contract between the execution engine and the bundle simulator

use alloy_primitives::Address;
#[cfg(feature = "test-utils")]
use mockall::automock;

use crate::{authorization::Eip7702Auth, executor::UserOperationInfo, GasFees};

/// Block to simulate against
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BlockTag {
    /// Latest mined block
    Latest,
    /// Pending block
    Pending,
}

/// A batch to dry run with the bundle's final sender, nonce and fees
#[derive(Clone, Debug)]
pub struct SimulationRequest {
    /// Entry point the batch calls
    pub entry_point: Address,
    /// Account that will send the bundle
    pub executor: Address,
    /// Operations in the batch
    pub ops: Vec<UserOperationInfo>,
    /// Nonce the bundle will use
    pub nonce: u64,
    /// Fees the bundle will pay
    pub fees: GasFees,
    /// Block to simulate against, if the node supports block tags
    pub block_tag: Option<BlockTag>,
    /// Whether the bundle is a legacy transaction
    pub use_legacy_transactions: bool,
    /// Gas limit to estimate with instead of the block gas limit
    pub fixed_gas_limit: Option<u64>,
    /// Delegations attached to the bundle
    pub authorization_list: Vec<Eip7702Auth>,
}

/// Result of simulating one operation
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimulationOutcome {
    /// The operation can be included
    Accepted,
    /// The operation was rejected
    Rejected {
        /// Revert reason, e.g. `AA25 invalid account nonce`
        reason: String,
    },
}

/// An operation and its simulation outcome
#[derive(Clone, Debug)]
pub struct SimulatedOp {
    /// The operation
    pub op: UserOperationInfo,
    /// Its outcome
    pub outcome: SimulationOutcome,
}

impl SimulatedOp {
    /// The rejection reason, if rejected
    pub fn rejection(&self) -> Option<&str> {
        match &self.outcome {
            SimulationOutcome::Accepted => None,
            SimulationOutcome::Rejected { reason } => Some(reason),
        }
    }
}

/// Simulator output for a batch.
///
/// Every operation of the request appears in `simulated_ops` exactly once.
#[derive(Clone, Debug, Default)]
pub struct SimulationResult {
    /// Gas estimate for a bundle of only the accepted operations
    pub gas_limit: u64,
    /// Per operation outcomes
    pub simulated_ops: Vec<SimulatedOp>,
}

/// Simulates a batch of operations and estimates the gas for the survivors
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait BundleSimulator: Send + Sync + 'static {
    /// Simulate `request`, dropping rejected operations and estimating gas for the rest
    async fn filter_ops_and_estimate_gas(
        &self,
        request: SimulationRequest,
    ) -> anyhow::Result<SimulationResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_display() {
        assert_eq!(BlockTag::Pending.to_string(), "pending");
        assert_eq!(BlockTag::Latest.to_string(), "latest");
    }
}
