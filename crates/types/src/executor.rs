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

//! Records the execution engine keeps for in-flight bundles, and the
//! per-operation results it hands back to its caller.

use std::{fmt, sync::Arc, time::SystemTime};

use alloy_primitives::{Address, B256};

use crate::{transaction::BundleTransaction, user_operation::UserOperationVariant};

/// Identifies one checkout of a signing account.
///
/// Every lease of the same account gets a fresh `id`, so a token from an
/// earlier checkout can never release a later one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LeaseToken {
    /// Address of the leased account
    pub address: Address,
    /// Checkout sequence number
    pub id: u64,
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.address, self.id)
    }
}

/// A user operation tracked by the engine
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserOperationInfo {
    /// The operation
    pub op: UserOperationVariant,
    /// Hash of the operation for `entry_point` on the engine's chain
    pub hash: B256,
    /// Entry point the operation targets
    pub entry_point: Address,
    /// When the operation was first included in a sent bundle
    pub first_submitted: SystemTime,
    /// When a bundle carrying the operation was last replaced
    pub last_replaced: SystemTime,
}

impl UserOperationInfo {
    /// Hash `op` and wrap it, with both timestamps set to now
    pub fn new(op: UserOperationVariant, entry_point: Address, chain_id: u64) -> Self {
        let now = SystemTime::now();
        Self {
            hash: op.hash(entry_point, chain_id),
            op,
            entry_point,
            first_submitted: now,
            last_replaced: now,
        }
    }
}

/// A bundle transaction that has been sent and not yet settled
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionInfo {
    /// Entry point the bundle calls
    pub entry_point: Address,
    /// Hash of the latest broadcast
    pub transaction_hash: B256,
    /// Hashes this transaction has superseded, most recent first
    pub previous_transaction_hashes: Vec<B256>,
    /// The request as it was last broadcast
    pub transaction_request: BundleTransaction,
    /// The signing account lease held by this transaction
    pub executor: LeaseToken,
    /// Operations carried by the bundle
    pub user_operation_infos: Vec<UserOperationInfo>,
    /// When the first version was sent
    pub first_submitted: SystemTime,
    /// When the latest replacement was sent
    pub last_replaced: SystemTime,
    /// Times the transaction was seen as possibly already mined
    pub times_potentially_included: u32,
}

/// The outcome of a bundling attempt for one user operation
#[derive(Clone, Debug)]
pub enum BundleResult {
    /// The operation was included in a sent transaction
    Bundled {
        /// The operation
        op: UserOperationInfo,
        /// The transaction carrying it
        transaction: Arc<TransactionInfo>,
    },
    /// The operation is still valid and should be retried in a later bundle
    Resubmit {
        /// The operation
        op: UserOperationInfo,
        /// Why it was not bundled
        reason: String,
    },
    /// The operation could not be bundled
    Failed {
        /// The operation
        op: UserOperationInfo,
        /// Why it failed
        reason: String,
        /// Simulation rejection for this operation, kept when the failure
        /// happened later for the whole batch
        rejection: Option<String>,
    },
}

impl BundleResult {
    /// The operation this result is for
    pub fn op(&self) -> &UserOperationInfo {
        match self {
            Self::Bundled { op, .. } | Self::Resubmit { op, .. } | Self::Failed { op, .. } => op,
        }
    }

    /// Whether the operation was bundled
    pub fn is_bundled(&self) -> bool {
        matches!(self, Self::Bundled { .. })
    }

    /// Whether the operation should be retried later
    pub fn is_resubmit(&self) -> bool {
        matches!(self, Self::Resubmit { .. })
    }

    /// Whether the operation failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The outcome of replacing a stalled bundle transaction
#[derive(Clone, Debug)]
pub enum ReplaceTransactionResult {
    /// A replacement was broadcast
    Replaced {
        /// The new record, superseding the old one
        transaction: TransactionInfo,
        /// Operations dropped from the bundle because they no longer simulate, with reasons
        rejected: Vec<(UserOperationInfo, String)>,
    },
    /// The original transaction has likely been mined already
    PotentiallyAlreadyIncluded,
    /// The replacement could not be sent
    Failed,
}
