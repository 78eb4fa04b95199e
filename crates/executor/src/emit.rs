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

use std::fmt::Display;

use alloy_primitives::{Address, B256};

/// Executor event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorEvent {
    /// Account that sent the transaction
    pub executor: Address,
    /// Event kind
    pub kind: ExecutorEventKind,
}

impl ExecutorEvent {
    pub(crate) fn new(executor: Address, kind: ExecutorEventKind) -> Self {
        Self { executor, kind }
    }

    pub(crate) fn submitted(executor: Address, op_hash: B256, tx_hash: B256) -> Self {
        Self::new(executor, ExecutorEventKind::Submitted { op_hash, tx_hash })
    }

    pub(crate) fn transaction_replaced(
        executor: Address,
        tx_hash: B256,
        previous_tx_hash: B256,
        nonce: u64,
    ) -> Self {
        Self::new(
            executor,
            ExecutorEventKind::TransactionReplaced {
                tx_hash,
                previous_tx_hash,
                nonce,
            },
        )
    }

    pub(crate) fn rejected_op(executor: Address, op_hash: B256, reason: String) -> Self {
        Self::new(executor, ExecutorEventKind::RejectedOp { op_hash, reason })
    }
}

/// ExecutorEventKind
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutorEventKind {
    /// An operation was included in a broadcast transaction
    Submitted {
        /// Operation hash
        op_hash: B256,
        /// Hash of the transaction carrying it
        tx_hash: B256,
    },
    /// A stuck transaction was replaced with higher fees
    TransactionReplaced {
        /// Hash of the replacement
        tx_hash: B256,
        /// Hash it supersedes
        previous_tx_hash: B256,
        /// Shared nonce
        nonce: u64,
    },
    /// An operation was dropped from a bundle after simulation
    RejectedOp {
        /// Operation hash
        op_hash: B256,
        /// Revert reason
        reason: String,
    },
}

impl Display for ExecutorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExecutorEventKind::Submitted { op_hash, tx_hash } => write!(
                f,
                concat!(
                    "Op submitted!",
                    "    Executor: {:?}",
                    "    Op hash: {:?}",
                    "    Transaction hash: {:?}",
                ),
                self.executor, op_hash, tx_hash,
            ),
            ExecutorEventKind::TransactionReplaced {
                tx_hash,
                previous_tx_hash,
                nonce,
            } => write!(
                f,
                concat!(
                    "Transaction replaced!",
                    "    Executor: {:?}",
                    "    Transaction hash: {:?}",
                    "    Replaces: {:?}",
                    "    Nonce: {}",
                ),
                self.executor, tx_hash, previous_tx_hash, nonce,
            ),
            ExecutorEventKind::RejectedOp { op_hash, reason } => write!(
                f,
                "Op rejected from bundle.   Executor: {:?}    Op hash: {op_hash:?}    Reason: {reason}",
                self.executor
            ),
        }
    }
}
