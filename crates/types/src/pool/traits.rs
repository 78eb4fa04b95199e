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

use alloy_primitives::{Address, B256};
#[cfg(feature = "test-utils")]
use mockall::automock;

use super::{error::PoolError, types::SubmittedUserOperation};
use crate::UserOperationVariant;

/// Result type for mempool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// The pending operation store, as seen by the execution engine
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait Mempool: Send + Sync + 'static {
    /// Every operation currently carried by a sent, unsettled bundle, across all entry points
    async fn dump_submitted(&self) -> PoolResult<Vec<SubmittedUserOperation>>;

    /// Stop tracking an operation as submitted
    async fn remove_submitted(&self, entry_point: Address, op_hash: B256) -> PoolResult<()>;

    /// Return an operation to the pending set so it can be bundled again
    async fn add(&self, entry_point: Address, op: UserOperationVariant) -> PoolResult<()>;
}
