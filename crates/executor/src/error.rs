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

use crate::sender::TxSenderError;

/// Executor errors that are not expressed as per operation results.
///
/// These indicate a caller or collaborator broke the executor's contract.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// A batch mixed v0.6 and v0.7 operations
    #[error("all user operations in a batch must share an entry point version")]
    MixedVersions,
    /// An operation was recorded against a different entry point than its batch
    #[error("user operation targets entry point {actual:?}, batch targets {expected:?}")]
    MismatchedEntryPoint {
        /// Entry point of the batch
        expected: Address,
        /// Entry point of the operation
        actual: Address,
    },
    /// The simulator returned an operation the executor never sent it, or dropped one
    #[error("user operation {0:?} missing from simulation results")]
    MissingOperation(B256),
    /// The submission loop broke its contract
    #[error(transparent)]
    Sender(#[from] TxSenderError),
}
