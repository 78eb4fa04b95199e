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

use std::sync::Arc;

use crate::executor::{TransactionInfo, UserOperationInfo};

/// An operation inside a sent bundle, together with that bundle
#[derive(Clone, Debug)]
pub struct SubmittedUserOperation {
    /// The operation
    pub op: UserOperationInfo,
    /// The transaction carrying it
    pub transaction: Arc<TransactionInfo>,
}
