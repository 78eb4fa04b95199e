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

//! Trait for interacting with the chain's node.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256};
#[cfg(feature = "test-utils")]
use mockall::automock;
use serde::Serialize;

use super::error::ProviderResult;

/// Inclusion conditions for `eth_sendRawTransactionConditional`
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConditional {
    /// Storage roots the listed accounts must have at inclusion
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub known_accounts: BTreeMap<Address, B256>,
    /// Latest block the transaction may be included in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number_max: Option<u64>,
    /// Latest timestamp the transaction may be included at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_max: Option<u64>,
}

/// Trait for interacting with chain data and broadcasting transactions.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait EvmProvider: Send + Sync {
    /// Get the number of transactions mined from an address
    async fn get_transaction_count(&self, address: Address) -> ProviderResult<u64>;

    /// Get the number of transactions from an address including those still pending
    async fn get_pending_transaction_count(&self, address: Address) -> ProviderResult<u64>;

    /// Get the base fee of the pending block
    async fn get_pending_base_fee(&self) -> ProviderResult<u128>;

    /// Get the node's suggested max priority fee
    async fn get_max_priority_fee(&self) -> ProviderResult<u128>;

    /// Broadcast a signed transaction to the public mempool
    async fn send_raw_transaction(&self, tx: Bytes) -> ProviderResult<B256>;

    /// Send a signed transaction through a conditional private channel
    async fn send_raw_transaction_conditional(
        &self,
        tx: Bytes,
        conditional: TransactionConditional,
    ) -> ProviderResult<B256>;
}
