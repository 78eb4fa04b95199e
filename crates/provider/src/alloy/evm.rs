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

use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::Provider as AlloyProvider;
use alloy_rpc_types_eth::BlockNumberOrTag;
use anyhow::Context;

use crate::{EvmProvider, ProviderResult, TransactionConditional};

/// Evm Provider implementation using [alloy-provider](https://github.com/alloy-rs/alloy-rs)
#[derive(Clone, Debug)]
pub struct AlloyEvmProvider<AP> {
    inner: AP,
}

impl<AP> AlloyEvmProvider<AP> {
    /// Create a new `AlloyEvmProvider`
    pub fn new(inner: AP) -> Self {
        Self { inner }
    }
}

impl<AP: AlloyProvider> From<AP> for AlloyEvmProvider<AP> {
    fn from(inner: AP) -> Self {
        Self::new(inner)
    }
}

#[async_trait::async_trait]
impl<AP: AlloyProvider> EvmProvider for AlloyEvmProvider<AP> {
    async fn get_transaction_count(&self, address: Address) -> ProviderResult<u64> {
        Ok(self.inner.get_transaction_count(address).latest().await?)
    }

    async fn get_pending_transaction_count(&self, address: Address) -> ProviderResult<u64> {
        Ok(self.inner.get_transaction_count(address).pending().await?)
    }

    async fn get_pending_base_fee(&self) -> ProviderResult<u128> {
        let base_fee = self
            .inner
            .get_block_by_number(BlockNumberOrTag::Pending)
            .await?
            .context("pending block should exist")?
            .header
            .base_fee_per_gas
            .context("pending block should have a nonempty base fee")?;
        Ok(u128::from(base_fee))
    }

    async fn get_max_priority_fee(&self) -> ProviderResult<u128> {
        Ok(self.inner.get_max_priority_fee_per_gas().await?)
    }

    async fn send_raw_transaction(&self, tx: Bytes) -> ProviderResult<B256> {
        let pending = self.inner.send_raw_transaction(&tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn send_raw_transaction_conditional(
        &self,
        tx: Bytes,
        conditional: TransactionConditional,
    ) -> ProviderResult<B256> {
        Ok(self
            .inner
            .raw_request(
                "eth_sendRawTransactionConditional".into(),
                (tx, conditional),
            )
            .await?)
    }
}
