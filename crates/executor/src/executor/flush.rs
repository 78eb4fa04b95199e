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

use alloy_primitives::{Address, Bytes};
use anyhow::Context;
use conduit_provider::{EvmProvider, FeeEstimator};
use conduit_types::{
    pool::Mempool, simulation::BundleSimulator, BundleTransaction, GasFees, TransactionFees,
};
use futures::future;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::Executor;
use crate::bundle_tx;

const FLUSH_PRICE_MULTIPLIER: u128 = 5;
const TRANSFER_GAS_LIMIT: u64 = 21_000;

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider,
    F: FeeEstimator,
    S: BundleSimulator,
    M: Mempool,
{
    /// Push every account past nonces held by transactions that never got mined.
    ///
    /// Each nonce between an account's latest and pending counts gets a zero-value
    /// self transfer priced at 5x the current network price.
    #[instrument(skip_all)]
    pub async fn flush_stuck_transactions(&self) {
        let fees = match self.fee_estimator.latest_bundle_fees().await {
            Ok(fees) => fees,
            Err(error) => {
                error!("failed to get network price, not flushing: {error:#}");
                return;
            }
        };
        let price = fees.max_fee_per_gas.saturating_mul(FLUSH_PRICE_MULTIPLIER);

        let mut accounts = self.signer_manager.addresses();
        accounts.extend(self.signer_manager.utility_address());

        let results = future::join_all(
            accounts
                .iter()
                .map(|address| self.flush_account(*address, price)),
        )
        .await;

        for (address, result) in accounts.iter().zip(results) {
            match result {
                Ok(0) => {}
                Ok(flushed) => info!("flushed {flushed} stuck nonces for {address:?}"),
                Err(error) => warn!("failed to flush stuck nonces for {address:?}: {error:#}"),
            }
        }
    }

    async fn flush_account(&self, address: Address, price: u128) -> anyhow::Result<usize> {
        let signer = self
            .signer_manager
            .signer(&address)
            .with_context(|| format!("no signer for {address:?}"))?;
        let provider = self.sender.provider();
        let (latest, pending) = tokio::try_join!(
            provider.get_transaction_count(address),
            provider.get_pending_transaction_count(address),
        )
        .context("failed to get transaction counts")?;

        let fees = if self.settings.legacy_transactions {
            TransactionFees::Legacy { gas_price: price }
        } else {
            TransactionFees::Eip1559(GasFees::new(price, price))
        };

        let mut flushed = 0;
        for nonce in latest..pending {
            let request = BundleTransaction {
                to: address,
                nonce,
                gas_limit: TRANSFER_GAS_LIMIT,
                fees: fees.clone(),
            };
            let tx = bundle_tx::build_transaction(&request, Bytes::new(), self.sender.chain_id());
            let raw = conduit_signer::sign_tx_raw(&*signer, tx).await?;
            match provider.send_raw_transaction(raw).await {
                Ok(tx_hash) => {
                    info!("sent flush transaction {tx_hash:?} for {address:?} nonce {nonce}");
                    self.metrics.stuck_nonces_flushed.increment(1);
                    flushed += 1;
                }
                Err(error) => warn!("failed to flush {address:?} nonce {nonce}: {error}"),
            }
        }
        Ok(flushed)
    }
}

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider + 'static,
    F: FeeEstimator + 'static,
    S: BundleSimulator,
    M: Mempool,
{
    /// Run [`Self::flush_stuck_transactions`] in the background
    pub fn spawn_flush_stuck_transactions(self: &Arc<Self>) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        tokio::spawn(async move { executor.flush_stuck_transactions().await })
    }
}
