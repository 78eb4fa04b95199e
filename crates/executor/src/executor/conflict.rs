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

use conduit_provider::{EvmProvider, FeeEstimator};
use conduit_signer::SignerLease;
use conduit_types::{
    executor::LeaseToken, pool::Mempool, simulation::BundleSimulator, BundleTransaction,
};
use conduit_utils::log::LogOnError;
use tracing::{info, instrument};

use super::Executor;
use crate::{
    bundle_tx::HandleOpsTx,
    sender::{SentTransaction, TxSenderError},
};

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider,
    F: FeeEstimator,
    S: BundleSimulator,
    M: Mempool,
{
    /// Send `tx` from the leased account, then clean up transactions it superseded
    pub(crate) async fn send_handle_ops_transaction(
        &self,
        tx: &HandleOpsTx,
        request: BundleTransaction,
        lease: &SignerLease,
    ) -> Result<SentTransaction, TxSenderError> {
        let sent = self.sender.send(tx, request, lease).await?;

        if sent.was_underpriced {
            self.handle_transaction_underpriced(sent.request.nonce, lease.token())
                .await;
        }

        Ok(sent)
    }

    /// Return the operations of every other transaction at `executor`'s account and nonce
    /// to the pool, whatever entry point they were bundled for.
    ///
    /// A fee bumped send under the same account and nonce makes those transactions
    /// unmineable. Their leases ended before `executor` was granted, so the account stays
    /// with `executor`. An operation is only re-added once it has left the submitted set.
    /// Returns the number of operations moved back.
    #[instrument(skip(self))]
    pub async fn handle_transaction_underpriced(&self, nonce: u64, executor: LeaseToken) -> usize {
        let Ok(submitted) = self
            .mempool
            .dump_submitted()
            .await
            .log_on_error("failed to read submitted operations")
        else {
            return 0;
        };

        let conflicting = submitted.into_iter().filter(|submitted| {
            let transaction = &submitted.transaction;
            transaction.executor.address == executor.address
                && transaction.executor != executor
                && transaction.transaction_request.nonce == nonce
        });

        let mut moved = 0;
        for submitted in conflicting {
            let entry_point = submitted.transaction.entry_point;
            info!(
                "resubmitting {:?} due to transaction underpriced",
                submitted.op.hash
            );
            if self
                .mempool
                .remove_submitted(entry_point, submitted.op.hash)
                .await
                .log_on_error("failed to remove submitted operation")
                .is_err()
            {
                continue;
            }
            if self
                .mempool
                .add(entry_point, submitted.op.op.clone())
                .await
                .log_on_error("failed to return operation to the pool")
                .is_ok()
            {
                moved += 1;
            }
        }
        self.metrics.ops_conflict_resubmitted.increment(moved as u64);

        moved
    }
}
