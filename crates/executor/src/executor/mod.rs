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

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, B256};
use conduit_provider::{EvmProvider, FeeEstimator};
use conduit_signer::SignerManager;
use conduit_types::{
    executor::{LeaseToken, UserOperationInfo},
    pool::Mempool,
    simulation::{BlockTag, BundleSimulator, SimulatedOp},
};
use conduit_utils::emit::{self, WithEntryPoint};
use metrics::Counter;
use metrics_derive::Metrics;
use tokio::sync::broadcast;

use crate::{sender::TransactionSender, ExecutorError, ExecutorEvent, ExecutorSettings};

mod bundle;
mod conflict;
mod flush;
mod replace;

#[cfg(test)]
mod test_utils;

/// Sends bundles of user operations and keeps them moving until they are mined.
///
/// Each call leases one account from the signer pool for the duration of the attempt.
/// Calls are independent and may run concurrently.
pub struct Executor<P, F, S, M> {
    settings: ExecutorSettings,
    sender: TransactionSender<P>,
    fee_estimator: F,
    simulator: S,
    mempool: M,
    signer_manager: Arc<dyn SignerManager>,
    event_sender: broadcast::Sender<WithEntryPoint<ExecutorEvent>>,
    metrics: ExecutorMetrics,
}

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider,
    F: FeeEstimator,
    S: BundleSimulator,
    M: Mempool,
{
    /// Create a new executor
    pub fn new(
        settings: ExecutorSettings,
        provider: P,
        fee_estimator: F,
        simulator: S,
        mempool: M,
        signer_manager: Arc<dyn SignerManager>,
        event_sender: broadcast::Sender<WithEntryPoint<ExecutorEvent>>,
    ) -> Self {
        Self {
            sender: TransactionSender::new(provider, &settings),
            settings,
            fee_estimator,
            simulator,
            mempool,
            signer_manager,
            event_sender,
            metrics: ExecutorMetrics::default(),
        }
    }

    /// Release the account held by a transaction that has been mined or abandoned.
    ///
    /// Returns false if that lease was already released.
    pub fn mark_wallet_processed(&self, executor: LeaseToken) -> bool {
        self.signer_manager.release(executor)
    }

    fn block_tag(&self, tag: BlockTag) -> Option<BlockTag> {
        self.settings.block_tag_support.then_some(tag)
    }

    fn emit(&self, entry_point: Address, event: ExecutorEvent) {
        emit::emit(&self.event_sender, entry_point, event);
    }
}

/// Pair each operation with its rejection reason, if any, in the order of `ops`
fn match_outcomes(
    ops: Vec<UserOperationInfo>,
    simulated_ops: Vec<SimulatedOp>,
) -> Result<Vec<(UserOperationInfo, Option<String>)>, ExecutorError> {
    let mut outcomes = HashMap::<B256, Option<String>>::with_capacity(simulated_ops.len());
    for simulated in simulated_ops {
        if !ops.iter().any(|op| op.hash == simulated.op.hash) {
            return Err(ExecutorError::MissingOperation(simulated.op.hash));
        }
        let rejection = simulated.rejection().map(str::to_owned);
        outcomes.insert(simulated.op.hash, rejection);
    }

    ops.into_iter()
        .map(|op| match outcomes.remove(&op.hash) {
            Some(rejection) => Ok((op, rejection)),
            None => Err(ExecutorError::MissingOperation(op.hash)),
        })
        .collect()
}

#[derive(Metrics)]
#[metrics(scope = "executor")]
struct ExecutorMetrics {
    #[metric(describe = "the count of bundle transactions sent.")]
    bundle_txns_sent: Counter,
    #[metric(describe = "the count of bundle transactions replaced.")]
    bundle_txns_replaced: Counter,
    #[metric(describe = "the count of bundle transactions that failed to send.")]
    bundle_txns_failed: Counter,
    #[metric(describe = "the count of replacements that found the transaction likely mined.")]
    bundle_txns_potentially_included: Counter,
    #[metric(describe = "the count of user operations returned for a later bundle.")]
    ops_resubmitted: Counter,
    #[metric(describe = "the count of user operations returned after a nonce conflict.")]
    ops_conflict_resubmitted: Counter,
    #[metric(describe = "the count of stuck nonces swept with a self transfer.")]
    stuck_nonces_flushed: Counter,
}
