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

use std::time::SystemTime;

use conduit_provider::{EvmProvider, FeeEstimator};
use conduit_types::{
    executor::{ReplaceTransactionResult, TransactionInfo, UserOperationInfo},
    pool::Mempool,
    simulation::{BlockTag, BundleSimulator, SimulationRequest},
    BundleTransaction, TransactionFees,
};
use tracing::{debug, error, info, instrument, warn};

use super::{match_outcomes, Executor};
use crate::{
    bundle_tx::{self, HandleOpsTx},
    gas, ExecutorError, ExecutorEvent, TxSenderError,
};

const REPLACEMENT_FEE_PERCENT: u32 = 115;

/// Rejections meaning the operation's nonce was already consumed onchain
const NONCE_CONSUMED_REASONS: [&str; 2] = [
    "AA25 invalid account nonce",
    "AA10 sender already constructed",
];

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider,
    F: FeeEstimator,
    S: BundleSimulator,
    M: Mempool,
{
    /// Resend a stuck transaction with fees raised to 115%, at the same nonce.
    ///
    /// Operations that no longer simulate are dropped from the replacement and listed
    /// in the result. The account lease is kept when the replacement is sent or the
    /// original looks mined, and released on every other outcome.
    #[instrument(
        skip_all,
        fields(tx_hash = ?transaction.transaction_hash, executor = %transaction.executor)
    )]
    pub async fn replace_transaction(
        &self,
        transaction: &TransactionInfo,
    ) -> Result<ReplaceTransactionResult, ExecutorError> {
        let Some(lease) = self.signer_manager.resume_lease(transaction.executor) else {
            warn!("lease no longer held, not replacing");
            return Ok(ReplaceTransactionResult::Failed);
        };

        let prior = &transaction.transaction_request;
        let entry_point = transaction.entry_point;
        let fees = prior.fees.clone().scale(REPLACEMENT_FEE_PERCENT);

        let ops: Vec<UserOperationInfo> = transaction
            .user_operation_infos
            .iter()
            .map(|info| UserOperationInfo {
                hash: info.op.hash(info.entry_point, self.settings.chain_id),
                ..info.clone()
            })
            .collect();
        if bundle_tx::batch_version(entry_point, &ops)?.is_none() {
            warn!("transaction carries no ops");
            return Ok(ReplaceTransactionResult::Failed);
        }

        let request = SimulationRequest {
            entry_point,
            executor: lease.address(),
            ops: ops.clone(),
            nonce: prior.nonce,
            fees: fees.gas_fees(),
            block_tag: self.block_tag(BlockTag::Latest),
            use_legacy_transactions: fees.is_legacy(),
            fixed_gas_limit: self.settings.fixed_gas_limit_for_estimation,
            authorization_list: bundle_tx::authorization_list(&ops),
        };
        let simulation = match self.simulator.filter_ops_and_estimate_gas(request).await {
            Ok(simulation) if !simulation.simulated_ops.is_empty() => simulation,
            Ok(_) => {
                warn!("no ops to bundle");
                return Ok(ReplaceTransactionResult::Failed);
            }
            Err(error) => {
                error!("gas limit simulation failed: {error:#}");
                return Ok(ReplaceTransactionResult::Failed);
            }
        };

        let outcomes = match_outcomes(ops, simulation.simulated_ops)?;
        let (accepted, rejected): (Vec<_>, Vec<_>) = outcomes
            .into_iter()
            .partition(|(_, rejection)| rejection.is_none());
        let accepted: Vec<UserOperationInfo> = accepted.into_iter().map(|(op, _)| op).collect();
        let rejected: Vec<(UserOperationInfo, String)> = rejected
            .into_iter()
            .filter_map(|(op, rejection)| rejection.map(|reason| (op, reason)))
            .collect();

        if accepted.is_empty() {
            if rejected
                .iter()
                .all(|(_, reason)| NONCE_CONSUMED_REASONS.contains(&reason.as_str()))
            {
                debug!("all ops failed simulation with nonce error");
                lease.retain();
                self.metrics.bundle_txns_potentially_included.increment(1);
                return Ok(ReplaceTransactionResult::PotentiallyAlreadyIncluded);
            }
            warn!("all ops failed simulation");
            return Ok(ReplaceTransactionResult::Failed);
        }

        let estimate = if self.settings.local_gas_limit_calculation {
            gas::local_gas_limit(&accepted)
        } else {
            simulation.gas_limit
        };
        let request = BundleTransaction {
            to: prior.to,
            nonce: prior.nonce,
            gas_limit: gas::bundle_gas_limit(estimate, &accepted, Some(prior.gas_limit)),
            fees: TransactionFees::new(
                fees.gas_fees(),
                fees.is_legacy(),
                bundle_tx::authorization_list(&accepted),
            ),
        };
        let tx = HandleOpsTx::new(entry_point, &accepted, lease.address(), true)?;

        info!(
            "replacing transaction with nonce {} carrying {} ops",
            request.nonce,
            accepted.len()
        );

        let sent = match self.send_handle_ops_transaction(&tx, request, &lease).await {
            Ok(sent) => sent,
            Err(TxSenderError::NonceTooLow) => {
                debug!("nonce too low, potentially already included");
                lease.retain();
                self.metrics.bundle_txns_potentially_included.increment(1);
                return Ok(ReplaceTransactionResult::PotentiallyAlreadyIncluded);
            }
            Err(error @ TxSenderError::NoTransactionHash) => return Err(error.into()),
            Err(
                error @ (TxSenderError::FeeCapTooLow
                | TxSenderError::InsufficientFunds
                | TxSenderError::IntrinsicGasTooLow),
            ) => {
                warn!("{error}, not replacing");
                self.metrics.bundle_txns_failed.increment(1);
                return Ok(ReplaceTransactionResult::Failed);
            }
            Err(error) => {
                error!("error replacing transaction: {error:?}");
                self.metrics.bundle_txns_failed.increment(1);
                return Ok(ReplaceTransactionResult::Failed);
            }
        };

        let token = lease.retain();
        let now = SystemTime::now();
        let user_operation_infos: Vec<UserOperationInfo> = accepted
            .into_iter()
            .map(|op| UserOperationInfo {
                last_replaced: now,
                ..op
            })
            .collect();
        for op in &user_operation_infos {
            self.emit(
                entry_point,
                ExecutorEvent::submitted(token.address, op.hash, sent.tx_hash),
            );
        }
        for (op, reason) in &rejected {
            self.emit(
                entry_point,
                ExecutorEvent::rejected_op(token.address, op.hash, reason.clone()),
            );
        }
        self.emit(
            entry_point,
            ExecutorEvent::transaction_replaced(
                token.address,
                sent.tx_hash,
                transaction.transaction_hash,
                sent.request.nonce,
            ),
        );
        self.metrics.bundle_txns_replaced.increment(1);

        let mut previous_transaction_hashes =
            Vec::with_capacity(transaction.previous_transaction_hashes.len() + 1);
        previous_transaction_hashes.push(transaction.transaction_hash);
        previous_transaction_hashes.extend_from_slice(&transaction.previous_transaction_hashes);

        Ok(ReplaceTransactionResult::Replaced {
            transaction: TransactionInfo {
                transaction_hash: sent.tx_hash,
                previous_transaction_hashes,
                transaction_request: sent.request,
                executor: token,
                user_operation_infos,
                last_replaced: now,
                ..transaction.clone()
            },
            rejected,
        })
    }
}
