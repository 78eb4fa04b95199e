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

use std::{sync::Arc, time::SystemTime};

use alloy_primitives::{Address, U256};
use conduit_provider::{EvmProvider, FeeEstimator};
use conduit_types::{
    executor::{BundleResult, TransactionInfo, UserOperationInfo},
    pool::Mempool,
    simulation::{BlockTag, BundleSimulator, SimulationRequest},
    BundleTransaction, GasFees, TransactionFees, UserOperationVariant,
};
use tracing::{error, field, info, instrument, warn, Span};

use super::{match_outcomes, Executor};
use crate::{
    bundle_tx::{self, HandleOpsTx},
    gas, ExecutorError, ExecutorEvent, TxSenderError,
};

const INTERNAL_FAILURE: &str = "INTERNAL FAILURE";
const NO_EXECUTOR_AVAILABLE: &str = "no executor account available";
const PARAMETERS_UNAVAILABLE: &str = "failed to get parameters for bundling";
const INSUFFICIENT_FUNDS: &str = "insufficient funds";

impl<P, F, S, M> Executor<P, F, S, M>
where
    P: EvmProvider,
    F: FeeEstimator,
    S: BundleSimulator,
    M: Mempool,
{
    /// Bundle `ops` into one `handleOps` transaction and send it.
    ///
    /// Every operation gets exactly one result. On success the sending account stays
    /// leased by the returned transaction until [`Self::mark_wallet_processed`] is called.
    /// An error is returned only when the batch mixes entry point versions or the
    /// simulator loses track of an operation.
    #[instrument(skip_all, fields(entry_point = ?entry_point, ops = ops.len(), executor))]
    pub async fn bundle(
        &self,
        entry_point: Address,
        ops: Vec<UserOperationVariant>,
    ) -> Result<Vec<BundleResult>, ExecutorError> {
        let ops: Vec<UserOperationInfo> = ops
            .into_iter()
            .map(|op| UserOperationInfo::new(op, entry_point, self.settings.chain_id))
            .collect();
        if bundle_tx::batch_version(entry_point, &ops)?.is_none() {
            return Ok(vec![]);
        }

        let Some(lease) = self.signer_manager.lease_signer() else {
            warn!("no executor account available, resubmitting {} ops", ops.len());
            return Ok(self.resubmit_all(ops, NO_EXECUTOR_AVAILABLE));
        };
        let executor = lease.address();
        Span::current().record("executor", field::debug(executor));

        let nonce = async {
            self.sender
                .provider()
                .get_pending_transaction_count(executor)
                .await
                .map_err(anyhow::Error::from)
        };
        let (market_fees, nonce) =
            match tokio::try_join!(self.fee_estimator.latest_bundle_fees(), nonce) {
                Ok(parameters) => parameters,
                Err(error) => {
                    error!("{PARAMETERS_UNAVAILABLE}: {error:#}");
                    return Ok(self.resubmit_all(ops, PARAMETERS_UNAVAILABLE));
                }
            };

        let request = SimulationRequest {
            entry_point,
            executor,
            ops: ops.clone(),
            nonce,
            fees: market_fees,
            block_tag: self.block_tag(BlockTag::Pending),
            use_legacy_transactions: self.settings.legacy_transactions,
            fixed_gas_limit: self.settings.fixed_gas_limit_for_estimation,
            authorization_list: bundle_tx::authorization_list(&ops),
        };
        let simulation = match self.simulator.filter_ops_and_estimate_gas(request).await {
            Ok(simulation) if !simulation.simulated_ops.is_empty() => simulation,
            Ok(_) => {
                error!("gas limit simulation returned no results");
                return Ok(fail_all(ops, INTERNAL_FAILURE));
            }
            Err(error) => {
                error!("gas limit simulation failed: {error:#}");
                return Ok(fail_all(ops, INTERNAL_FAILURE));
            }
        };

        let outcomes = match_outcomes(ops, simulation.simulated_ops)?;
        let accepted: Vec<UserOperationInfo> = outcomes
            .iter()
            .filter(|(_, rejection)| rejection.is_none())
            .map(|(op, _)| op.clone())
            .collect();

        if accepted.is_empty() {
            warn!("all ops failed simulation");
            return Ok(outcomes
                .into_iter()
                .map(|(op, rejection)| {
                    let reason = rejection.unwrap_or_default();
                    self.emit(
                        entry_point,
                        ExecutorEvent::rejected_op(executor, op.hash, reason.clone()),
                    );
                    BundleResult::Failed {
                        op,
                        reason,
                        rejection: None,
                    }
                })
                .collect());
        }

        let estimate = if self.settings.local_gas_limit_calculation {
            gas::local_gas_limit(&accepted)
        } else {
            simulation.gas_limit
        };
        let gas_limit = gas::bundle_gas_limit(estimate, &accepted, None);
        let fees = if self.settings.no_profit_bundling {
            self.no_profit_fees(market_fees, &accepted, gas_limit)
        } else {
            market_fees
        };

        let request = BundleTransaction {
            to: entry_point,
            nonce,
            gas_limit,
            fees: TransactionFees::new(
                fees,
                self.settings.legacy_transactions,
                bundle_tx::authorization_list(&accepted),
            ),
        };
        let tx = HandleOpsTx::new(entry_point, &accepted, executor, false)?;

        let sent = match self.send_handle_ops_transaction(&tx, request, &lease).await {
            Ok(sent) => sent,
            Err(TxSenderError::InsufficientFunds) => {
                error!("insufficient funds, not submitting transaction");
                self.metrics.bundle_txns_failed.increment(1);
                self.metrics.ops_resubmitted.increment(accepted.len() as u64);
                return Ok(outcomes
                    .into_iter()
                    .map(|(op, rejection)| match rejection {
                        None => BundleResult::Resubmit {
                            op,
                            reason: INSUFFICIENT_FUNDS.to_string(),
                        },
                        Some(reason) => BundleResult::Failed {
                            op,
                            reason,
                            rejection: None,
                        },
                    })
                    .collect());
            }
            Err(error @ TxSenderError::NoTransactionHash) => return Err(error.into()),
            Err(error) => {
                error!("error submitting bundle transaction: {error:?}");
                self.metrics.bundle_txns_failed.increment(1);
                return Ok(outcomes
                    .into_iter()
                    .map(|(op, rejection)| BundleResult::Failed {
                        op,
                        reason: INTERNAL_FAILURE.to_string(),
                        rejection,
                    })
                    .collect());
            }
        };

        let token = lease.retain();
        let now = SystemTime::now();
        let user_operation_infos: Vec<UserOperationInfo> = accepted
            .into_iter()
            .map(|op| UserOperationInfo {
                first_submitted: now,
                last_replaced: now,
                ..op
            })
            .collect();
        for op in &user_operation_infos {
            self.emit(
                entry_point,
                ExecutorEvent::submitted(executor, op.hash, sent.tx_hash),
            );
        }

        info!(
            "submitted bundle transaction {:?} with nonce {} carrying {} ops",
            sent.tx_hash,
            sent.request.nonce,
            user_operation_infos.len()
        );
        self.metrics.bundle_txns_sent.increment(1);

        let transaction = Arc::new(TransactionInfo {
            entry_point,
            transaction_hash: sent.tx_hash,
            previous_transaction_hashes: vec![],
            transaction_request: sent.request,
            executor: token,
            user_operation_infos,
            first_submitted: now,
            last_replaced: now,
            times_potentially_included: 0,
        });

        Ok(outcomes
            .into_iter()
            .map(|(op, rejection)| match rejection {
                None => BundleResult::Bundled {
                    op,
                    transaction: Arc::clone(&transaction),
                },
                Some(reason) => {
                    self.emit(
                        entry_point,
                        ExecutorEvent::rejected_op(executor, op.hash, reason.clone()),
                    );
                    BundleResult::Failed {
                        op,
                        reason,
                        rejection: None,
                    }
                }
            })
            .collect())
    }

    /// Fees where the beneficiary only recovers what the operations prefund
    fn no_profit_fees(
        &self,
        market_fees: GasFees,
        ops: &[UserOperationInfo],
        gas_limit: u64,
    ) -> GasFees {
        let total_prefund = ops.iter().fold(U256::ZERO, |total, info| {
            total.saturating_add(info.op.required_prefund())
        });
        let price = total_prefund / U256::from(gas_limit.max(1));
        let price = u128::try_from(price).unwrap_or(u128::MAX);

        if self.settings.legacy_transactions {
            GasFees::new(price, price)
        } else {
            GasFees {
                max_fee_per_gas: price.max(market_fees.max_fee_per_gas),
                ..market_fees
            }
        }
    }

    fn resubmit_all(&self, ops: Vec<UserOperationInfo>, reason: &str) -> Vec<BundleResult> {
        self.metrics.ops_resubmitted.increment(ops.len() as u64);
        ops.into_iter()
            .map(|op| BundleResult::Resubmit {
                op,
                reason: reason.to_string(),
            })
            .collect()
    }
}

fn fail_all(ops: Vec<UserOperationInfo>, reason: &str) -> Vec<BundleResult> {
    ops.into_iter()
        .map(|op| BundleResult::Failed {
            op,
            reason: reason.to_string(),
            rejection: None,
        })
        .collect()
}
