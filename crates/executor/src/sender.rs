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

use std::time::Duration;

use alloy_primitives::{Address, B256};
use conduit_provider::{EvmProvider, ProviderError, TransactionConditional};
use conduit_signer::SignerLease;
use conduit_types::{BundleTransaction, EntryPointVersion};
use conduit_utils::{log::LogOnError, math};
use metrics::Counter;
use metrics_derive::Metrics;
use tracing::{debug, instrument, warn, Level};

use crate::{bundle_tx::HandleOpsTx, ExecutorSettings};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_FEE_PERCENT: u32 = 150;
const RETRY_GAS_LIMIT_PERCENT: u32 = 150;
const BACKEND_UNAVAILABLE_DELAY: Duration = Duration::from_millis(500);

/// Errors from sending a bundle transaction, classified from the node's response
#[derive(Debug, thiserror::Error)]
pub enum TxSenderError {
    /// Fees too low to enter the mempool or to replace a transaction with the same nonce
    #[error("transaction underpriced")]
    Underpriced,
    /// Nonce already used
    #[error("nonce too low")]
    NonceTooLow,
    /// Nonce leaves a gap
    #[error("nonce too high")]
    NonceTooHigh,
    /// Gas limit below the intrinsic cost
    #[error("intrinsic gas too low")]
    IntrinsicGasTooLow,
    /// Sending account cannot pay for the transaction
    #[error("insufficient funds for gas * price + value")]
    InsufficientFunds,
    /// Max fee below the current base fee
    #[error("max fee per gas less than block base fee")]
    FeeCapTooLow,
    /// Load balancer in front of the node had no healthy backend
    #[error("no backends available")]
    BackendUnavailable,
    /// Signing failed
    #[error("failed to sign transaction: {0}")]
    Signer(#[from] conduit_signer::Error),
    /// Every attempt finished without producing a transaction hash
    #[error("submission attempts ended without a transaction hash")]
    NoTransactionHash,
    /// Any other node or transport error
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for TxSenderError {
    fn from(error: ProviderError) -> Self {
        let message = error.message().to_lowercase();

        if message.contains("underpriced") {
            Self::Underpriced
        } else if message.contains("nonce too low") {
            Self::NonceTooLow
        } else if message.contains("nonce too high") {
            Self::NonceTooHigh
        } else if message.contains("intrinsic gas too low") {
            Self::IntrinsicGasTooLow
        } else if message.contains("insufficient funds") {
            Self::InsufficientFunds
        } else if message.contains("fee cap less than block base fee")
            || message.contains("max fee per gas less than block base fee")
        {
            Self::FeeCapTooLow
        } else if message.contains("no backends available") {
            Self::BackendUnavailable
        } else {
            Self::Provider(error)
        }
    }
}

/// How the request changes before the next attempt
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RetryAction {
    BumpFees,
    RefreshNonce,
    BumpGasLimit,
    Backoff,
    Retry,
}

pub(crate) fn classify(error: &TxSenderError) -> RetryAction {
    match error {
        TxSenderError::Underpriced => RetryAction::BumpFees,
        TxSenderError::NonceTooLow | TxSenderError::NonceTooHigh => RetryAction::RefreshNonce,
        TxSenderError::IntrinsicGasTooLow => RetryAction::BumpGasLimit,
        TxSenderError::BackendUnavailable => RetryAction::Backoff,
        _ => RetryAction::Retry,
    }
}

/// Apply `action` to `request`. `pending_nonce` is only read for [`RetryAction::RefreshNonce`].
pub(crate) fn apply(
    mut request: BundleTransaction,
    action: RetryAction,
    pending_nonce: Option<u64>,
) -> BundleTransaction {
    match action {
        RetryAction::BumpFees => request.fees = request.fees.scale(RETRY_FEE_PERCENT),
        RetryAction::RefreshNonce => {
            if let Some(nonce) = pending_nonce {
                request.nonce = nonce;
            }
        }
        RetryAction::BumpGasLimit => {
            request.gas_limit = math::percent_u64(request.gas_limit, RETRY_GAS_LIMIT_PERCENT)
        }
        RetryAction::Backoff | RetryAction::Retry => {}
    }
    request
}

/// A broadcast bundle transaction
#[derive(Clone, Debug)]
pub(crate) struct SentTransaction {
    pub(crate) tx_hash: B256,
    /// The request as it was last sent, with its gas limit before the executor multiplier
    pub(crate) request: BundleTransaction,
    /// The successful attempt followed an underpriced rejection
    pub(crate) was_underpriced: bool,
}

pub(crate) struct TransactionSender<P> {
    provider: P,
    chain_id: u64,
    gas_multiplier_percent: u32,
    enable_private_submission: bool,
    metrics: TransactionSenderMetrics,
}

impl<P: EvmProvider> TransactionSender<P> {
    pub(crate) fn new(provider: P, settings: &ExecutorSettings) -> Self {
        Self {
            provider,
            chain_id: settings.chain_id,
            gas_multiplier_percent: settings.executor_gas_multiplier,
            enable_private_submission: settings.enable_private_submission,
            metrics: TransactionSenderMetrics::default(),
        }
    }

    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    pub(crate) fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign and send `tx` from the leased account, retrying up to three times.
    ///
    /// The gas multiplier is applied to each broadcast only, so a returned request can be
    /// fed back into a replacement without scaling its gas limit twice. The last classified
    /// error is returned once attempts run out.
    #[instrument(skip_all, fields(executor = ?lease.address(), entry_point = ?tx.entry_point))]
    pub(crate) async fn send(
        &self,
        tx: &HandleOpsTx,
        mut request: BundleTransaction,
        lease: &SignerLease,
    ) -> Result<SentTransaction, TxSenderError> {
        let mut was_underpriced = false;
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            let private = attempt == 0
                && self.enable_private_submission
                && tx.version == EntryPointVersion::V0_6
                && !tx.is_replacement;

            match self.send_once(tx, &request, lease, private).await {
                Ok(tx_hash) => {
                    debug!("sent bundle transaction {tx_hash:?} on attempt {attempt}");
                    return Ok(SentTransaction {
                        tx_hash,
                        request,
                        was_underpriced,
                    });
                }
                Err(error) => {
                    was_underpriced = false;
                    self.metrics.send_errors.increment(1);

                    if attempt + 1 < MAX_ATTEMPTS {
                        let action = classify(&error);
                        let pending_nonce = self.prepare_retry(action, lease.address()).await;
                        request = apply(request, action, pending_nonce);
                        was_underpriced = action == RetryAction::BumpFees;
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(TxSenderError::NoTransactionHash))
    }

    async fn send_once(
        &self,
        tx: &HandleOpsTx,
        request: &BundleTransaction,
        lease: &SignerLease,
        private: bool,
    ) -> Result<B256, TxSenderError> {
        let broadcast = BundleTransaction {
            gas_limit: math::percent_u64(request.gas_limit, self.gas_multiplier_percent),
            ..request.clone()
        };
        let unsigned =
            crate::bundle_tx::build_transaction(&broadcast, tx.calldata.clone(), self.chain_id);
        let raw = lease.sign_tx_raw(unsigned).await?;

        let result = if private {
            self.provider
                .send_raw_transaction_conditional(raw, TransactionConditional::default())
                .await
        } else {
            self.provider.send_raw_transaction(raw).await
        };

        result.map_err(|error| {
            warn!("failed to send bundle transaction with nonce {}: {error}", request.nonce);
            TxSenderError::from(error)
        })
    }

    async fn prepare_retry(&self, action: RetryAction, address: Address) -> Option<u64> {
        match action {
            RetryAction::BumpFees => {
                warn!("transaction underpriced, retrying with higher fees");
                self.metrics.underpriced_retries.increment(1);
                None
            }
            RetryAction::RefreshNonce => {
                warn!("nonce out of sync, retrying with the pending nonce");
                self.metrics.nonce_refreshes.increment(1);
                self.provider
                    .get_pending_transaction_count(address)
                    .await
                    .log_on_error_level(Level::WARN, "failed to refresh nonce")
                    .ok()
            }
            RetryAction::BumpGasLimit => {
                warn!("intrinsic gas too low, retrying with a higher gas limit");
                None
            }
            RetryAction::Backoff => {
                warn!(
                    "no backends available, retrying after {}ms",
                    BACKEND_UNAVAILABLE_DELAY.as_millis()
                );
                tokio::time::sleep(BACKEND_UNAVAILABLE_DELAY).await;
                None
            }
            RetryAction::Retry => None,
        }
    }
}

#[derive(Metrics)]
#[metrics(scope = "executor_sender")]
struct TransactionSenderMetrics {
    #[metric(describe = "the count of failed send attempts.")]
    send_errors: Counter,
    #[metric(describe = "the count of retries with bumped fees after an underpriced error.")]
    underpriced_retries: Counter,
    #[metric(describe = "the count of nonce refreshes after a nonce error.")]
    nonce_refreshes: Counter,
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use alloy_consensus::{Transaction, TxEnvelope};
    use alloy_eips::eip2718::Decodable2718;
    use alloy_primitives::{Address, Bytes};
    use alloy_signer_local::PrivateKeySigner;
    use conduit_provider::MockEvmProvider;
    use conduit_signer::{new_signer_manager, DynSigner, SignerManager};
    use conduit_types::{GasFees, TransactionFees};

    use super::*;

    const GWEI: u128 = 1_000_000_000;

    pub(crate) fn decode(raw: &Bytes) -> TxEnvelope {
        TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap()
    }

    pub(crate) fn rpc_error(message: &str) -> ProviderError {
        ProviderError::Rpc {
            code: -32000,
            message: message.to_string(),
        }
    }

    fn handle_ops_tx(version: EntryPointVersion, is_replacement: bool) -> HandleOpsTx {
        HandleOpsTx {
            entry_point: Address::repeat_byte(0xee),
            calldata: Bytes::from(vec![0xaa, 0xbb]),
            version,
            is_replacement,
        }
    }

    fn request() -> BundleTransaction {
        BundleTransaction {
            to: Address::repeat_byte(0xee),
            nonce: 4,
            gas_limit: 100_000,
            fees: TransactionFees::Eip1559(GasFees::new(100 * GWEI, 10 * GWEI)),
        }
    }

    fn signer_manager() -> Arc<dyn SignerManager> {
        new_signer_manager(vec![Arc::new(PrivateKeySigner::random()) as DynSigner], None)
    }

    /// Provider that fails the first sends with `errors`, in order, then succeeds
    fn scripted_provider(
        errors: Vec<&'static str>,
        sent: Arc<Mutex<Vec<Bytes>>>,
    ) -> MockEvmProvider {
        let mut provider = MockEvmProvider::new();
        let mut errors = errors.into_iter();
        provider.expect_send_raw_transaction().returning(move |tx| {
            sent.lock().unwrap().push(tx);
            match errors.next() {
                Some(message) => Err(rpc_error(message)),
                None => Ok(B256::repeat_byte(0x11)),
            }
        });
        provider
    }

    #[test]
    fn test_classify_provider_errors() {
        let cases = [
            ("replacement transaction underpriced", RetryAction::BumpFees),
            ("transaction underpriced", RetryAction::BumpFees),
            ("nonce too low: next nonce 5, tx nonce 4", RetryAction::RefreshNonce),
            ("Nonce too high", RetryAction::RefreshNonce),
            ("intrinsic gas too low", RetryAction::BumpGasLimit),
            ("no backends available for method", RetryAction::Backoff),
            ("execution reverted", RetryAction::Retry),
        ];
        for (message, expected) in cases {
            let error = TxSenderError::from(rpc_error(message));
            assert_eq!(classify(&error), expected, "{message}");
        }

        assert!(matches!(
            TxSenderError::from(rpc_error("insufficient funds for gas * price + value")),
            TxSenderError::InsufficientFunds
        ));
        assert!(matches!(
            TxSenderError::from(rpc_error("max fee per gas less than block base fee")),
            TxSenderError::FeeCapTooLow
        ));
    }

    #[test]
    fn test_apply() {
        let bumped = apply(request(), RetryAction::BumpFees, None);
        assert_eq!(
            bumped.fees.gas_fees(),
            GasFees::new(150 * GWEI, 15 * GWEI)
        );
        assert_eq!(bumped.nonce, 4);

        assert_eq!(apply(request(), RetryAction::RefreshNonce, Some(9)).nonce, 9);
        assert_eq!(apply(request(), RetryAction::RefreshNonce, None).nonce, 4);
        assert_eq!(
            apply(request(), RetryAction::BumpGasLimit, None).gas_limit,
            150_000
        );
        assert_eq!(apply(request(), RetryAction::Retry, None), request());
    }

    #[tokio::test]
    async fn test_underpriced_bumps_fees_on_same_nonce() {
        let sent = Arc::new(Mutex::new(vec![]));
        let provider =
            scripted_provider(vec!["replacement transaction underpriced"], sent.clone());
        let sender = TransactionSender::new(provider, &ExecutorSettings::default());
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await
            .unwrap();
        assert!(result.was_underpriced);
        assert_eq!(result.tx_hash, B256::repeat_byte(0x11));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        let (first, second) = (decode(&sent[0]), decode(&sent[1]));
        assert_eq!(first.nonce(), second.nonce());
        assert_eq!(second.max_fee_per_gas(), first.max_fee_per_gas() * 3 / 2);
        assert_eq!(
            second.max_priority_fee_per_gas(),
            first.max_priority_fee_per_gas().map(|fee| fee * 3 / 2)
        );
        assert_eq!(result.request.fees.gas_fees().max_fee_per_gas, 150 * GWEI);
    }

    #[tokio::test]
    async fn test_underpriced_flag_cleared_by_later_failure() {
        let sent = Arc::new(Mutex::new(vec![]));
        let provider = scripted_provider(
            vec!["transaction underpriced", "execution reverted"],
            sent.clone(),
        );
        let sender = TransactionSender::new(provider, &ExecutorSettings::default());
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await
            .unwrap();
        assert!(!result.was_underpriced);
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_nonce_refreshed_from_pending_count() {
        let sent = Arc::new(Mutex::new(vec![]));
        let mut provider = scripted_provider(vec!["nonce too low"], sent.clone());
        provider
            .expect_get_pending_transaction_count()
            .times(1)
            .returning(|_| Ok(12));
        let sender = TransactionSender::new(provider, &ExecutorSettings::default());
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await
            .unwrap();
        assert_eq!(result.request.nonce, 12);
        assert_eq!(decode(&sent.lock().unwrap()[1]).nonce(), 12);
    }

    #[tokio::test]
    async fn test_gas_multiplier_and_intrinsic_gas_bump() {
        let sent = Arc::new(Mutex::new(vec![]));
        let provider = scripted_provider(vec!["intrinsic gas too low"], sent.clone());
        let settings = ExecutorSettings {
            executor_gas_multiplier: 120,
            ..Default::default()
        };
        let sender = TransactionSender::new(provider, &settings);
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(decode(&sent[0]).gas_limit(), 120_000);
        assert_eq!(decode(&sent[1]).gas_limit(), 180_000);
        assert_eq!(result.request.gas_limit, 150_000);
    }

    #[tokio::test]
    async fn test_last_error_returned_after_three_attempts() {
        let sent = Arc::new(Mutex::new(vec![]));
        let provider = scripted_provider(
            vec!["execution reverted", "execution reverted", "insufficient funds"],
            sent.clone(),
        );
        let sender = TransactionSender::new(provider, &ExecutorSettings::default());
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await;
        assert!(matches!(result, Err(TxSenderError::InsufficientFunds)));
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_backend_unavailable_retries_unchanged() {
        let sent = Arc::new(Mutex::new(vec![]));
        let provider =
            scripted_provider(vec!["no backends available for method"], sent.clone());
        let sender = TransactionSender::new(provider, &ExecutorSettings::default());
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        sender
            .send(&handle_ops_tx(EntryPointVersion::V0_7, false), request(), &lease)
            .await
            .unwrap();
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0], sent[1]);
    }

    #[tokio::test]
    async fn test_private_channel_first_attempt_only() {
        let settings = ExecutorSettings {
            enable_private_submission: true,
            ..Default::default()
        };
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        let mut provider = MockEvmProvider::new();
        provider
            .expect_send_raw_transaction_conditional()
            .times(1)
            .returning(|_, _| Err(rpc_error("method not found")));
        provider
            .expect_send_raw_transaction()
            .times(1)
            .returning(|_| Ok(B256::repeat_byte(2)));
        let sender = TransactionSender::new(provider, &settings);
        let result = sender
            .send(&handle_ops_tx(EntryPointVersion::V0_6, false), request(), &lease)
            .await
            .unwrap();
        assert_eq!(result.tx_hash, B256::repeat_byte(2));
    }

    #[tokio::test]
    async fn test_private_channel_skipped() {
        let settings = ExecutorSettings {
            enable_private_submission: true,
            ..Default::default()
        };
        let manager = signer_manager();
        let lease = manager.lease_signer().unwrap();

        for tx in [
            handle_ops_tx(EntryPointVersion::V0_7, false),
            handle_ops_tx(EntryPointVersion::V0_6, true),
        ] {
            let mut provider = MockEvmProvider::new();
            provider.expect_send_raw_transaction_conditional().never();
            provider
                .expect_send_raw_transaction()
                .times(1)
                .returning(|_| Ok(B256::repeat_byte(3)));
            let sender = TransactionSender::new(provider, &settings);
            sender.send(&tx, request(), &lease).await.unwrap();
        }
    }
}
