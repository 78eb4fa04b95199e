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

use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_signer_local::PrivateKeySigner;
use conduit_provider::{MockEvmProvider, MockFeeEstimator};
use conduit_signer::{new_signer_manager, DynSigner, SignerManager};
use conduit_types::{
    executor::UserOperationInfo,
    pool::MockMempool,
    simulation::{
        MockBundleSimulator, SimulatedOp, SimulationOutcome, SimulationRequest, SimulationResult,
    },
    v0_6, v0_7, GasFees, UserOperationVariant,
};
use conduit_utils::emit::{WithEntryPoint, EVENT_CHANNEL_CAPACITY};
use tokio::sync::broadcast;

use super::Executor;
use crate::{sender::tests::rpc_error, ExecutorEvent, ExecutorSettings};

pub(super) const ENTRY_POINT: Address = Address::repeat_byte(0xee);
pub(super) const GWEI: u128 = 1_000_000_000;

pub(super) type TestExecutor =
    Executor<MockEvmProvider, MockFeeEstimator, MockBundleSimulator, MockMempool>;

pub(super) fn op_v0_6(nonce: u64) -> UserOperationVariant {
    v0_6::UserOperation {
        sender: Address::repeat_byte(0x5e),
        nonce: U256::from(nonce),
        call_gas_limit: 100_000,
        verification_gas_limit: 50_000,
        pre_verification_gas: 40_000,
        max_fee_per_gas: 10 * GWEI,
        max_priority_fee_per_gas: GWEI,
        ..Default::default()
    }
    .into()
}

pub(super) fn op_v0_7(nonce: u64) -> UserOperationVariant {
    v0_7::UserOperation {
        sender: Address::repeat_byte(0x5f),
        nonce: U256::from(nonce),
        call_gas_limit: 100_000,
        verification_gas_limit: 50_000,
        pre_verification_gas: 40_000,
        max_fee_per_gas: 10 * GWEI,
        max_priority_fee_per_gas: GWEI,
        ..Default::default()
    }
    .into()
}

pub(super) fn info(op: UserOperationVariant) -> UserOperationInfo {
    UserOperationInfo::new(op, ENTRY_POINT, ExecutorSettings::default().chain_id)
}

pub(super) fn drain_events(
    events: &mut broadcast::Receiver<WithEntryPoint<ExecutorEvent>>,
) -> Vec<ExecutorEvent> {
    let mut drained = vec![];
    while let Ok(event) = events.try_recv() {
        drained.push(event.event);
    }
    drained
}

pub(super) struct Harness {
    pub(super) settings: ExecutorSettings,
    pub(super) provider: MockEvmProvider,
    pub(super) fee_estimator: MockFeeEstimator,
    pub(super) simulator: MockBundleSimulator,
    pub(super) mempool: MockMempool,
    pub(super) signer_manager: Arc<dyn SignerManager>,
    /// Raw transactions passed to `send_raw_transaction`
    pub(super) sent: Arc<Mutex<Vec<Bytes>>>,
}

impl Harness {
    pub(super) fn new(signers: usize) -> Self {
        Self::with_utility(signers, false)
    }

    pub(super) fn with_utility(signers: usize, utility: bool) -> Self {
        let signers = (0..signers)
            .map(|_| Arc::new(PrivateKeySigner::random()) as DynSigner)
            .collect();
        let utility = utility.then(|| Arc::new(PrivateKeySigner::random()) as DynSigner);

        Self {
            settings: ExecutorSettings::default(),
            provider: MockEvmProvider::new(),
            fee_estimator: MockFeeEstimator::new(),
            simulator: MockBundleSimulator::new(),
            mempool: MockMempool::new(),
            signer_manager: new_signer_manager(signers, utility),
            sent: Arc::default(),
        }
    }

    pub(super) fn market_fees(mut self, fees: GasFees) -> Self {
        self.fee_estimator
            .expect_latest_bundle_fees()
            .returning(move || Ok(fees));
        self
    }

    pub(super) fn pending_nonce(mut self, nonce: u64) -> Self {
        self.provider
            .expect_get_pending_transaction_count()
            .returning(move |_| Ok(nonce));
        self
    }

    /// Sends fail with each of `errors` in turn, then succeed
    pub(super) fn sends(mut self, errors: Vec<&'static str>) -> Self {
        let sent = self.sent.clone();
        let mut errors = errors.into_iter();
        self.provider
            .expect_send_raw_transaction()
            .returning(move |tx| {
                let hash = keccak256(&tx);
                sent.lock().unwrap().push(tx);
                match errors.next() {
                    Some(message) => Err(rpc_error(message)),
                    None => Ok(hash),
                }
            });
        self
    }

    /// Simulation accepts every operation `reject` returns no reason for
    pub(super) fn simulation(
        mut self,
        gas_limit: u64,
        reject: impl Fn(&UserOperationInfo) -> Option<String> + Send + 'static,
    ) -> Self {
        self.simulator
            .expect_filter_ops_and_estimate_gas()
            .returning(move |request: SimulationRequest| {
                let simulated_ops = request
                    .ops
                    .into_iter()
                    .map(|op| {
                        let outcome = match reject(&op) {
                            Some(reason) => SimulationOutcome::Rejected { reason },
                            None => SimulationOutcome::Accepted,
                        };
                        SimulatedOp { op, outcome }
                    })
                    .collect();
                Ok(SimulationResult {
                    gas_limit,
                    simulated_ops,
                })
            });
        self
    }

    pub(super) fn build(
        self,
    ) -> (
        TestExecutor,
        broadcast::Receiver<WithEntryPoint<ExecutorEvent>>,
    ) {
        let (event_sender, events) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let executor = Executor::new(
            self.settings,
            self.provider,
            self.fee_estimator,
            self.simulator,
            self.mempool,
            self.signer_manager,
            event_sender,
        );
        (executor, events)
    }
}
