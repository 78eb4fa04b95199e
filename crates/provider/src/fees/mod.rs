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

use conduit_types::GasFees;
use conduit_utils::math;
use tokio::try_join;
use tracing::instrument;

use crate::{EvmProvider, FeeEstimator};

/// Create a fee estimator that prices bundles from the node's pending base fee
/// and suggested priority fee.
pub fn new_fee_estimator<P: EvmProvider + 'static>(
    provider: P,
    bundle_base_fee_overhead_percent: u32,
    bundle_priority_fee_overhead_percent: u32,
) -> impl FeeEstimator + 'static {
    FeeEstimatorImpl {
        provider,
        bundle_base_fee_overhead_percent,
        bundle_priority_fee_overhead_percent,
    }
}

struct FeeEstimatorImpl<P> {
    provider: P,
    bundle_base_fee_overhead_percent: u32,
    bundle_priority_fee_overhead_percent: u32,
}

#[async_trait::async_trait]
impl<P: EvmProvider> FeeEstimator for FeeEstimatorImpl<P> {
    #[instrument(skip_all)]
    async fn latest_bundle_fees(&self) -> anyhow::Result<GasFees> {
        let (base_fee, priority_fee) = try_join!(
            self.provider.get_pending_base_fee(),
            self.provider.get_max_priority_fee()
        )?;

        Ok(self.calc_bundle_fees(base_fee, priority_fee))
    }
}

impl<P> FeeEstimatorImpl<P> {
    fn calc_bundle_fees(&self, base_fee: u128, priority_fee: u128) -> GasFees {
        let base_fee = math::increase_by_percent(base_fee, self.bundle_base_fee_overhead_percent);
        let max_priority_fee_per_gas =
            math::increase_by_percent(priority_fee, self.bundle_priority_fee_overhead_percent);

        GasFees {
            max_fee_per_gas: base_fee.saturating_add(max_priority_fee_per_gas),
            max_priority_fee_per_gas,
        }
    }
}
