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
#[cfg(feature = "test-utils")]
use mockall::automock;

/// Trait for a fee estimator.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait FeeEstimator: Send + Sync {
    /// Returns the current network fees for a bundle, with bundler overhead applied.
    async fn latest_bundle_fees(&self) -> anyhow::Result<GasFees>;
}
