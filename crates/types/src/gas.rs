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

use conduit_utils::math;
use serde::{Deserialize, Serialize};

/// Gas fees for a transaction or user operation
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: u128,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: u128,
}

impl GasFees {
    /// Create fees from their two components
    pub fn new(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        Self {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }

    /// Scale both fees to `percent` percent of their value
    pub fn scale(self, percent: u32) -> Self {
        Self {
            max_fee_per_gas: math::percent(self.max_fee_per_gas, percent),
            max_priority_fee_per_gas: math::percent(self.max_priority_fee_per_gas, percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u128 = 1_000_000_000;

    #[test]
    fn test_scale() {
        let fees = GasFees::new(100 * GWEI, 10 * GWEI);
        assert_eq!(fees.scale(115), GasFees::new(115 * GWEI, 11_500_000_000));
        assert_eq!(fees.scale(150), GasFees::new(150 * GWEI, 15 * GWEI));
    }
}
