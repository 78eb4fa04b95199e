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

use serde::Deserialize;

/// Settings for the bundle executor
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Chain ID bundle transactions are signed for
    pub chain_id: u64,
    /// Send legacy transactions with a single gas price
    pub legacy_transactions: bool,
    /// Price bundles so the beneficiary fees only cover the transaction cost
    pub no_profit_bundling: bool,
    /// Derive gas limits from the operations' own limits instead of the estimate
    pub local_gas_limit_calculation: bool,
    /// Percent applied to the gas limit before sending
    pub executor_gas_multiplier: u32,
    /// Send fresh v0.6 bundles through the conditional private channel first
    pub enable_private_submission: bool,
    /// Whether the node accepts a block tag on simulation calls
    pub block_tag_support: bool,
    /// Gas limit the simulator estimates with, in place of the block gas limit
    pub fixed_gas_limit_for_estimation: Option<u64>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            chain_id: 1,
            legacy_transactions: false,
            no_profit_bundling: false,
            local_gas_limit_calculation: false,
            executor_gas_multiplier: 100,
            enable_private_submission: false,
            block_tag_support: true,
            fixed_gas_limit_for_estimation: None,
        }
    }
}
