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

//! Fixed point percentage math used for fee and gas bumps.
//!
//! All percentages are whole numbers where `100` leaves the value unchanged.
//! Results saturate instead of overflowing.

/// Take `percent` percent of `n`, rounding down.
pub fn percent(n: u128, percent: u32) -> u128 {
    n.saturating_mul(u128::from(percent)) / 100
}

/// Increase `n` by `percent` percent, rounding down.
pub fn increase_by_percent(n: u128, percent: u32) -> u128 {
    self::percent(n, percent.saturating_add(100))
}

/// Take `percent` percent of a gas amount, saturating at `u64::MAX`.
pub fn percent_u64(n: u64, percent: u32) -> u64 {
    u64::try_from(self::percent(u128::from(n), percent)).unwrap_or(u64::MAX)
}
