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

//! The shape of a bundle transaction before it is encoded and signed

use alloy_primitives::Address;
use conduit_utils::math;

use crate::{authorization::Eip7702Auth, GasFees};

/// Fee fields of a bundle transaction, one variant per transaction type
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransactionFees {
    /// Legacy transaction with a single gas price
    Legacy {
        /// Gas price
        gas_price: u128,
    },
    /// EIP-1559 transaction
    Eip1559(GasFees),
    /// EIP-7702 transaction carrying delegation authorizations
    Eip7702 {
        /// EIP-1559 style fees
        fees: GasFees,
        /// Authorizations attached to the transaction
        authorization_list: Vec<Eip7702Auth>,
    },
}

impl TransactionFees {
    /// Build fees for the given transaction type.
    ///
    /// A non-empty `authorization_list` always produces an EIP-7702 transaction.
    pub fn new(fees: GasFees, legacy: bool, authorization_list: Vec<Eip7702Auth>) -> Self {
        if !authorization_list.is_empty() {
            Self::Eip7702 {
                fees,
                authorization_list,
            }
        } else if legacy {
            Self::Legacy {
                gas_price: fees.max_fee_per_gas,
            }
        } else {
            Self::Eip1559(fees)
        }
    }

    /// The fee fields as [`GasFees`]. Legacy transactions report their gas price for both.
    pub fn gas_fees(&self) -> GasFees {
        match self {
            Self::Legacy { gas_price } => GasFees::new(*gas_price, *gas_price),
            Self::Eip1559(fees) | Self::Eip7702 { fees, .. } => *fees,
        }
    }

    /// Scale every fee field to `percent` percent
    pub fn scale(self, percent: u32) -> Self {
        match self {
            Self::Legacy { gas_price } => Self::Legacy {
                gas_price: math::percent(gas_price, percent),
            },
            Self::Eip1559(fees) => Self::Eip1559(fees.scale(percent)),
            Self::Eip7702 {
                fees,
                authorization_list,
            } => Self::Eip7702 {
                fees: fees.scale(percent),
                authorization_list,
            },
        }
    }

    /// Whether this is a legacy transaction
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

}

/// Parameters of a bundle transaction, excluding its call data.
///
/// Call data is re-encoded from the carried operations every time the
/// transaction is sent, so only the fields needed to reproduce or replace
/// it are kept.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BundleTransaction {
    /// Destination, always the entry point
    pub to: Address,
    /// Nonce of the sending account
    pub nonce: u64,
    /// Gas limit
    pub gas_limit: u64,
    /// Fee fields
    pub fees: TransactionFees,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_selects_type() {
        let fees = GasFees::new(10, 2);
        assert!(TransactionFees::new(fees, true, vec![]).is_legacy());
        assert_eq!(
            TransactionFees::new(fees, false, vec![]),
            TransactionFees::Eip1559(fees)
        );
        let with_auth = TransactionFees::new(fees, true, vec![Eip7702Auth::default()]);
        assert!(matches!(
            &with_auth,
            TransactionFees::Eip7702 { authorization_list, .. } if authorization_list.len() == 1
        ));
        assert_eq!(with_auth.gas_fees(), fees);
    }

    #[test]
    fn test_scale_keeps_type() {
        let legacy = TransactionFees::Legacy { gas_price: 100 }.scale(150);
        assert_eq!(legacy, TransactionFees::Legacy { gas_price: 150 });
        assert_eq!(legacy.gas_fees(), GasFees::new(150, 150));

        let eip7702 = TransactionFees::Eip7702 {
            fees: GasFees::new(100, 10),
            authorization_list: vec![Eip7702Auth::default()],
        }
        .scale(115);
        assert_eq!(
            eip7702,
            TransactionFees::Eip7702 {
                fees: GasFees::new(115, 11),
                authorization_list: vec![Eip7702Auth::default()],
            }
        );
    }
}
