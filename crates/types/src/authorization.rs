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

use alloy_eips::eip7702::{Authorization, SignedAuthorization};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A signed EIP-7702 delegation carried by a user operation
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Eip7702Auth {
    /// The chain ID of the authorization.
    pub chain_id: u64,
    /// The delegate contract address.
    pub address: Address,
    /// The nonce for the authorization.
    pub nonce: u64,
    /// Signature parity
    pub y_parity: u8,
    /// Signature r
    pub r: U256,
    /// Signature s
    pub s: U256,
}

impl From<Eip7702Auth> for SignedAuthorization {
    fn from(value: Eip7702Auth) -> Self {
        let authorization = Authorization {
            chain_id: U256::from(value.chain_id),
            address: value.address,
            nonce: value.nonce,
        };

        SignedAuthorization::new_unchecked(authorization, value.y_parity, value.r, value.s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_signed_authorization() {
        let auth = Eip7702Auth {
            chain_id: 10,
            address: Address::repeat_byte(7),
            nonce: 4,
            y_parity: 1,
            r: U256::from(11),
            s: U256::from(12),
        };
        let signed = SignedAuthorization::from(auth);

        assert_eq!(signed.chain_id, U256::from(10));
        assert_eq!(signed.address, Address::repeat_byte(7));
        assert_eq!(signed.nonce, 4);
        assert_eq!(signed.y_parity(), 1);
        assert_eq!(signed.r(), U256::from(11));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let auth: Eip7702Auth = serde_json::from_str(
            r#"{"chainId":1,"address":"0x0000000000000000000000000000000000000001","nonce":0,"yParity":0,"r":"0x1","s":"0x2"}"#,
        )
        .unwrap();
        assert_eq!(auth.chain_id, 1);
        assert_eq!(auth.s, U256::from(2));
    }
}
