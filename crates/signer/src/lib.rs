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

#![warn(missing_docs, unreachable_pub, unused_crate_dependencies)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Signing account pool for the Conduit execution engine

use std::{fmt, sync::Arc};

use secrecy::SecretString;

mod error;
pub use error::{Error, Result};

mod local;

mod manager;
use manager::LocalSignerManager;
pub use manager::{sign_tx_raw, DynSigner, SignerLease, SignerManager};

/// Settings for the signing account pool
#[derive(Clone)]
pub struct SignerPoolSettings {
    /// Private keys of the bundle sending accounts
    pub private_keys: Vec<SecretString>,
    /// Private key of the utility account, swept but never leased
    pub utility_private_key: Option<SecretString>,
    /// Chain ID signed transactions are bound to
    pub chain_id: u64,
}

impl fmt::Debug for SignerPoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerPoolSettings")
            .field("private_keys", &self.private_keys.len())
            .field("utility", &self.utility_private_key.is_some())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Create a signer manager from a list of private keys
pub fn new_local_signer_manager(settings: &SignerPoolSettings) -> Result<Arc<dyn SignerManager>> {
    let signers = local::construct_local_signers_from_private_keys(
        &settings.private_keys,
        settings.chain_id,
    )?
    .into_iter()
    .map(|signer| Arc::new(signer) as DynSigner)
    .collect();

    let utility = settings
        .utility_private_key
        .as_ref()
        .map(|key| local::construct_local_signer(key, settings.chain_id))
        .transpose()?
        .map(|signer| Arc::new(signer) as DynSigner);

    Ok(Arc::new(LocalSignerManager::new(signers, utility)))
}

/// Create a signer manager over already constructed signers
pub fn new_signer_manager(
    signers: Vec<DynSigner>,
    utility: Option<DynSigner>,
) -> Arc<dyn SignerManager> {
    Arc::new(LocalSignerManager::new(signers, utility))
}
