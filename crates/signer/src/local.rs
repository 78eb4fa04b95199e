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

use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};

use crate::Result;

pub(crate) fn construct_local_signer(
    private_key: &SecretString,
    chain_id: u64,
) -> Result<PrivateKeySigner> {
    Ok(private_key
        .expose_secret()
        .parse::<PrivateKeySigner>()
        .context("failed to parse private key signer")?
        .with_chain_id(Some(chain_id)))
}

pub(crate) fn construct_local_signers_from_private_keys(
    private_keys: &[SecretString],
    chain_id: u64,
) -> Result<Vec<PrivateKeySigner>> {
    private_keys
        .iter()
        .map(|private_key| construct_local_signer(private_key, chain_id))
        .collect()
}
