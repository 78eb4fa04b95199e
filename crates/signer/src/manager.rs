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

use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};

use alloy_consensus::{SignableTransaction, TxEnvelope, TypedTransaction};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSigner;
use alloy_primitives::{Address, Bytes, Signature};
use conduit_types::executor::LeaseToken;
use metrics::Gauge;
use metrics_derive::Metrics;
use parking_lot::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// A transaction signer shared between the pool and its leases
pub type DynSigner = Arc<dyn TxSigner<Signature> + Send + Sync + 'static>;

/// Trait for a signer manager
///
/// Hands out exclusive leases on signing accounts. An account is leased by at
/// most one bundle at a time, so its nonce is only ever driven by one attempt.
pub trait SignerManager: Send + Sync {
    /// Get the addresses of the leasable signers
    fn addresses(&self) -> Vec<Address>;

    /// Address of the utility account, if configured. It is never leased.
    fn utility_address(&self) -> Option<Address>;

    /// Get the number of available signers
    fn available(&self) -> usize;

    /// Lease an available signer
    fn lease_signer(&self) -> Option<SignerLease>;

    /// Get a guard for a lease that is still held by `token`.
    ///
    /// Returns `None` if the lease has since been released.
    fn resume_lease(&self, token: LeaseToken) -> Option<SignerLease>;

    /// Release the lease identified by `token`.
    ///
    /// Returns false, and does nothing, if that lease was already released.
    fn release(&self, token: LeaseToken) -> bool;

    /// Get the signer for any managed address, leased or not
    fn signer(&self, address: &Address) -> Option<DynSigner>;
}

/// A leased signer.
///
/// The lease is released when the guard is dropped, unless [`SignerLease::retain`]
/// hands it over to a live transaction first.
pub struct SignerLease {
    token: LeaseToken,
    signer: DynSigner,
    pool: Arc<SignerPool>,
    retained: bool,
}

impl Debug for SignerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lease {{ token: {} }}", self.token)
    }
}

impl SignerLease {
    /// Get the address of the signer
    pub fn address(&self) -> Address {
        self.token.address
    }

    /// The token identifying this lease
    pub fn token(&self) -> LeaseToken {
        self.token
    }

    /// Sign a transaction and return the raw bytes
    pub async fn sign_tx_raw(&self, tx: TypedTransaction) -> Result<Bytes> {
        sign_tx_raw(self.signer.as_ref(), tx).await
    }

    /// Keep the lease past this guard, returning the token needed to release it later
    pub fn retain(mut self) -> LeaseToken {
        self.retained = true;
        self.token
    }
}

impl Drop for SignerLease {
    fn drop(&mut self) {
        if !self.retained {
            self.pool.release(self.token);
        }
    }
}

/// Sign a transaction with `signer` and return its EIP-2718 encoding
pub async fn sign_tx_raw(
    signer: &(dyn TxSigner<Signature> + Send + Sync),
    tx: TypedTransaction,
) -> Result<Bytes> {
    let tx_envelope: TxEnvelope = match tx {
        TypedTransaction::Legacy(mut t) => {
            let sig = signer.sign_transaction(&mut t).await?;
            t.into_signed(sig).into()
        }
        TypedTransaction::Eip1559(mut t) => {
            let sig = signer.sign_transaction(&mut t).await?;
            t.into_signed(sig).into()
        }
        TypedTransaction::Eip7702(mut t) => {
            let sig = signer.sign_transaction(&mut t).await?;
            t.into_signed(sig).into()
        }
        other => {
            return Err(Error::InvalidTransaction(format!(
                "unsupported transaction type {:?}",
                other.tx_type()
            )))
        }
    };

    Ok(tx_envelope.encoded_2718().into())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SignerStatus {
    Available,
    Leased(u64),
}

#[derive(Default)]
struct PoolState {
    order: Vec<Address>,
    statuses: HashMap<Address, SignerStatus>,
    next_lease_id: u64,
}

impl PoolState {
    fn count(&self, leased: bool) -> usize {
        self.statuses
            .values()
            .filter(|status| matches!(status, SignerStatus::Leased(_)) == leased)
            .count()
    }
}

/// Lease bookkeeping shared by the manager and every outstanding guard
pub(crate) struct SignerPool {
    state: RwLock<PoolState>,
    metrics: SignerMetrics,
}

impl SignerPool {
    fn new(addresses: Vec<Address>) -> Self {
        let statuses = addresses
            .iter()
            .map(|address| (*address, SignerStatus::Available))
            .collect();
        let pool = Self {
            state: RwLock::new(PoolState {
                order: addresses,
                statuses,
                next_lease_id: 0,
            }),
            metrics: SignerMetrics::default(),
        };
        pool.update_metrics(&pool.state.read());
        pool
    }

    fn acquire(&self) -> Option<LeaseToken> {
        let mut state = self.state.write();
        let address = state
            .order
            .iter()
            .copied()
            .find(|address| state.statuses.get(address) == Some(&SignerStatus::Available))?;

        let id = state.next_lease_id;
        state.next_lease_id += 1;
        state.statuses.insert(address, SignerStatus::Leased(id));
        self.update_metrics(&state);

        Some(LeaseToken { address, id })
    }

    fn is_held(&self, token: LeaseToken) -> bool {
        self.state.read().statuses.get(&token.address) == Some(&SignerStatus::Leased(token.id))
    }

    fn release(&self, token: LeaseToken) -> bool {
        let mut state = self.state.write();
        let Some(status) = state.statuses.get_mut(&token.address) else {
            return false;
        };
        if *status != SignerStatus::Leased(token.id) {
            debug!("lease {token} already released");
            return false;
        }
        *status = SignerStatus::Available;
        self.update_metrics(&state);
        true
    }

    fn available(&self) -> usize {
        self.state.read().count(false)
    }

    fn update_metrics(&self, state: &PoolState) {
        self.metrics.available_signers.set(state.count(false) as f64);
        self.metrics.leased_signers.set(state.count(true) as f64);
    }
}

/// Signer manager over a fixed set of in-process signers
pub(crate) struct LocalSignerManager {
    signers: HashMap<Address, DynSigner>,
    addresses: Vec<Address>,
    utility: Option<(Address, DynSigner)>,
    pool: Arc<SignerPool>,
}

impl LocalSignerManager {
    pub(crate) fn new(signers: Vec<DynSigner>, utility: Option<DynSigner>) -> Self {
        let addresses: Vec<Address> = signers.iter().map(|signer| signer.address()).collect();
        let signers = addresses.iter().copied().zip(signers).collect();
        Self {
            signers,
            pool: Arc::new(SignerPool::new(addresses.clone())),
            addresses,
            utility: utility.map(|signer| (signer.address(), signer)),
        }
    }

    fn guard(&self, token: LeaseToken) -> Option<SignerLease> {
        let signer = self.signers.get(&token.address)?.clone();
        Some(SignerLease {
            token,
            signer,
            pool: self.pool.clone(),
            retained: false,
        })
    }
}

impl SignerManager for LocalSignerManager {
    fn addresses(&self) -> Vec<Address> {
        self.addresses.clone()
    }

    fn utility_address(&self) -> Option<Address> {
        self.utility.as_ref().map(|(address, _)| *address)
    }

    fn available(&self) -> usize {
        self.pool.available()
    }

    fn lease_signer(&self) -> Option<SignerLease> {
        let token = self.pool.acquire()?;
        self.guard(token)
    }

    fn resume_lease(&self, token: LeaseToken) -> Option<SignerLease> {
        if !self.pool.is_held(token) {
            return None;
        }
        self.guard(token)
    }

    fn release(&self, token: LeaseToken) -> bool {
        self.pool.release(token)
    }

    fn signer(&self, address: &Address) -> Option<DynSigner> {
        match &self.utility {
            Some((utility, signer)) if utility == address => Some(signer.clone()),
            _ => self.signers.get(address).cloned(),
        }
    }
}

#[derive(Metrics)]
#[metrics(scope = "signer")]
struct SignerMetrics {
    #[metric(describe = "the number of signers available for lease")]
    available_signers: Gauge,
    #[metric(describe = "the number of signers currently leased")]
    leased_signers: Gauge,
}
