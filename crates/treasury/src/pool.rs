//! Custodial pool for treasury assets.
//!
//! A pool holds assorted tokens (and native currency) at its own ledger
//! address. Funds only leave through `withdraw_funds`, callable by
//! strategies on the admin-managed authorization list and only while the
//! pool is unpaused.

use alloy::primitives::{Address, U256};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use kyberdao_core::{AccessControl, AccessError};

use crate::ledger::{LedgerError, TokenLedger};

/// Pool failures.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("paused")]
    Paused,
    #[error("only authorized strategy")]
    OnlyAuthorizedStrategy,
    #[error("only unauthorized strategy")]
    OnlyUnauthorizedStrategy,
    #[error("invalid lengths")]
    InvalidLengths,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Asset custody with an authorized-strategy withdraw path.
pub struct Pool {
    address: Address,
    access: AccessControl,
    ledger: Arc<TokenLedger>,
    authorized_strategies: RwLock<BTreeSet<Address>>,
    paused: AtomicBool,
}

impl Pool {
    pub fn new(address: Address, admin: Address, ledger: Arc<TokenLedger>) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
            ledger,
            authorized_strategies: RwLock::new(BTreeSet::new()),
            paused: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_authorized_strategy(&self, strategy: Address) -> bool {
        self.authorized_strategies.read().contains(&strategy)
    }

    pub fn authorized_strategies(&self) -> Vec<Address> {
        self.authorized_strategies.read().iter().copied().collect()
    }

    /// Authorize strategies. Every entry must currently be unauthorized;
    /// nothing is applied when any entry fails.
    pub fn authorize_strategies(
        &self,
        caller: Address,
        strategies: &[Address],
    ) -> Result<(), PoolError> {
        self.access.check_admin(caller)?;
        let mut authorized = self.authorized_strategies.write();
        if strategies.iter().any(|s| authorized.contains(s)) {
            return Err(PoolError::OnlyUnauthorizedStrategy);
        }
        for strategy in strategies {
            authorized.insert(*strategy);
            info!(pool = %self.address, strategy = %strategy, "Strategy authorized");
        }
        Ok(())
    }

    /// Revoke strategies. Every entry must currently be authorized; nothing
    /// is applied when any entry fails.
    pub fn unauthorize_strategies(
        &self,
        caller: Address,
        strategies: &[Address],
    ) -> Result<(), PoolError> {
        self.access.check_admin(caller)?;
        let mut authorized = self.authorized_strategies.write();
        if strategies.iter().any(|s| !authorized.contains(s)) {
            return Err(PoolError::OnlyAuthorizedStrategy);
        }
        for strategy in strategies {
            authorized.remove(strategy);
            info!(pool = %self.address, strategy = %strategy, "Strategy unauthorized");
        }
        Ok(())
    }

    /// Operators may pause, only the admin unpauses.
    pub fn pause(&self, caller: Address) -> Result<(), PoolError> {
        self.access.check_operator(caller)?;
        self.paused.store(true, Ordering::SeqCst);
        info!(pool = %self.address, "Pool paused");
        Ok(())
    }

    pub fn unpause(&self, caller: Address) -> Result<(), PoolError> {
        self.access.check_admin(caller)?;
        self.paused.store(false, Ordering::SeqCst);
        info!(pool = %self.address, "Pool unpaused");
        Ok(())
    }

    /// Move `assets[i] : amounts[i]` from the pool to `recipient`.
    ///
    /// Callable only by an authorized strategy while unpaused. Ledger
    /// failures (insufficient balance, refused native transfer) propagate
    /// unchanged.
    pub fn withdraw_funds(
        &self,
        caller: Address,
        assets: &[Address],
        amounts: &[U256],
        recipient: Address,
    ) -> Result<(), PoolError> {
        if !self.is_authorized_strategy(caller) {
            return Err(PoolError::OnlyAuthorizedStrategy);
        }
        if self.is_paused() {
            return Err(PoolError::Paused);
        }
        if assets.len() != amounts.len() {
            return Err(PoolError::InvalidLengths);
        }
        for (asset, amount) in assets.iter().zip(amounts) {
            self.ledger
                .transfer(*asset, self.address, recipient, *amount)?;
        }
        info!(
            pool = %self.address,
            recipient = %recipient,
            assets = assets.len(),
            "Funds withdrawn"
        );
        Ok(())
    }
}
