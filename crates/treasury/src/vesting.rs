//! Linear vesting of liquidation proceeds.
//!
//! Operators lock reward tokens for an account; each lock vests linearly
//! over the token's configured duration. `vest` releases the proportional
//! elapsed amount of every active schedule, clamped to the locked quantity.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use kyberdao_core::{AccessControl, AccessError};

use crate::ledger::{LedgerError, TokenLedger};

/// Vesting failures.
#[derive(Debug, thiserror::Error)]
pub enum VestingError {
    #[error("vesting duration not set")]
    DurationNotSet,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// One lock, vesting linearly over `[start_time, end_time]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VestingSchedule {
    pub start_time: u64,
    pub end_time: u64,
    pub quantity: U256,
    pub vested_quantity: U256,
}

impl VestingSchedule {
    /// Total amount vested by `now`, clamped to the full quantity.
    fn vested_at(&self, now: u64) -> U256 {
        if now >= self.end_time {
            return self.quantity;
        }
        if now <= self.start_time {
            return U256::ZERO;
        }
        let elapsed = U256::from(now - self.start_time);
        let span = U256::from(self.end_time - self.start_time);
        self.quantity * elapsed / span
    }
}

/// Escrow holding locked rewards until they vest.
pub struct RewardLocker {
    address: Address,
    access: AccessControl,
    ledger: Arc<TokenLedger>,
    /// token -> vesting duration in seconds
    durations: DashMap<Address, u64>,
    /// (token, account) -> schedules
    schedules: DashMap<(Address, Address), Vec<VestingSchedule>>,
}

impl RewardLocker {
    pub fn new(address: Address, admin: Address, ledger: Arc<TokenLedger>) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
            ledger,
            durations: DashMap::new(),
            schedules: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn set_vesting_duration(
        &self,
        caller: Address,
        token: Address,
        duration_secs: u64,
    ) -> Result<(), VestingError> {
        self.access.check_admin(caller)?;
        info!(token = %token, duration_secs, "Vesting duration set");
        self.durations.insert(token, duration_secs);
        Ok(())
    }

    /// Lock `quantity` of `token` for `account`, funded by the caller.
    /// A zero configured duration pays out immediately instead of locking.
    pub fn lock(
        &self,
        caller: Address,
        token: Address,
        account: Address,
        quantity: U256,
        now: u64,
    ) -> Result<(), VestingError> {
        self.access.check_operator(caller)?;
        let duration = self
            .durations
            .get(&token)
            .map(|e| *e.value())
            .ok_or(VestingError::DurationNotSet)?;

        if duration == 0 {
            self.ledger.transfer(token, caller, account, quantity)?;
            info!(token = %token, account = %account, %quantity, "Reward paid out directly");
            return Ok(());
        }

        self.ledger.transfer(token, caller, self.address, quantity)?;
        self.schedules
            .entry((token, account))
            .or_default()
            .push(VestingSchedule {
                start_time: now,
                end_time: now + duration,
                quantity,
                vested_quantity: U256::ZERO,
            });
        info!(
            token = %token,
            account = %account,
            %quantity,
            end_time = now + duration,
            "Reward locked"
        );
        Ok(())
    }

    /// Release everything newly vested for (token, account) and return the
    /// released amount.
    pub fn vest(&self, token: Address, account: Address, now: u64) -> Result<U256, VestingError> {
        let mut total = U256::ZERO;
        if let Some(mut entry) = self.schedules.get_mut(&(token, account)) {
            for schedule in entry.value_mut().iter_mut() {
                let vested = schedule.vested_at(now);
                if vested > schedule.vested_quantity {
                    total += vested - schedule.vested_quantity;
                    schedule.vested_quantity = vested;
                }
            }
        }
        if !total.is_zero() {
            self.ledger.transfer(token, self.address, account, total)?;
            info!(token = %token, account = %account, %total, "Rewards vested");
        }
        Ok(total)
    }

    pub fn schedules_of(&self, token: Address, account: Address) -> Vec<VestingSchedule> {
        self.schedules
            .get(&(token, account))
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}
