//! Token balance book shared by every treasury component.
//!
//! The ledger stands in for the ERC20 token contracts and native-currency
//! accounting the engine runs against: balances per (token, holder),
//! per-token decimals, and recipients that refuse native transfers
//! (the analogue of a contract without a payable receive function).
//!
//! A liquidation is atomic end to end: [`TokenLedger::snapshot`] captures the
//! full balance book at entry and [`TokenLedger::restore`] rolls every
//! transfer back if any later step fails.

use alloy::primitives::{address, Address, U256};
use dashmap::{DashMap, DashSet};
use tracing::trace;

/// Sentinel address for the native currency. Assumed 18 decimals.
pub const NATIVE_TOKEN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("transfer eth failed")]
    NativeTransferFailed,
    #[error("token not registered")]
    UnknownToken,
}

/// Full-balance snapshot used for whole-call rollback.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    balances: Vec<((Address, Address), U256)>,
}

/// Shared balance book.
#[derive(Debug, Default)]
pub struct TokenLedger {
    /// (token, holder) -> balance
    balances: DashMap<(Address, Address), U256>,
    /// token -> decimals (native is implicit)
    decimals: DashMap<Address, u8>,
    /// token -> total minted
    total_supply: DashMap<Address, U256>,
    /// holders refusing native-currency transfers
    native_rejecting: DashSet<Address>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token and its decimals. Re-registration overwrites.
    pub fn register_token(&self, token: Address, decimals: u8) {
        self.decimals.insert(token, decimals);
    }

    /// Decimals of `token`; the native currency is always 18.
    pub fn decimals_of(&self, token: Address) -> Result<u8, LedgerError> {
        if token == NATIVE_TOKEN_ADDRESS {
            return Ok(18);
        }
        self.decimals
            .get(&token)
            .map(|e| *e.value())
            .ok_or(LedgerError::UnknownToken)
    }

    /// Credit `to` with freshly minted units (test and deployment seeding).
    pub fn mint(&self, token: Address, to: Address, amount: U256) {
        *self.balances.entry((token, to)).or_insert(U256::ZERO) += amount;
        *self.total_supply.entry(token).or_insert(U256::ZERO) += amount;
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .map(|e| *e.value())
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply_of(&self, token: Address) -> U256 {
        self.total_supply
            .get(&token)
            .map(|e| *e.value())
            .unwrap_or(U256::ZERO)
    }

    /// Mark whether `holder` refuses native-currency transfers.
    pub fn set_native_rejecting(&self, holder: Address, rejecting: bool) {
        if rejecting {
            self.native_rejecting.insert(holder);
        } else {
            self.native_rejecting.remove(&holder);
        }
    }

    /// Move `amount` of `token` from `from` to `to`.
    ///
    /// Native transfers fail when the recipient refuses them; token
    /// transfers fail on insufficient balance.
    pub fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if token == NATIVE_TOKEN_ADDRESS && self.native_rejecting.contains(&to) {
            return Err(LedgerError::NativeTransferFailed);
        }

        {
            let mut from_balance = self
                .balances
                .entry((token, from))
                .or_insert(U256::ZERO);
            if *from_balance < amount {
                return Err(LedgerError::InsufficientBalance);
            }
            *from_balance -= amount;
        }
        *self.balances.entry((token, to)).or_insert(U256::ZERO) += amount;

        trace!(token = %token, from = %from, to = %to, amount = %amount, "transfer");
        Ok(())
    }

    /// Capture the entire balance book.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self
                .balances
                .iter()
                .map(|e| (*e.key(), *e.value()))
                .collect(),
        }
    }

    /// Restore a previously captured balance book, discarding every transfer
    /// made since.
    pub fn restore(&self, snapshot: &LedgerSnapshot) {
        self.balances.clear();
        for ((token, holder), amount) in &snapshot.balances {
            self.balances.insert((*token, *holder), *amount);
        }
    }
}
