//! Minimal swap venue backing the liquidator adapters.
//!
//! The router holds its own inventory on the ledger and fills swaps at
//! configured fixed rates (18-decimal fixed point, dest per src), rescaling
//! between token decimals the same way the oracle does.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use kyberdao_core::wad_math::calculate_return_amount;
use kyberdao_core::MathError;

use crate::ledger::{LedgerError, TokenLedger};

/// Router failures.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    #[error("no route")]
    NoRoute,
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Fixed-rate swap router.
pub struct DexRouter {
    address: Address,
    ledger: Arc<TokenLedger>,
    /// (token_in, token_out) -> rate (dest per src, 1e18)
    rates: DashMap<(Address, Address), U256>,
}

impl DexRouter {
    pub fn new(address: Address, ledger: Arc<TokenLedger>) -> Self {
        Self {
            address,
            ledger,
            rates: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_rate(&self, token_in: Address, token_out: Address, rate: U256) {
        self.rates.insert((token_in, token_out), rate);
    }

    /// Swap `amount_in` of `token_in` held by `from` into `token_out`
    /// delivered to `to`. The router's own inventory fills the out side.
    pub fn swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        from: Address,
        to: Address,
    ) -> Result<U256, DexError> {
        let rate = self
            .rates
            .get(&(token_in, token_out))
            .map(|e| *e.value())
            .ok_or(DexError::NoRoute)?;

        let in_decimals = self.ledger.decimals_of(token_in)?;
        let out_decimals = self.ledger.decimals_of(token_out)?;
        let amount_out = calculate_return_amount(amount_in, in_decimals, out_decimals, rate)?;

        self.ledger.transfer(token_in, from, self.address, amount_in)?;
        self.ledger.transfer(token_out, self.address, to, amount_out)?;

        debug!(
            token_in = %token_in,
            token_out = %token_out,
            %amount_in,
            %amount_out,
            "Swap filled"
        );
        Ok(amount_out)
    }
}
