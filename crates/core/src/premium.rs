//! Liquidation premium schedule.
//!
//! A premium is the discount a liquidator earns for performing a conversion,
//! deducted from the oracle's expected return. LP redemptions and plain token
//! conversions carry independent premiums, with a table-wide default and
//! per-liquidator overrides.

use alloy::primitives::Address;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::wad_math::apply_premium_bps;

/// Hard cap on any premium: 2000 bps = 20%.
pub const MAX_PREMIUM_BPS: u16 = 2000;

/// Premium configuration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PremiumError {
    #[error("invalid liquidate lp bps")]
    InvalidLpBps,
    #[error("invalid liquidate token bps")]
    InvalidTokenBps,
}

/// Premium pair, in basis points of 10000.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumData {
    /// Premium for LP-share liquidations
    pub liquidate_lp_bps: u16,
    /// Premium for plain token liquidations
    pub liquidate_token_bps: u16,
}

impl PremiumData {
    pub fn new(liquidate_lp_bps: u16, liquidate_token_bps: u16) -> Self {
        Self {
            liquidate_lp_bps,
            liquidate_token_bps,
        }
    }

    fn validate(&self) -> Result<(), PremiumError> {
        if self.liquidate_lp_bps > MAX_PREMIUM_BPS {
            return Err(PremiumError::InvalidLpBps);
        }
        if self.liquidate_token_bps > MAX_PREMIUM_BPS {
            return Err(PremiumError::InvalidTokenBps);
        }
        Ok(())
    }

    /// Deduct the LP premium from a gross LP subtotal.
    pub fn apply_lp(&self, gross: alloy::primitives::U256) -> alloy::primitives::U256 {
        apply_premium_bps(gross, self.liquidate_lp_bps)
    }

    /// Deduct the token premium from a gross token subtotal.
    pub fn apply_token(&self, gross: alloy::primitives::U256) -> alloy::primitives::U256 {
        apply_premium_bps(gross, self.liquidate_token_bps)
    }
}

/// Default premium plus per-liquidator overrides.
#[derive(Debug, Default)]
pub struct PremiumTable {
    default: RwLock<PremiumData>,
    overrides: DashMap<Address, PremiumData>,
}

impl PremiumTable {
    pub fn new(default: PremiumData) -> Result<Self, PremiumError> {
        default.validate()?;
        Ok(Self {
            default: RwLock::new(default),
            overrides: DashMap::new(),
        })
    }

    /// Premium applied to `liquidator`: its override if present, else the default.
    pub fn premium_of(&self, liquidator: Address) -> PremiumData {
        self.overrides
            .get(&liquidator)
            .map(|e| *e.value())
            .unwrap_or(*self.default.read())
    }

    pub fn default_premium(&self) -> PremiumData {
        *self.default.read()
    }

    pub fn set_default(&self, premium: PremiumData) -> Result<(), PremiumError> {
        premium.validate()?;
        info!(
            lp_bps = premium.liquidate_lp_bps,
            token_bps = premium.liquidate_token_bps,
            "Default premium updated"
        );
        *self.default.write() = premium;
        Ok(())
    }

    /// Install a per-liquidator override, replacing any previous one.
    pub fn set_override(&self, liquidator: Address, premium: PremiumData) -> Result<(), PremiumError> {
        premium.validate()?;
        info!(
            liquidator = %liquidator,
            lp_bps = premium.liquidate_lp_bps,
            token_bps = premium.liquidate_token_bps,
            "Premium override updated"
        );
        self.overrides.insert(liquidator, premium);
        Ok(())
    }

    /// Drop a per-liquidator override; absent overrides are a no-op.
    pub fn clear_override(&self, liquidator: Address) {
        if self.overrides.remove(&liquidator).is_some() {
            info!(liquidator = %liquidator, "Premium override cleared");
        }
    }
}
