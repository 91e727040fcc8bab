//! Shared domain primitives for the DAO treasury-liquidation and
//! governance engines.
//!
//! This crate provides:
//! - 18-decimal fixed-point U256 math for conversion rates and premiums
//! - Admin/operator access control
//! - The liquidation premium table (default + per-liquidator overrides)
//! - The recurring liquidation schedule
//! - Configuration loading (governance JSON, treasury TOML)

mod access;
pub mod config;
mod premium;
mod schedule;
pub mod wad_math;

pub use access::{AccessControl, AccessError};
pub use config::{
    ExecutorParams, GovernanceConfig, PoolAddresses, ScheduleConfig, TokenConfig, TreasuryConfig,
};
pub use premium::{PremiumData, PremiumError, PremiumTable, MAX_PREMIUM_BPS};
pub use schedule::{LiquidationSchedule, ScheduleError};
pub use wad_math::{MathError, BPS_DENOMINATOR, MAX_DECIMALS, PRECISION};
