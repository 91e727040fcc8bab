//! Treasury liquidation engine.
//!
//! This crate provides the treasury side of the DAO:
//! - Shared token ledger with snapshot/rollback atomicity
//! - Dual-quote Chainlink-style price oracle with LP decomposition
//! - Custodial pools with authorized-strategy withdrawals
//! - The liquidation strategy (schedule, whitelists, callback settlement)
//! - Liquidator callback adapters settling through a DEX router
//! - Reward-locker vesting for liquidation proceeds

mod dex;
mod ledger;
mod liquidators;
pub mod oracle;
mod pool;
mod strategy;
mod vesting;

pub use dex::{DexError, DexRouter};
pub use ledger::{LedgerError, LedgerSnapshot, TokenLedger, NATIVE_TOKEN_ADDRESS};
pub use liquidators::{KyberDmmLiquidator, KyberSwapLiquidator};
pub use oracle::{
    AggregatorProxyData, ChainlinkPriceOracle, LiquidationKind, LpPool, OracleError, PriceFeed,
    PriceSource, RoundData, StaticFeed, StaticLpPool,
};
pub use pool::{Pool, PoolError};
pub use strategy::{LiquidationCallback, LiquidationStrategy, StrategyError};
pub use vesting::{RewardLocker, VestingError, VestingSchedule};
