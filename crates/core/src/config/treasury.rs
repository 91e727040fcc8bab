//! Treasury engine configuration (TOML).

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::premium::PremiumData;
use crate::schedule::LiquidationSchedule;

/// One treasury asset with its optional feed quotes.
///
/// Feed answers are raw integers in the quote's own decimals; they seed the
/// static feeds the binary wires up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    #[serde(default)]
    pub quote_eth_answer: Option<u64>,
    #[serde(default)]
    pub quote_eth_decimals: Option<u8>,
    #[serde(default)]
    pub quote_usd_answer: Option<u64>,
    #[serde(default)]
    pub quote_usd_decimals: Option<u8>,
}

impl TokenConfig {
    pub fn token_address(&self) -> Result<Address> {
        super::parse_address(&self.symbol, &self.address)
    }
}

/// Liquidation window section; mirrors [`LiquidationSchedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub start_time: u64,
    pub repeated_period: u64,
    pub duration: u64,
}

impl ScheduleConfig {
    pub fn to_schedule(&self) -> Result<LiquidationSchedule> {
        LiquidationSchedule::new(self.start_time, self.repeated_period, self.duration)
            .context("invalid liquidation schedule in config")
    }
}

/// Treasury and reward pool addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolAddresses {
    pub treasury: String,
    pub reward: String,
}

impl PoolAddresses {
    pub fn treasury_address(&self) -> Result<Address> {
        super::parse_address("pools.treasury", &self.treasury)
    }

    pub fn reward_address(&self) -> Result<Address> {
        super::parse_address("pools.reward", &self.reward)
    }
}

/// Oracle tuning section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Readings older than this are treated as "no rate"
    pub min_valid_duration_secs: u64,
}

/// Full treasury configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryConfig {
    pub oracle: OracleConfig,
    pub premium: PremiumData,
    pub schedule: ScheduleConfig,
    pub pools: PoolAddresses,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl TreasuryConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read treasury config {path:?}"))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse treasury config {path:?}"))
    }
}
