//! Configuration loading for the governance and treasury engines.
//!
//! Two files drive a deployment:
//!
//! - a governance JSON file (executor timelock parameters, epoch layout,
//!   the DAO operator and governance token), loaded by [`GovernanceConfig`]
//! - a treasury TOML file (tokens with their price-feed quotes, premiums,
//!   the liquidation schedule and pool addresses), loaded by
//!   [`TreasuryConfig`]
//!
//! Address fields may be written as `${ENV_VAR}` and are expanded from the
//! environment at load time.

mod governance;
mod treasury;

pub use governance::{ExecutorParams, GovernanceConfig};
pub use treasury::{OracleConfig, PoolAddresses, ScheduleConfig, TokenConfig, TreasuryConfig};

use alloy::primitives::Address;
use anyhow::{Context, Result};

/// Expand a `${VAR}` reference from the environment; other strings pass
/// through unchanged.
pub(crate) fn expand_env(s: &str) -> String {
    if s.starts_with("${") && s.ends_with('}') {
        let var_name = &s[2..s.len() - 1];
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}

/// Parse an address field, expanding `${VAR}` references first.
pub(crate) fn parse_address(field: &str, raw: &str) -> Result<Address> {
    let expanded = expand_env(raw);
    expanded
        .parse()
        .with_context(|| format!("invalid address for {field}: '{expanded}'"))
}
