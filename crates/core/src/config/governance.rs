//! Governance deployment configuration (JSON, camelCase keys).

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timelock executor and proposal-validation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorParams {
    /// Seconds between queueing and the earliest execution
    pub delay: u64,
    /// Seconds after `execution_time` during which execution stays possible
    pub grace_period: u64,
    /// Minimum `end_time - start_time` for proposals run by this executor
    pub min_voting_duration: u64,
    /// Minimum participation, in bps of max voting power
    pub min_quorum_bps: u16,
    /// Minimum YES-over-NO margin, in bps of max voting power
    pub vote_differential_bps: u16,
    /// Maximum option count for generic proposals
    #[serde(default = "default_max_voting_options")]
    pub max_voting_options: usize,
}

fn default_max_voting_options() -> usize {
    8
}

/// Governance deployment file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceConfig {
    /// Governance token address
    pub knc: String,
    /// Epoch length in seconds for epoch-based voting power
    pub epoch_period: u64,
    /// First epoch start (Unix seconds)
    pub starttime: u64,
    /// Parameters for the short (routine) executor
    pub short_executor: ExecutorParams,
    /// Parameters for the long (protocol-critical) executor
    pub long_executor: ExecutorParams,
    /// The only address allowed to create proposals
    pub dao_operator: String,
}

impl GovernanceConfig {
    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read governance config {path:?}"))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse governance config {path:?}"))
    }

    pub fn knc_address(&self) -> Result<Address> {
        super::parse_address("knc", &self.knc)
    }

    pub fn dao_operator_address(&self) -> Result<Address> {
        super::parse_address("daoOperator", &self.dao_operator)
    }
}
