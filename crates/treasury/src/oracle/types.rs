//! Oracle type definitions.

use alloy::primitives::I256;
use std::fmt;
use std::sync::Arc;

use super::PriceFeed;

/// How a basket entry is liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationKind {
    /// LP share: redeem proportionally, then convert each underlying
    Lp,
    /// Plain token: convert directly
    Token,
}

/// One reading from a price feed.
#[derive(Debug, Clone, Copy)]
pub struct RoundData {
    /// Round identifier
    pub round_id: u64,
    /// Signed answer in the feed's own decimals
    pub answer: I256,
    /// Timestamp when the round started
    pub started_at: u64,
    /// Timestamp when the answer was computed; 0 means never
    pub updated_at: u64,
}

impl RoundData {
    /// Whether the answer is usable at all (positivity only; staleness is the
    /// oracle's call since it owns the validity window).
    pub fn has_positive_answer(&self) -> bool {
        self.answer.is_positive()
    }
}

/// Per-asset feed registration: one proxy per quote currency, either may be
/// absent. Decimals are captured from the feed when the asset is listed.
#[derive(Clone)]
pub struct AggregatorProxyData {
    pub quote_eth_proxy: Option<Arc<dyn PriceFeed>>,
    pub quote_eth_decimals: u8,
    pub quote_usd_proxy: Option<Arc<dyn PriceFeed>>,
    pub quote_usd_decimals: u8,
}

impl AggregatorProxyData {
    pub fn new(
        quote_eth_proxy: Option<Arc<dyn PriceFeed>>,
        quote_usd_proxy: Option<Arc<dyn PriceFeed>>,
    ) -> Self {
        let quote_eth_decimals = quote_eth_proxy.as_ref().map(|f| f.decimals()).unwrap_or(0);
        let quote_usd_decimals = quote_usd_proxy.as_ref().map(|f| f.decimals()).unwrap_or(0);
        Self {
            quote_eth_proxy,
            quote_eth_decimals,
            quote_usd_proxy,
            quote_usd_decimals,
        }
    }
}

impl fmt::Debug for AggregatorProxyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorProxyData")
            .field("quote_eth", &self.quote_eth_proxy.is_some())
            .field("quote_eth_decimals", &self.quote_eth_decimals)
            .field("quote_usd", &self.quote_usd_proxy.is_some())
            .field("quote_usd_decimals", &self.quote_usd_decimals)
            .finish()
    }
}
