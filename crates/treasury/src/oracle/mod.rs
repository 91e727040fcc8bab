//! Price-oracle layer for treasury liquidations.
//!
//! The oracle layer is organized into:
//!
//! - [`PriceFeed`]: trait for a single external price feed (Chainlink-style
//!   `latestRoundData` semantics)
//! - [`LpPool`]: trait exposing an LP pool's underlying tokens, reserves and
//!   share supply
//! - [`ChainlinkPriceOracle`]: the dual-quote aggregation oracle computing
//!   conversion rates and expected liquidation returns
//! - [`PriceSource`]: the narrow interface the liquidation strategy consumes
//!
//! Quotes degrade rather than fail: a stale, unset, or non-positive reading
//! becomes rate 0, and only a caller that *needs* a positive rate turns that
//! into an error ("0 aggregator rate").

mod chainlink;
mod feeds;
mod types;

pub use chainlink::{ChainlinkPriceOracle, OracleError};
pub use feeds::{LpPool, PriceFeed, StaticFeed, StaticLpPool};
pub use types::{AggregatorProxyData, LiquidationKind, RoundData};

use alloy::primitives::{Address, U256};

/// Interface the liquidation strategy uses to price a basket.
///
/// `hint` declares, entry by entry, whether the source asset is an LP share
/// to redeem first or a plain token to convert directly.
pub trait PriceSource: Send + Sync {
    /// Identity used by the strategy's oracle whitelist.
    fn id(&self) -> Address;

    /// Aggregate destination amount for the basket, after premiums.
    #[allow(clippy::too_many_arguments)]
    fn get_expected_return(
        &self,
        liquidator: Address,
        sources: &[Address],
        amounts: &[U256],
        dest: Address,
        hint: &[LiquidationKind],
        now: u64,
    ) -> Result<U256, OracleError>;
}
