//! Feed and LP-pool abstractions plus the settable implementations used by
//! tests and the deployment binary.

use alloy::primitives::{Address, I256, U256};
use anyhow::Result;
use parking_lot::RwLock;

use super::RoundData;

/// A single external price feed (Chainlink aggregator semantics).
///
/// Implementations must never block; errors are degraded to "no rate" by the
/// consuming oracle.
pub trait PriceFeed: Send + Sync {
    /// Answer decimals (typically 8 for USD quotes, 18 for ETH quotes).
    fn decimals(&self) -> u8;

    /// The most recent round.
    fn latest_round_data(&self) -> Result<RoundData>;
}

/// An LP pool holding two underlying reserves.
pub trait LpPool: Send + Sync {
    /// The LP share token address.
    fn address(&self) -> Address;
    fn token0(&self) -> Address;
    fn token1(&self) -> Address;
    fn reserves(&self) -> (U256, U256);
    fn total_supply(&self) -> U256;
}

/// In-memory feed with a settable answer.
pub struct StaticFeed {
    decimals: u8,
    inner: RwLock<RoundData>,
}

impl StaticFeed {
    pub fn new(decimals: u8, answer: I256, updated_at: u64) -> Self {
        Self {
            decimals,
            inner: RwLock::new(RoundData {
                round_id: 1,
                answer,
                started_at: updated_at,
                updated_at,
            }),
        }
    }

    /// Publish a new round.
    pub fn set_answer(&self, answer: I256, updated_at: u64) {
        let mut round = self.inner.write();
        round.round_id += 1;
        round.answer = answer;
        round.started_at = updated_at;
        round.updated_at = updated_at;
    }
}

impl PriceFeed for StaticFeed {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn latest_round_data(&self) -> Result<RoundData> {
        Ok(*self.inner.read())
    }
}

/// In-memory LP pool with settable reserves and supply.
pub struct StaticLpPool {
    address: Address,
    token0: Address,
    token1: Address,
    state: RwLock<(U256, U256, U256)>, // (reserve0, reserve1, total_supply)
}

impl StaticLpPool {
    pub fn new(
        address: Address,
        token0: Address,
        token1: Address,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> Self {
        Self {
            address,
            token0,
            token1,
            state: RwLock::new((reserve0, reserve1, total_supply)),
        }
    }

    pub fn set_state(&self, reserve0: U256, reserve1: U256, total_supply: U256) {
        *self.state.write() = (reserve0, reserve1, total_supply);
    }
}

impl LpPool for StaticLpPool {
    fn address(&self) -> Address {
        self.address
    }

    fn token0(&self) -> Address {
        self.token0
    }

    fn token1(&self) -> Address {
        self.token1
    }

    fn reserves(&self) -> (U256, U256) {
        let state = self.state.read();
        (state.0, state.1)
    }

    fn total_supply(&self) -> U256 {
        self.state.read().2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_static_feed_rounds_advance() {
        let feed = StaticFeed::new(8, I256::try_from(100_000_000i64).unwrap(), 1_000);
        let first = feed.latest_round_data().unwrap();
        assert_eq!(first.round_id, 1);
        assert_eq!(first.updated_at, 1_000);

        feed.set_answer(I256::try_from(110_000_000i64).unwrap(), 2_000);
        let second = feed.latest_round_data().unwrap();
        assert_eq!(second.round_id, 2);
        assert_eq!(second.updated_at, 2_000);
    }

    #[test]
    fn test_static_lp_pool_state() {
        let pool = StaticLpPool::new(
            address!("4000000000000000000000000000000000000001"),
            address!("4000000000000000000000000000000000000002"),
            address!("4000000000000000000000000000000000000003"),
            U256::from(500u64),
            U256::from(1000u64),
            U256::from(100u64),
        );
        assert_eq!(pool.reserves(), (U256::from(500u64), U256::from(1000u64)));
        assert_eq!(pool.total_supply(), U256::from(100u64));
    }
}
