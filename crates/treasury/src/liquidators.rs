//! Liquidator callback adapters.
//!
//! These implement the settlement side of a liquidation: they receive the
//! source assets from the treasury pool, convert them through a DEX router,
//! and return the destination token to the strategy before the callback
//! returns. [`KyberSwapLiquidator`] handles plain token baskets;
//! [`KyberDmmLiquidator`] additionally redeems LP shares into their
//! underlyings first.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dex::DexRouter;
use crate::ledger::TokenLedger;
use crate::oracle::LpPool;
use crate::strategy::{LiquidationCallback, LiquidationStrategy};

/// Swaps every received token into the destination through a DEX router.
pub struct KyberSwapLiquidator {
    address: Address,
    ledger: Arc<TokenLedger>,
    router: Arc<DexRouter>,
}

impl KyberSwapLiquidator {
    pub fn new(address: Address, ledger: Arc<TokenLedger>, router: Arc<DexRouter>) -> Self {
        Self {
            address,
            ledger,
            router,
        }
    }

    /// Swap one asset into the destination; destination amounts are kept
    /// as-is.
    fn settle_asset(
        &self,
        asset: Address,
        amount: U256,
        dest_token: Address,
    ) -> anyhow::Result<U256> {
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }
        if asset == dest_token {
            return Ok(amount);
        }
        let out = self
            .router
            .swap(asset, dest_token, amount, self.address, self.address)?;
        Ok(out)
    }
}

impl LiquidationCallback for KyberSwapLiquidator {
    fn address(&self) -> Address {
        self.address
    }

    fn on_liquidation(
        &self,
        caller: Address,
        sources: &[Address],
        amounts: &[U256],
        strategy: &LiquidationStrategy,
        dest_token: Address,
        min_return: U256,
        _tx_data: &[u8],
    ) -> anyhow::Result<()> {
        let mut total = U256::ZERO;
        for (asset, amount) in sources.iter().zip(amounts) {
            total += self.settle_asset(*asset, *amount, dest_token)?;
        }

        info!(
            caller = %caller,
            dest = %dest_token,
            %total,
            %min_return,
            "Swap settlement complete"
        );
        self.ledger
            .transfer(dest_token, self.address, strategy.address(), total)?;
        Ok(())
    }
}

/// Like [`KyberSwapLiquidator`], but redeems registered LP shares into their
/// underlying reserves before swapping.
pub struct KyberDmmLiquidator {
    address: Address,
    ledger: Arc<TokenLedger>,
    router: Arc<DexRouter>,
    lp_pools: DashMap<Address, Arc<dyn LpPool>>,
}

impl KyberDmmLiquidator {
    pub fn new(address: Address, ledger: Arc<TokenLedger>, router: Arc<DexRouter>) -> Self {
        Self {
            address,
            ledger,
            router,
            lp_pools: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Register the pool backing an LP share token.
    pub fn register_lp_pool(&self, pool: Arc<dyn LpPool>) {
        self.lp_pools.insert(pool.address(), pool);
    }

    /// Burn `lp_amount` shares against the pool: the proportional underlying
    /// amounts move from the pool to this adapter, the shares move back to
    /// the pool.
    fn redeem_lp(
        &self,
        pool: &Arc<dyn LpPool>,
        lp_amount: U256,
    ) -> anyhow::Result<SmallVec<[(Address, U256); 2]>> {
        let total_supply = pool.total_supply();
        anyhow::ensure!(!total_supply.is_zero(), "invalid lp total supply");

        let (reserve0, reserve1) = pool.reserves();
        let amount0 = lp_amount * reserve0 / total_supply;
        let amount1 = lp_amount * reserve1 / total_supply;

        self.ledger
            .transfer(pool.token0(), pool.address(), self.address, amount0)?;
        self.ledger
            .transfer(pool.token1(), pool.address(), self.address, amount1)?;
        self.ledger
            .transfer(pool.address(), self.address, pool.address(), lp_amount)?;

        debug!(
            lp_token = %pool.address(),
            %lp_amount,
            %amount0,
            %amount1,
            "LP shares redeemed"
        );
        Ok(SmallVec::from_buf([
            (pool.token0(), amount0),
            (pool.token1(), amount1),
        ]))
    }

    fn settle_asset(
        &self,
        asset: Address,
        amount: U256,
        dest_token: Address,
    ) -> anyhow::Result<U256> {
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }

        // LP shares redeem first, then each underlying settles as a token
        let underlyings: SmallVec<[(Address, U256); 2]> =
            if let Some(pool) = self.lp_pools.get(&asset) {
                self.redeem_lp(pool.value(), amount)?
            } else {
                smallvec![(asset, amount)]
            };

        let mut total = U256::ZERO;
        for (token, token_amount) in underlyings {
            if token_amount.is_zero() {
                continue;
            }
            if token == dest_token {
                total += token_amount;
            } else {
                total += self
                    .router
                    .swap(token, dest_token, token_amount, self.address, self.address)?;
            }
        }
        Ok(total)
    }
}

impl LiquidationCallback for KyberDmmLiquidator {
    fn address(&self) -> Address {
        self.address
    }

    fn on_liquidation(
        &self,
        caller: Address,
        sources: &[Address],
        amounts: &[U256],
        strategy: &LiquidationStrategy,
        dest_token: Address,
        min_return: U256,
        _tx_data: &[u8],
    ) -> anyhow::Result<()> {
        let mut total = U256::ZERO;
        for (asset, amount) in sources.iter().zip(amounts) {
            total += self.settle_asset(*asset, *amount, dest_token)?;
        }

        info!(
            caller = %caller,
            dest = %dest_token,
            %total,
            %min_return,
            "DMM settlement complete"
        );
        self.ledger
            .transfer(dest_token, self.address, strategy.address(), total)?;
        Ok(())
    }
}
