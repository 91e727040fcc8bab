//! Dual-quote Chainlink-style price oracle.
//!
//! Every listed asset carries up to two feeds, one quoted in ETH and one in
//! USD. A conversion rate between two assets is computed per quote currency
//! and blended: both available → truncating average, one available → that
//! one, neither → 0. LP shares are decomposed into their underlying reserve
//! amounts before conversion.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use kyberdao_core::wad_math::{self, normalize_to_wad, rate_average, PRECISION};
use kyberdao_core::{AccessControl, AccessError, MathError, PremiumData, PremiumError, PremiumTable};

use crate::ledger::{LedgerError, TokenLedger, NATIVE_TOKEN_ADDRESS};

use super::{AggregatorProxyData, LiquidationKind, LpPool, PriceFeed, PriceSource};

/// Oracle failures. Staleness never appears here: it degrades to rate 0 and
/// only surfaces as [`OracleError::ZeroAggregatorRate`] when a conversion
/// actually needs the missing quote.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("0 aggregator rate")]
    ZeroAggregatorRate,
    #[error("only whitelisted token")]
    TokenNotWhitelisted,
    #[error("lp pool not found")]
    LpPoolNotFound,
    #[error("invalid lp total supply")]
    InvalidLpTotalSupply,
    #[error("invalid lengths")]
    InvalidLengths,
    #[error(transparent)]
    Math(#[from] MathError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Premium(#[from] PremiumError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Dual-quote aggregation oracle over injected price feeds.
pub struct ChainlinkPriceOracle {
    id: Address,
    access: AccessControl,
    ledger: Arc<TokenLedger>,
    aggregators: DashMap<Address, AggregatorProxyData>,
    lp_pools: DashMap<Address, Arc<dyn LpPool>>,
    whitelisted_tokens: RwLock<BTreeSet<Address>>,
    premiums: PremiumTable,
    min_valid_duration_secs: AtomicU64,
}

impl ChainlinkPriceOracle {
    pub fn new(
        id: Address,
        admin: Address,
        ledger: Arc<TokenLedger>,
        default_premium: PremiumData,
        min_valid_duration_secs: u64,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            id,
            access: AccessControl::new(admin),
            ledger,
            aggregators: DashMap::new(),
            lp_pools: DashMap::new(),
            whitelisted_tokens: RwLock::new(BTreeSet::new()),
            premiums: PremiumTable::new(default_premium)?,
            min_valid_duration_secs: AtomicU64::new(min_valid_duration_secs),
        })
    }

    // ---- admin surface ----

    /// List an asset's feed pair. Either side may be absent; feed decimals
    /// are captured at listing time.
    pub fn update_aggregator_proxy_data(
        &self,
        caller: Address,
        asset: Address,
        quote_eth_proxy: Option<Arc<dyn PriceFeed>>,
        quote_usd_proxy: Option<Arc<dyn PriceFeed>>,
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        let data = AggregatorProxyData::new(quote_eth_proxy, quote_usd_proxy);
        info!(asset = %asset, data = ?data, "Aggregator proxies updated");
        self.aggregators.insert(asset, data);
        Ok(())
    }

    /// Register an LP pool under its share-token address.
    pub fn add_lp_pool(&self, caller: Address, pool: Arc<dyn LpPool>) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        info!(lp_token = %pool.address(), "LP pool registered");
        self.lp_pools.insert(pool.address(), pool);
        Ok(())
    }

    /// Drop an LP pool registration; absent registrations are a no-op.
    pub fn remove_lp_pool(&self, caller: Address, lp_token: Address) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        if self.lp_pools.remove(&lp_token).is_some() {
            info!(lp_token = %lp_token, "LP pool removed");
        }
        Ok(())
    }

    /// Add destination tokens to the whitelist; present entries are a no-op.
    pub fn add_whitelisted_tokens(
        &self,
        caller: Address,
        tokens: &[Address],
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        let mut whitelist = self.whitelisted_tokens.write();
        for token in tokens {
            if whitelist.insert(*token) {
                info!(token = %token, "Token whitelisted");
            }
        }
        Ok(())
    }

    /// Remove destination tokens from the whitelist; absent entries are a
    /// no-op.
    pub fn remove_whitelisted_tokens(
        &self,
        caller: Address,
        tokens: &[Address],
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        let mut whitelist = self.whitelisted_tokens.write();
        for token in tokens {
            if whitelist.remove(token) {
                info!(token = %token, "Token removed from whitelist");
            }
        }
        Ok(())
    }

    pub fn is_whitelisted_token(&self, token: Address) -> bool {
        self.whitelisted_tokens.read().contains(&token)
    }

    pub fn whitelisted_tokens(&self) -> Vec<Address> {
        self.whitelisted_tokens.read().iter().copied().collect()
    }

    pub fn update_default_premium(
        &self,
        caller: Address,
        premium: PremiumData,
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        self.premiums.set_default(premium)?;
        Ok(())
    }

    pub fn update_premium_for(
        &self,
        caller: Address,
        liquidator: Address,
        premium: PremiumData,
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        self.premiums.set_override(liquidator, premium)?;
        Ok(())
    }

    pub fn premium_of(&self, liquidator: Address) -> PremiumData {
        self.premiums.premium_of(liquidator)
    }

    pub fn update_min_valid_duration(
        &self,
        caller: Address,
        secs: u64,
    ) -> Result<(), OracleError> {
        self.access.check_admin(caller)?;
        info!(secs, "Minimum feed validity window updated");
        self.min_valid_duration_secs.store(secs, Ordering::Relaxed);
        Ok(())
    }

    pub fn min_valid_duration_secs(&self) -> u64 {
        self.min_valid_duration_secs.load(Ordering::Relaxed)
    }

    // ---- rate computation ----

    /// Read one feed, degrading every failure mode to rate 0: read errors,
    /// `updated_at == 0`, staleness beyond the validity window, and
    /// non-positive answers. The surviving answer is normalized to 18
    /// decimals.
    fn read_feed(&self, feed: &Arc<dyn PriceFeed>, decimals: u8, now: u64) -> U256 {
        let round = match feed.latest_round_data() {
            Ok(round) => round,
            Err(e) => {
                warn!(error = %e, "Feed read failed, degrading to no rate");
                return U256::ZERO;
            }
        };
        if round.updated_at == 0
            || now.saturating_sub(round.updated_at) > self.min_valid_duration_secs()
        {
            return U256::ZERO;
        }
        if !round.has_positive_answer() {
            return U256::ZERO;
        }
        normalize_to_wad(round.answer.into_raw(), decimals)
    }

    /// ETH-quoted rate for `asset`, 18 decimals; 0 when unavailable. The
    /// native currency is its own ETH quote.
    pub fn get_rate_over_eth(&self, asset: Address, now: u64) -> U256 {
        if asset == NATIVE_TOKEN_ADDRESS {
            return PRECISION;
        }
        match self.aggregators.get(&asset) {
            Some(data) => match &data.quote_eth_proxy {
                Some(feed) => self.read_feed(feed, data.quote_eth_decimals, now),
                None => U256::ZERO,
            },
            None => U256::ZERO,
        }
    }

    /// USD-quoted rate for `asset`, 18 decimals; 0 when unavailable.
    pub fn get_rate_over_usd(&self, asset: Address, now: u64) -> U256 {
        match self.aggregators.get(&asset) {
            Some(data) => match &data.quote_usd_proxy {
                Some(feed) => self.read_feed(feed, data.quote_usd_decimals, now),
                None => U256::ZERO,
            },
            None => U256::ZERO,
        }
    }

    /// Blended conversion rate from `src` to `dest`, scaled by `PRECISION`.
    /// Returns 0 when no quote currency prices both sides.
    pub fn conversion_rate(&self, src: Address, dest: Address, now: u64) -> U256 {
        if src == NATIVE_TOKEN_ADDRESS && dest == NATIVE_TOKEN_ADDRESS {
            return PRECISION;
        }

        let src_eth = self.get_rate_over_eth(src, now);
        let dest_eth = self.get_rate_over_eth(dest, now);
        let rate_eth = if !src_eth.is_zero() && !dest_eth.is_zero() {
            src_eth * PRECISION / dest_eth
        } else {
            U256::ZERO
        };

        let src_usd = self.get_rate_over_usd(src, now);
        let dest_usd = self.get_rate_over_usd(dest, now);
        let rate_usd = if !src_usd.is_zero() && !dest_usd.is_zero() {
            src_usd * PRECISION / dest_usd
        } else {
            U256::ZERO
        };

        match (rate_eth.is_zero(), rate_usd.is_zero()) {
            (false, false) => rate_average(rate_eth, rate_usd),
            (false, true) => rate_eth,
            (true, false) => rate_usd,
            (true, true) => U256::ZERO,
        }
    }

    /// Proportional redemption of `lp_amount` shares into the pool's two
    /// underlying amounts. Pool state is read atomically; no slippage model.
    pub fn get_expected_tokens_from_lp(
        &self,
        lp_token: Address,
        lp_amount: U256,
    ) -> Result<[(Address, U256); 2], OracleError> {
        let pool = self
            .lp_pools
            .get(&lp_token)
            .ok_or(OracleError::LpPoolNotFound)?;
        let total_supply = pool.total_supply();
        if total_supply.is_zero() {
            return Err(OracleError::InvalidLpTotalSupply);
        }
        let (reserve0, reserve1) = pool.reserves();
        Ok([
            (pool.token0(), lp_amount * reserve0 / total_supply),
            (pool.token1(), lp_amount * reserve1 / total_supply),
        ])
    }

    /// Convert `amount` of `src` into `dest` units at the blended rate,
    /// rescaling between the two tokens' decimals. A missing rate is the
    /// caller-visible "0 aggregator rate" failure.
    fn token_return(
        &self,
        src: Address,
        amount: U256,
        dest: Address,
        now: u64,
    ) -> Result<U256, OracleError> {
        let rate = self.conversion_rate(src, dest, now);
        if rate.is_zero() {
            return Err(OracleError::ZeroAggregatorRate);
        }
        let src_decimals = self.ledger.decimals_of(src)?;
        let dest_decimals = self.ledger.decimals_of(dest)?;
        Ok(wad_math::calculate_return_amount(
            amount,
            src_decimals,
            dest_decimals,
            rate,
        )?)
    }

    /// Expected return for an all-token basket.
    pub fn get_expected_return_from_tokens(
        &self,
        liquidator: Address,
        sources: &[Address],
        amounts: &[U256],
        dest: Address,
        now: u64,
    ) -> Result<U256, OracleError> {
        let hint = vec![LiquidationKind::Token; sources.len()];
        self.expected_return(liquidator, sources, amounts, dest, &hint, now)
    }

    /// Expected return for an all-LP basket.
    pub fn get_expected_return_from_lps(
        &self,
        liquidator: Address,
        sources: &[Address],
        amounts: &[U256],
        dest: Address,
        now: u64,
    ) -> Result<U256, OracleError> {
        let hint = vec![LiquidationKind::Lp; sources.len()];
        self.expected_return(liquidator, sources, amounts, dest, &hint, now)
    }

    fn expected_return(
        &self,
        liquidator: Address,
        sources: &[Address],
        amounts: &[U256],
        dest: Address,
        hint: &[LiquidationKind],
        now: u64,
    ) -> Result<U256, OracleError> {
        if sources.len() != amounts.len() || sources.len() != hint.len() {
            return Err(OracleError::InvalidLengths);
        }
        if !self.is_whitelisted_token(dest) {
            return Err(OracleError::TokenNotWhitelisted);
        }

        let premium = self.premiums.premium_of(liquidator);
        let mut lp_subtotal = U256::ZERO;
        let mut token_subtotal = U256::ZERO;
        let mut passthrough = U256::ZERO;

        for ((src, amount), kind) in sources.iter().zip(amounts).zip(hint) {
            match kind {
                LiquidationKind::Token => {
                    if *src == dest {
                        // dest itself converts 1:1 and carries no premium
                        passthrough += *amount;
                    } else {
                        token_subtotal += self.token_return(*src, *amount, dest, now)?;
                    }
                }
                LiquidationKind::Lp => {
                    for (underlying, underlying_amount) in
                        self.get_expected_tokens_from_lp(*src, *amount)?
                    {
                        if underlying == dest {
                            lp_subtotal += underlying_amount;
                        } else if !underlying_amount.is_zero() {
                            lp_subtotal +=
                                self.token_return(underlying, underlying_amount, dest, now)?;
                        }
                    }
                }
            }
        }

        let total =
            passthrough + premium.apply_lp(lp_subtotal) + premium.apply_token(token_subtotal);
        debug!(
            liquidator = %liquidator,
            dest = %dest,
            %lp_subtotal,
            %token_subtotal,
            %passthrough,
            %total,
            "Expected return computed"
        );
        Ok(total)
    }
}

impl PriceSource for ChainlinkPriceOracle {
    fn id(&self) -> Address {
        self.id
    }

    fn get_expected_return(
        &self,
        liquidator: Address,
        sources: &[Address],
        amounts: &[U256],
        dest: Address,
        hint: &[LiquidationKind],
        now: u64,
    ) -> Result<U256, OracleError> {
        self.expected_return(liquidator, sources, amounts, dest, hint, now)
    }
}
