//! Treasury liquidation strategy.
//!
//! One `liquidate` call runs the whole settlement: validate the window and
//! whitelists, price the basket through a whitelisted oracle, pull the
//! source assets from the treasury pool, hand them to the liquidator's
//! callback, verify the destination token came back in sufficient quantity,
//! and forward it to the reward pool.
//!
//! The call is atomic: a ledger snapshot taken at entry is restored on any
//! failure, so a misbehaving callback cannot leave treasury assets stranded.
//! A busy flag held for the whole call rejects reentrant `liquidate`
//! attempts from inside the callback.

use alloy::primitives::{Address, U256};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use kyberdao_core::{AccessControl, AccessError, LiquidationSchedule, ScheduleError};

use crate::ledger::{LedgerError, TokenLedger};
use crate::oracle::{LiquidationKind, OracleError, PriceSource};
use crate::pool::{Pool, PoolError};

/// Strategy failures.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("paused")]
    Paused,
    #[error("only when liquidation enabled")]
    LiquidationDisabled,
    #[error("only whitelisted liquidator")]
    OnlyWhitelistedLiquidator,
    #[error("only whitelisted oracle")]
    OnlyWhitelistedOracle,
    #[error("only not whitelisted oracle")]
    OracleAlreadyWhitelisted,
    #[error("invalid lengths")]
    InvalidLengths,
    #[error("0 min return")]
    ZeroMinReturn,
    #[error("low return amount")]
    LowReturnAmount,
    #[error("reentrant call")]
    ReentrantCall,
    #[error("invalid treasury pool")]
    InvalidTreasuryPool,
    #[error("invalid reward pool")]
    InvalidRewardPool,
    #[error("liquidation callback failed: {0}")]
    Callback(String),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Receiver of a liquidation's source assets, expected to return the
/// destination token to the strategy before `on_liquidation` returns.
pub trait LiquidationCallback: Send + Sync {
    /// The ledger address the source assets are staged at.
    fn address(&self) -> Address;

    /// Perform the swap. `min_return` of `dest_token` must reach the
    /// strategy's address by return time or the whole liquidation reverts.
    #[allow(clippy::too_many_arguments)]
    fn on_liquidation(
        &self,
        caller: Address,
        sources: &[Address],
        amounts: &[U256],
        strategy: &LiquidationStrategy,
        dest_token: Address,
        min_return: U256,
        tx_data: &[u8],
    ) -> anyhow::Result<()>;
}

/// Releases the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates treasury liquidations.
pub struct LiquidationStrategy {
    address: Address,
    access: AccessControl,
    ledger: Arc<TokenLedger>,
    treasury_pool: RwLock<Arc<Pool>>,
    reward_pool: RwLock<Address>,
    schedule: RwLock<LiquidationSchedule>,
    whitelisted_liquidators: RwLock<BTreeSet<Address>>,
    whitelisted_oracles: RwLock<BTreeSet<Address>>,
    paused: AtomicBool,
    busy: AtomicBool,
}

impl LiquidationStrategy {
    pub fn new(
        address: Address,
        admin: Address,
        ledger: Arc<TokenLedger>,
        treasury_pool: Arc<Pool>,
        reward_pool: Address,
        schedule: LiquidationSchedule,
    ) -> Result<Self, StrategyError> {
        if reward_pool == Address::ZERO {
            return Err(StrategyError::InvalidRewardPool);
        }
        Ok(Self {
            address,
            access: AccessControl::new(admin),
            ledger,
            treasury_pool: RwLock::new(treasury_pool),
            reward_pool: RwLock::new(reward_pool),
            schedule: RwLock::new(schedule),
            whitelisted_liquidators: RwLock::new(BTreeSet::new()),
            whitelisted_oracles: RwLock::new(BTreeSet::new()),
            paused: AtomicBool::new(false),
            busy: AtomicBool::new(false),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn reward_pool(&self) -> Address {
        *self.reward_pool.read()
    }

    pub fn treasury_pool(&self) -> Arc<Pool> {
        self.treasury_pool.read().clone()
    }

    pub fn schedule(&self) -> LiquidationSchedule {
        *self.schedule.read()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_liquidation_enabled(&self, now: u64) -> bool {
        !self.is_paused() && self.schedule.read().is_enabled(now)
    }

    // ---- admin surface ----

    pub fn update_treasury_pool(
        &self,
        caller: Address,
        pool: Arc<Pool>,
    ) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        if pool.address() == Address::ZERO {
            return Err(StrategyError::InvalidTreasuryPool);
        }
        info!(pool = %pool.address(), "Treasury pool updated");
        *self.treasury_pool.write() = pool;
        Ok(())
    }

    pub fn update_reward_pool(
        &self,
        caller: Address,
        reward_pool: Address,
    ) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        if reward_pool == Address::ZERO {
            return Err(StrategyError::InvalidRewardPool);
        }
        info!(reward_pool = %reward_pool, "Reward pool updated");
        *self.reward_pool.write() = reward_pool;
        Ok(())
    }

    pub fn update_liquidation_schedule(
        &self,
        caller: Address,
        start_time: u64,
        repeated_period: u64,
        duration: u64,
    ) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        let schedule = LiquidationSchedule::new(start_time, repeated_period, duration)?;
        info!(start_time, repeated_period, duration, "Liquidation schedule updated");
        *self.schedule.write() = schedule;
        Ok(())
    }

    /// Add liquidators; present entries are a no-op.
    pub fn add_liquidators(
        &self,
        caller: Address,
        liquidators: &[Address],
    ) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        let mut whitelist = self.whitelisted_liquidators.write();
        for liquidator in liquidators {
            if whitelist.insert(*liquidator) {
                info!(liquidator = %liquidator, "Liquidator whitelisted");
            }
        }
        Ok(())
    }

    /// Remove liquidators; absent entries are a no-op.
    pub fn remove_liquidators(
        &self,
        caller: Address,
        liquidators: &[Address],
    ) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        let mut whitelist = self.whitelisted_liquidators.write();
        for liquidator in liquidators {
            if whitelist.remove(liquidator) {
                info!(liquidator = %liquidator, "Liquidator removed");
            }
        }
        Ok(())
    }

    pub fn is_whitelisted_liquidator(&self, liquidator: Address) -> bool {
        self.whitelisted_liquidators.read().contains(&liquidator)
    }

    /// Whitelist an oracle; re-adding a present one is rejected.
    pub fn add_oracle(&self, caller: Address, oracle: Address) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        if !self.whitelisted_oracles.write().insert(oracle) {
            return Err(StrategyError::OracleAlreadyWhitelisted);
        }
        info!(oracle = %oracle, "Oracle whitelisted");
        Ok(())
    }

    /// Remove an oracle; removing an absent one is rejected.
    pub fn remove_oracle(&self, caller: Address, oracle: Address) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        if !self.whitelisted_oracles.write().remove(&oracle) {
            return Err(StrategyError::OnlyWhitelistedOracle);
        }
        info!(oracle = %oracle, "Oracle removed");
        Ok(())
    }

    pub fn is_whitelisted_oracle(&self, oracle: Address) -> bool {
        self.whitelisted_oracles.read().contains(&oracle)
    }

    /// Operators may pause, only the admin unpauses.
    pub fn pause(&self, caller: Address) -> Result<(), StrategyError> {
        self.access.check_operator(caller)?;
        self.paused.store(true, Ordering::SeqCst);
        info!(strategy = %self.address, "Strategy paused");
        Ok(())
    }

    pub fn unpause(&self, caller: Address) -> Result<(), StrategyError> {
        self.access.check_admin(caller)?;
        self.paused.store(false, Ordering::SeqCst);
        info!(strategy = %self.address, "Strategy unpaused");
        Ok(())
    }

    // ---- liquidation ----

    /// Run one liquidation. Returns the amount forwarded to the reward pool.
    #[allow(clippy::too_many_arguments)]
    pub fn liquidate(
        &self,
        caller: Address,
        oracle: &dyn PriceSource,
        sources: &[Address],
        amounts: &[U256],
        callback: &dyn LiquidationCallback,
        dest_token: Address,
        hint: &[LiquidationKind],
        tx_data: &[u8],
        now: u64,
    ) -> Result<U256, StrategyError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StrategyError::ReentrantCall);
        }
        let _guard = BusyGuard(&self.busy);

        let snapshot = self.ledger.snapshot();
        let result = self.liquidate_inner(
            caller, oracle, sources, amounts, callback, dest_token, hint, tx_data, now,
        );
        if let Err(e) = &result {
            warn!(caller = %caller, error = %e, "Liquidation reverted");
            self.ledger.restore(&snapshot);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn liquidate_inner(
        &self,
        caller: Address,
        oracle: &dyn PriceSource,
        sources: &[Address],
        amounts: &[U256],
        callback: &dyn LiquidationCallback,
        dest_token: Address,
        hint: &[LiquidationKind],
        tx_data: &[u8],
        now: u64,
    ) -> Result<U256, StrategyError> {
        if self.is_paused() {
            return Err(StrategyError::Paused);
        }
        if !self.schedule.read().is_enabled(now) {
            return Err(StrategyError::LiquidationDisabled);
        }
        if !self.is_whitelisted_liquidator(caller) {
            return Err(StrategyError::OnlyWhitelistedLiquidator);
        }
        if !self.is_whitelisted_oracle(oracle.id()) {
            return Err(StrategyError::OnlyWhitelistedOracle);
        }
        if sources.len() != amounts.len() || sources.len() != hint.len() {
            return Err(StrategyError::InvalidLengths);
        }

        let min_return =
            oracle.get_expected_return(caller, sources, amounts, dest_token, hint, now)?;
        if min_return.is_zero() {
            return Err(StrategyError::ZeroMinReturn);
        }

        let treasury_pool = self.treasury_pool();
        treasury_pool.withdraw_funds(self.address, sources, amounts, callback.address())?;

        let balance_before = self.ledger.balance_of(dest_token, self.address);
        callback
            .on_liquidation(caller, sources, amounts, self, dest_token, min_return, tx_data)
            .map_err(|e| StrategyError::Callback(e.to_string()))?;
        let balance_after = self.ledger.balance_of(dest_token, self.address);

        let returned = balance_after.saturating_sub(balance_before);
        if returned < min_return {
            return Err(StrategyError::LowReturnAmount);
        }

        let reward_pool = self.reward_pool();
        self.ledger
            .transfer(dest_token, self.address, reward_pool, returned)?;

        info!(
            caller = %caller,
            dest = %dest_token,
            %min_return,
            %returned,
            reward_pool = %reward_pool,
            "Liquidation settled"
        );
        Ok(returned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NATIVE_TOKEN_ADDRESS;
    use alloy::primitives::address;
    use parking_lot::Mutex;

    const STRATEGY_ADDR: Address = address!("7000000000000000000000000000000000000001");
    const ADMIN: Address = address!("7000000000000000000000000000000000000002");
    const LIQUIDATOR: Address = address!("7000000000000000000000000000000000000003");
    const POOL_ADDR: Address = address!("7000000000000000000000000000000000000004");
    const REWARD: Address = address!("7000000000000000000000000000000000000005");
    const CALLBACK_ADDR: Address = address!("7000000000000000000000000000000000000006");
    const ORACLE_ID: Address = address!("7000000000000000000000000000000000000007");

    const SRC: Address = address!("7000000000000000000000000000000000000011");
    const DEST: Address = address!("7000000000000000000000000000000000000012");

    const NOW: u64 = 1_700_000_000;

    /// Oracle stub with a fixed expected return.
    struct FixedOracle(U256);

    impl PriceSource for FixedOracle {
        fn id(&self) -> Address {
            ORACLE_ID
        }

        fn get_expected_return(
            &self,
            _liquidator: Address,
            _sources: &[Address],
            _amounts: &[U256],
            _dest: Address,
            _hint: &[LiquidationKind],
            _now: u64,
        ) -> Result<U256, OracleError> {
            Ok(self.0)
        }
    }

    /// Callback returning a configurable amount of the destination token
    /// from its own pre-funded stash.
    struct StashCallback {
        ledger: Arc<TokenLedger>,
        return_amount: U256,
    }

    impl LiquidationCallback for StashCallback {
        fn address(&self) -> Address {
            CALLBACK_ADDR
        }

        fn on_liquidation(
            &self,
            _caller: Address,
            _sources: &[Address],
            _amounts: &[U256],
            strategy: &LiquidationStrategy,
            dest_token: Address,
            _min_return: U256,
            _tx_data: &[u8],
        ) -> anyhow::Result<()> {
            self.ledger
                .transfer(dest_token, CALLBACK_ADDR, strategy.address(), self.return_amount)?;
            Ok(())
        }
    }

    /// Callback that tries to re-enter `liquidate` and records the outcome.
    struct ReenteringCallback {
        ledger: Arc<TokenLedger>,
        oracle: FixedOracle,
        observed: Mutex<Option<String>>,
    }

    impl LiquidationCallback for ReenteringCallback {
        fn address(&self) -> Address {
            CALLBACK_ADDR
        }

        fn on_liquidation(
            &self,
            caller: Address,
            sources: &[Address],
            amounts: &[U256],
            strategy: &LiquidationStrategy,
            dest_token: Address,
            min_return: U256,
            tx_data: &[u8],
        ) -> anyhow::Result<()> {
            let hint = vec![LiquidationKind::Token; sources.len()];
            let reentry = strategy.liquidate(
                caller, &self.oracle, sources, amounts, self, dest_token, &hint, tx_data, NOW,
            );
            *self.observed.lock() = reentry.err().map(|e| e.to_string());

            // settle honestly so only the recorded reentry result differs
            self.ledger
                .transfer(dest_token, CALLBACK_ADDR, strategy.address(), min_return)?;
            Ok(())
        }
    }

    fn setup(return_amount: U256) -> (LiquidationStrategy, Arc<TokenLedger>, StashCallback) {
        let ledger = Arc::new(TokenLedger::new());
        ledger.register_token(SRC, 18);
        ledger.register_token(DEST, 18);
        ledger.mint(SRC, POOL_ADDR, U256::from(1_000u64));
        ledger.mint(DEST, CALLBACK_ADDR, U256::from(10_000u64));

        let pool = Arc::new(Pool::new(POOL_ADDR, ADMIN, ledger.clone()));
        pool.authorize_strategies(ADMIN, &[STRATEGY_ADDR]).unwrap();

        let strategy = LiquidationStrategy::new(
            STRATEGY_ADDR,
            ADMIN,
            ledger.clone(),
            pool,
            REWARD,
            LiquidationSchedule::new(0, 1, 1).unwrap(),
        )
        .unwrap();
        strategy.add_liquidators(ADMIN, &[LIQUIDATOR]).unwrap();
        strategy.add_oracle(ADMIN, ORACLE_ID).unwrap();

        let callback = StashCallback {
            ledger: ledger.clone(),
            return_amount,
        };
        (strategy, ledger, callback)
    }

    #[test]
    fn test_successful_liquidation_forwards_to_reward_pool() {
        let min_return = U256::from(500u64);
        let (strategy, ledger, callback) = setup(min_return);
        let oracle = FixedOracle(min_return);

        let forwarded = strategy
            .liquidate(
                LIQUIDATOR,
                &oracle,
                &[SRC],
                &[U256::from(100u64)],
                &callback,
                DEST,
                &[LiquidationKind::Token],
                &[],
                NOW,
            )
            .unwrap();

        assert_eq!(forwarded, min_return);
        assert_eq!(ledger.balance_of(DEST, REWARD), min_return);
        // source assets reached the callback
        assert_eq!(ledger.balance_of(SRC, CALLBACK_ADDR), U256::from(100u64));
        assert_eq!(ledger.balance_of(SRC, POOL_ADDR), U256::from(900u64));
        // nothing lingers at the strategy
        assert_eq!(ledger.balance_of(DEST, STRATEGY_ADDR), U256::ZERO);
    }

    #[test]
    fn test_low_return_rolls_back_everything() {
        let min_return = U256::from(500u64);
        let (strategy, ledger, callback) = setup(min_return - U256::from(1u64));
        let oracle = FixedOracle(min_return);

        let err = strategy
            .liquidate(
                LIQUIDATOR,
                &oracle,
                &[SRC],
                &[U256::from(100u64)],
                &callback,
                DEST,
                &[LiquidationKind::Token],
                &[],
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "low return amount");

        // the rollback left the treasury whole
        assert_eq!(ledger.balance_of(SRC, POOL_ADDR), U256::from(1_000u64));
        assert_eq!(ledger.balance_of(SRC, CALLBACK_ADDR), U256::ZERO);
        assert_eq!(ledger.balance_of(DEST, CALLBACK_ADDR), U256::from(10_000u64));
        assert_eq!(ledger.balance_of(DEST, REWARD), U256::ZERO);
    }

    #[test]
    fn test_zero_min_return_rejected() {
        let (strategy, _, callback) = setup(U256::ZERO);
        let oracle = FixedOracle(U256::ZERO);
        let err = strategy
            .liquidate(
                LIQUIDATOR,
                &oracle,
                &[SRC],
                &[U256::from(100u64)],
                &callback,
                DEST,
                &[LiquidationKind::Token],
                &[],
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "0 min return");
    }

    #[test]
    fn test_gating_checks() {
        let min_return = U256::from(10u64);
        let (strategy, _, callback) = setup(min_return);
        let oracle = FixedOracle(min_return);
        let sources = [SRC];
        let amounts = [U256::from(1u64)];
        let hint = [LiquidationKind::Token];

        // unknown liquidator
        let err = strategy
            .liquidate(ADMIN, &oracle, &sources, &amounts, &callback, DEST, &hint, &[], NOW)
            .unwrap_err();
        assert_eq!(err.to_string(), "only whitelisted liquidator");

        // unknown oracle
        strategy.remove_oracle(ADMIN, ORACLE_ID).unwrap();
        let err = strategy
            .liquidate(LIQUIDATOR, &oracle, &sources, &amounts, &callback, DEST, &hint, &[], NOW)
            .unwrap_err();
        assert_eq!(err.to_string(), "only whitelisted oracle");
        strategy.add_oracle(ADMIN, ORACLE_ID).unwrap();

        // closed schedule window
        strategy
            .update_liquidation_schedule(ADMIN, NOW + 1_000, 100, 10)
            .unwrap();
        let err = strategy
            .liquidate(LIQUIDATOR, &oracle, &sources, &amounts, &callback, DEST, &hint, &[], NOW)
            .unwrap_err();
        assert_eq!(err.to_string(), "only when liquidation enabled");
        strategy.update_liquidation_schedule(ADMIN, 0, 1, 1).unwrap();

        // paused
        strategy.pause(ADMIN).unwrap();
        let err = strategy
            .liquidate(LIQUIDATOR, &oracle, &sources, &amounts, &callback, DEST, &hint, &[], NOW)
            .unwrap_err();
        assert_eq!(err.to_string(), "paused");
    }

    #[test]
    fn test_reentrancy_is_rejected() {
        let min_return = U256::from(100u64);
        let (strategy, ledger, _) = setup(min_return);
        let callback = ReenteringCallback {
            ledger: ledger.clone(),
            oracle: FixedOracle(min_return),
            observed: Mutex::new(None),
        };
        let oracle = FixedOracle(min_return);

        // the outer call succeeds; only the inner attempt is rejected
        strategy
            .liquidate(
                LIQUIDATOR,
                &oracle,
                &[SRC],
                &[U256::from(10u64)],
                &callback,
                DEST,
                &[LiquidationKind::Token],
                &[],
                NOW,
            )
            .unwrap();

        assert_eq!(
            callback.observed.lock().as_deref(),
            Some("reentrant call")
        );
        assert_eq!(ledger.balance_of(DEST, REWARD), min_return);
    }

    #[test]
    fn test_refused_native_reward_pool_reverts() {
        let min_return = U256::from(50u64);
        let (strategy, ledger, _) = setup(min_return);
        ledger.mint(NATIVE_TOKEN_ADDRESS, CALLBACK_ADDR, U256::from(1_000u64));
        ledger.set_native_rejecting(REWARD, true);

        let callback = StashCallback {
            ledger: ledger.clone(),
            return_amount: min_return,
        };
        let oracle = FixedOracle(min_return);

        let err = strategy
            .liquidate(
                LIQUIDATOR,
                &oracle,
                &[SRC],
                &[U256::from(10u64)],
                &callback,
                NATIVE_TOKEN_ADDRESS,
                &[LiquidationKind::Token],
                &[],
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "transfer eth failed");
        // rollback restored the callback's native stash
        assert_eq!(
            ledger.balance_of(NATIVE_TOKEN_ADDRESS, CALLBACK_ADDR),
            U256::from(1_000u64)
        );
    }

    #[test]
    fn test_oracle_whitelist_duplicate_policy() {
        let (strategy, _, _) = setup(U256::from(1u64));
        let err = strategy.add_oracle(ADMIN, ORACLE_ID).unwrap_err();
        assert_eq!(err.to_string(), "only not whitelisted oracle");

        strategy.remove_oracle(ADMIN, ORACLE_ID).unwrap();
        let err = strategy.remove_oracle(ADMIN, ORACLE_ID).unwrap_err();
        assert_eq!(err.to_string(), "only whitelisted oracle");
    }

    #[test]
    fn test_liquidator_whitelist_is_idempotent() {
        let (strategy, _, _) = setup(U256::from(1u64));
        // re-adding and re-removing are no-ops, not errors
        strategy.add_liquidators(ADMIN, &[LIQUIDATOR]).unwrap();
        strategy.remove_liquidators(ADMIN, &[LIQUIDATOR]).unwrap();
        strategy.remove_liquidators(ADMIN, &[LIQUIDATOR]).unwrap();
        assert!(!strategy.is_whitelisted_liquidator(LIQUIDATOR));
    }

    #[test]
    fn test_pool_update_validation() {
        let (strategy, ledger, _) = setup(U256::from(1u64));
        let zero_pool = Arc::new(Pool::new(Address::ZERO, ADMIN, ledger));
        let err = strategy.update_treasury_pool(ADMIN, zero_pool).unwrap_err();
        assert_eq!(err.to_string(), "invalid treasury pool");

        let err = strategy.update_reward_pool(ADMIN, Address::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "invalid reward pool");
    }
}
