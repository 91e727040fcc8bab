//! KyberDAO governance and treasury-liquidation engine.
//!
//! Wires the configured deployment into a running engine and drives one
//! demonstration round end to end:
//! - a treasury liquidation (oracle pricing, pool withdrawal, DEX
//!   settlement, reward forwarding, vesting lock)
//! - a binary governance proposal (create, vote, queue, execute through the
//!   short timelock executor)
//!
//! Timestamps are simulated so the whole round runs in one invocation.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{address, Address, Bytes, I256, U256};
use anyhow::{ensure, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kyberdao_core::{GovernanceConfig, TreasuryConfig, PRECISION};
use kyberdao_governance::{
    BalanceVotingStrategy, EpochVotingStrategy, Governance, ProposalAction, ProposalState,
    StandardProposalValidator, TimelockExecutor, YES_MASK,
};
use kyberdao_treasury::{
    ChainlinkPriceOracle, DexRouter, KyberSwapLiquidator, LiquidationKind, LiquidationStrategy,
    Pool, PriceFeed, RewardLocker, StaticFeed, TokenLedger, NATIVE_TOKEN_ADDRESS,
};

/// Environment variable names.
mod env {
    pub const CONFIG_DIR: &str = "CONFIG_DIR";
}

// Engine component addresses for this deployment.
const ADMIN: Address = address!("e6a7338cba0a1070adfb22c07115299605454713");
const ORACLE_ID: Address = address!("f5d00e19a9f80ebd11a0a27d8f3575ba37120fde");
const STRATEGY_ADDR: Address = address!("c9e2d2f0b1c6e04c8a4e9596e7505c8415b3e0a8");
const ROUTER_ADDR: Address = address!("818e6fecd516ecc3849daf6845e3ec868087b755");
const ADAPTER_ADDR: Address = address!("9b27053efae8eb5a2bb123fe2ddf0167a275a0b9");
const LOCKER_ADDR: Address = address!("063dd8b5a42aae93a014ce5fabb5b70474667961");
const SHORT_EXECUTOR: Address = address!("6758a66cd25fbd5a93fdfcd57a9c34beb10ac3ec");
const LONG_EXECUTOR: Address = address!("7b26ce9de771e1e9d51a0d4bac0aae0f2b19e18e");
const BALANCE_STRATEGY: Address = address!("4ae5b1dfc325b5b74dab439e26ffc197e04347cb");
const EPOCH_STRATEGY: Address = address!("204e2d49b7cda6d93301bcf667a2da28fb0e5780");
const LIQUIDATOR_EOA: Address = address!("2c6a3fe42f31a71b70501712fb58dba0aaef0a94");
const VOTER_A: Address = address!("3ca0a4668871a78e0e95fe55e3fa35e08877b807");
const VOTER_B: Address = address!("52a258ed593c793251a89bfd36cae158ee9fc4f8");

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,kyberdao_treasury=debug,kyberdao_governance=debug")
        }))
        .init();

    let config_dir =
        std::env::var(env::CONFIG_DIR).unwrap_or_else(|_| "./config".to_string());
    let governance_config = GovernanceConfig::from_file(format!("{config_dir}/governance.json"))?;
    let treasury_config = TreasuryConfig::from_file(format!("{config_dir}/treasury.toml"))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before epoch")?
        .as_secs();

    info!("Starting KyberDAO engine");
    run_liquidation_round(&treasury_config, now)?;
    run_governance_round(&governance_config, now)?;
    Ok(())
}

/// Build the treasury side from config and run one liquidation plus a
/// vesting lock of the proceeds.
fn run_liquidation_round(config: &TreasuryConfig, now: u64) -> Result<()> {
    ensure!(
        config.tokens.len() >= 2,
        "treasury config needs the reward token and at least one fee token"
    );

    let ledger = Arc::new(TokenLedger::new());
    let treasury_addr = config.pools.treasury_address()?;
    let reward_addr = config.pools.reward_address()?;

    let oracle = ChainlinkPriceOracle::new(
        ORACLE_ID,
        ADMIN,
        ledger.clone(),
        config.premium,
        config.oracle.min_valid_duration_secs,
    )
    .context("oracle setup")?;

    // Register configured tokens and their feeds.
    for token in &config.tokens {
        let token_addr = token.token_address()?;
        ledger.register_token(token_addr, token.decimals);

        let quote_eth = token.quote_eth_answer.map(|answer| {
            let decimals = token.quote_eth_decimals.unwrap_or(18);
            Arc::new(StaticFeed::new(
                decimals,
                I256::try_from(answer).unwrap_or(I256::ZERO),
                now,
            )) as Arc<dyn PriceFeed>
        });
        let quote_usd = token.quote_usd_answer.map(|answer| {
            let decimals = token.quote_usd_decimals.unwrap_or(8);
            Arc::new(StaticFeed::new(
                decimals,
                I256::try_from(answer).unwrap_or(I256::ZERO),
                now,
            )) as Arc<dyn PriceFeed>
        });
        oracle
            .update_aggregator_proxy_data(ADMIN, token_addr, quote_eth, quote_usd)
            .with_context(|| format!("feed listing for {}", token.symbol))?;
        info!(symbol = %token.symbol, address = %token_addr, "Token listed");
    }

    // By convention the first configured token is the reward (destination)
    // token, the rest are liquidatable fee revenue.
    let knc = config.tokens[0].token_address()?;
    let link = config.tokens[1].token_address()?;
    oracle
        .add_whitelisted_tokens(ADMIN, &[knc])
        .context("destination whitelist")?;

    // Treasury custody: fee revenue waiting for liquidation.
    let treasury_pool = Arc::new(Pool::new(treasury_addr, ADMIN, ledger.clone()));
    ledger.mint(link, treasury_addr, U256::from(100u64) * PRECISION);

    let strategy = LiquidationStrategy::new(
        STRATEGY_ADDR,
        ADMIN,
        ledger.clone(),
        treasury_pool.clone(),
        reward_addr,
        config.schedule.to_schedule()?,
    )
    .context("strategy setup")?;
    treasury_pool
        .authorize_strategies(ADMIN, &[STRATEGY_ADDR])
        .context("strategy authorization")?;
    strategy
        .add_liquidators(ADMIN, &[LIQUIDATOR_EOA])
        .context("liquidator whitelist")?;
    strategy.add_oracle(ADMIN, ORACLE_ID).context("oracle whitelist")?;

    // Settlement venue quoted at the oracle rate, with KNC inventory.
    let router = Arc::new(DexRouter::new(ROUTER_ADDR, ledger.clone()));
    router.set_rate(link, knc, oracle.conversion_rate(link, knc, now));
    ledger.mint(knc, ROUTER_ADDR, U256::from(10_000u64) * PRECISION);
    let adapter = KyberSwapLiquidator::new(ADAPTER_ADDR, ledger.clone(), router);

    let forwarded = strategy
        .liquidate(
            LIQUIDATOR_EOA,
            &oracle,
            &[link],
            &[U256::from(100u64) * PRECISION],
            &adapter,
            knc,
            &[LiquidationKind::Token],
            &[],
            now,
        )
        .context("liquidation")?;
    info!(%forwarded, reward_pool = %reward_addr, "Liquidation round complete");

    // Lock the proceeds and vest half way through the schedule.
    let locker = RewardLocker::new(LOCKER_ADDR, ADMIN, ledger.clone());
    locker
        .access()
        .add_operator(ADMIN, reward_addr)
        .context("locker operator")?;
    locker
        .set_vesting_duration(ADMIN, knc, 30 * 86_400)
        .context("vesting duration")?;
    locker
        .lock(reward_addr, knc, VOTER_A, forwarded, now)
        .context("reward lock")?;
    let vested = locker
        .vest(knc, VOTER_A, now + 15 * 86_400)
        .context("reward vest")?;
    info!(%vested, "Half the locked rewards vested after 15 days");
    Ok(())
}

/// Build governance from config and walk one binary proposal through its
/// full lifecycle on a simulated clock.
fn run_governance_round(config: &GovernanceConfig, now: u64) -> Result<()> {
    let ledger = Arc::new(TokenLedger::new());
    let knc = config.knc_address()?;
    let dao_operator = config.dao_operator_address()?;

    ledger.register_token(knc, 18);
    ledger.mint(knc, VOTER_A, U256::from(4_000_000u64) * PRECISION);
    ledger.mint(knc, VOTER_B, U256::from(2_500_000u64) * PRECISION);
    ledger.mint(NATIVE_TOKEN_ADDRESS, SHORT_EXECUTOR, U256::from(10u64) * PRECISION);

    let validator = Arc::new(StandardProposalValidator::from_params(&config.short_executor));
    let governance = Governance::new(ADMIN, dao_operator, validator, ledger.clone());
    governance
        .authorize_executors(
            ADMIN,
            vec![
                Arc::new(TimelockExecutor::new(
                    SHORT_EXECUTOR,
                    config.short_executor.delay,
                    config.short_executor.grace_period,
                    ledger.clone(),
                )),
                Arc::new(TimelockExecutor::new(
                    LONG_EXECUTOR,
                    config.long_executor.delay,
                    config.long_executor.grace_period,
                    ledger.clone(),
                )),
            ],
        )
        .context("executor registration")?;
    governance
        .authorize_voting_power_strategies(
            ADMIN,
            vec![
                Arc::new(BalanceVotingStrategy::new(BALANCE_STRATEGY, knc, ledger.clone())),
                Arc::new(EpochVotingStrategy::new(
                    EPOCH_STRATEGY,
                    knc,
                    ledger.clone(),
                    config.starttime,
                    config.epoch_period,
                )),
            ],
        )
        .context("strategy registration")?;

    let start = now + 3_600;
    let end = start + config.short_executor.min_voting_duration;
    let id = governance
        .create_binary_proposal(
            dao_operator,
            SHORT_EXECUTOR,
            BALANCE_STRATEGY,
            vec![ProposalAction {
                target: STRATEGY_ADDR,
                wei_value: U256::ZERO,
                signature: "updateLiquidationSchedule(uint256,uint256,uint256)".to_string(),
                calldata: Bytes::new(),
                with_delegatecall: false,
            }],
            start,
            end,
            "ipfs://QmShortExecutorScheduleChange".to_string(),
            now,
        )
        .context("proposal creation")?;

    governance
        .submit_vote(VOTER_A, id, YES_MASK, start + 60)
        .context("vote A")?;
    governance
        .submit_vote(VOTER_B, id, YES_MASK, start + 120)
        .context("vote B")?;

    let state = governance.get_proposal_state(id, end).context("state lookup")?;
    info!(id, ?state, "Voting closed");

    governance.queue(dao_operator, id, end).context("queue")?;
    let execution_time = end + config.short_executor.delay;
    governance
        .execute(dao_operator, id, execution_time)
        .context("execute")?;

    let state = governance
        .get_proposal_state(id, execution_time)
        .context("state lookup")?;
    ensure!(
        state == ProposalState::Executed,
        "proposal ended in unexpected state {state:?}"
    );
    info!(id, ?state, "Governance round complete");
    Ok(())
}
