//! Timelocked execution of approved proposal actions.

use alloy::primitives::{Address, B256};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::info;

use kyberdao_treasury::{TokenLedger, NATIVE_TOKEN_ADDRESS};

use crate::errors::{GovernanceError, GovernanceResult};
use crate::proposal::{Proposal, ProposalAction};

/// Timelock policy object: queues approved actions, enforces the delay and
/// grace window, and performs the actual execution.
pub trait Executor: Send + Sync {
    /// Identity used by the governance executor registry.
    fn id(&self) -> Address;

    /// Seconds between queueing and the earliest execution.
    fn delay(&self) -> u64;

    /// Seconds after `execution_time` during which execution stays possible.
    fn grace_period(&self) -> u64;

    fn queue_transaction(
        &self,
        action: &ProposalAction,
        execution_time: u64,
        now: u64,
    ) -> GovernanceResult<()>;

    /// Drop a queued action; absent actions are a no-op.
    fn cancel_transaction(&self, action: &ProposalAction, execution_time: u64);

    fn execute_transaction(
        &self,
        action: &ProposalAction,
        execution_time: u64,
        now: u64,
    ) -> GovernanceResult<()>;

    /// Reinstate an executed action's queue entry when a multi-action
    /// execution reverts partway (rollback path).
    fn restore_transaction(&self, action: &ProposalAction, execution_time: u64);

    fn is_action_queued(&self, key: B256) -> bool;

    /// Whether a proposal queued at `execution_time` can no longer execute.
    fn is_over_grace_period(&self, execution_time: u64, now: u64) -> bool;

    /// Whether `caller` (not the creator) may cancel the proposal.
    fn validate_proposal_cancellation(&self, proposal: &Proposal, caller: Address) -> bool;
}

/// Executor holding queued action keys and a native-currency budget for
/// actions that forward value.
pub struct TimelockExecutor {
    id: Address,
    delay: u64,
    grace_period: u64,
    ledger: Arc<TokenLedger>,
    queued: DashSet<B256>,
    /// Whether non-creator cancellation is permitted
    allow_foreign_cancellation: bool,
}

impl TimelockExecutor {
    pub fn new(id: Address, delay: u64, grace_period: u64, ledger: Arc<TokenLedger>) -> Self {
        Self {
            id,
            delay,
            grace_period,
            ledger,
            queued: DashSet::new(),
            allow_foreign_cancellation: false,
        }
    }

    pub fn with_foreign_cancellation(mut self, allowed: bool) -> Self {
        self.allow_foreign_cancellation = allowed;
        self
    }
}

impl Executor for TimelockExecutor {
    fn id(&self) -> Address {
        self.id
    }

    fn delay(&self) -> u64 {
        self.delay
    }

    fn grace_period(&self) -> u64 {
        self.grace_period
    }

    fn queue_transaction(
        &self,
        action: &ProposalAction,
        execution_time: u64,
        now: u64,
    ) -> GovernanceResult<()> {
        if execution_time < now + self.delay {
            return Err(GovernanceError::ExecutionTimeUnderestimated);
        }
        let key = action.action_key(execution_time);
        if !self.queued.insert(key) {
            return Err(GovernanceError::DuplicatedAction);
        }
        info!(
            executor = %self.id,
            target = %action.target,
            signature = %action.signature,
            execution_time,
            "Action queued"
        );
        Ok(())
    }

    fn cancel_transaction(&self, action: &ProposalAction, execution_time: u64) {
        let key = action.action_key(execution_time);
        if self.queued.remove(&key).is_some() {
            info!(
                executor = %self.id,
                target = %action.target,
                signature = %action.signature,
                "Queued action canceled"
            );
        }
    }

    fn execute_transaction(
        &self,
        action: &ProposalAction,
        execution_time: u64,
        now: u64,
    ) -> GovernanceResult<()> {
        let key = action.action_key(execution_time);
        if !self.queued.contains(&key) {
            return Err(GovernanceError::ActionNotQueued);
        }
        if now < execution_time {
            return Err(GovernanceError::TimelockNotFinished);
        }
        if now > execution_time + self.grace_period {
            return Err(GovernanceError::GracePeriodFinished);
        }

        if !action.wei_value.is_zero() {
            self.ledger.transfer(
                NATIVE_TOKEN_ADDRESS,
                self.id,
                action.target,
                action.wei_value,
            )?;
        }
        self.queued.remove(&key);
        info!(
            executor = %self.id,
            target = %action.target,
            signature = %action.signature,
            wei_value = %action.wei_value,
            delegatecall = action.with_delegatecall,
            "Action executed"
        );
        Ok(())
    }

    fn restore_transaction(&self, action: &ProposalAction, execution_time: u64) {
        self.queued.insert(action.action_key(execution_time));
    }

    fn is_action_queued(&self, key: B256) -> bool {
        self.queued.contains(&key)
    }

    fn is_over_grace_period(&self, execution_time: u64, now: u64) -> bool {
        execution_time != 0 && now > execution_time + self.grace_period
    }

    fn validate_proposal_cancellation(&self, _proposal: &Proposal, _caller: Address) -> bool {
        self.allow_foreign_cancellation
    }
}
