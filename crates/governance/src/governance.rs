//! Proposal lifecycle state machine.
//!
//! Proposals are created by the DAO operator against a registered executor
//! and voting-power strategy, voted on while active, and (for binary
//! proposals) queued into the executor's timelock once succeeded and
//! executed inside the grace window. Generic proposals finalize without
//! side effects and can never be queued or executed.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use kyberdao_core::AccessControl;
use kyberdao_treasury::TokenLedger;

use crate::errors::{GovernanceError, GovernanceResult};
use crate::executor::Executor;
use crate::proposal::{
    Proposal, ProposalAction, ProposalKind, ProposalState, Vote, NO_MASK, YES_MASK,
};
use crate::strategy::VotingPowerStrategy;
use crate::validator::ProposalValidator;

/// Governance engine.
pub struct Governance {
    access: AccessControl,
    dao_operator: Address,
    validator: Arc<dyn ProposalValidator>,
    ledger: Arc<TokenLedger>,
    executors: DashMap<Address, Arc<dyn Executor>>,
    strategies: DashMap<Address, Arc<dyn VotingPowerStrategy>>,
    proposals: DashMap<u64, Proposal>,
    votes: DashMap<(u64, Address), Vote>,
    next_id: AtomicU64,
}

impl Governance {
    pub fn new(
        admin: Address,
        dao_operator: Address,
        validator: Arc<dyn ProposalValidator>,
        ledger: Arc<TokenLedger>,
    ) -> Self {
        Self {
            access: AccessControl::new(admin),
            dao_operator,
            validator,
            ledger,
            executors: DashMap::new(),
            strategies: DashMap::new(),
            proposals: DashMap::new(),
            votes: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn dao_operator(&self) -> Address {
        self.dao_operator
    }

    // ---- registries ----

    /// Register executors; re-registration overwrites silently.
    pub fn authorize_executors(
        &self,
        caller: Address,
        executors: Vec<Arc<dyn Executor>>,
    ) -> GovernanceResult<()> {
        self.access.check_admin(caller)?;
        for executor in executors {
            info!(executor = %executor.id(), "Executor authorized");
            self.executors.insert(executor.id(), executor);
        }
        Ok(())
    }

    /// Drop executors; absent entries are a no-op.
    pub fn unauthorize_executors(
        &self,
        caller: Address,
        executor_ids: &[Address],
    ) -> GovernanceResult<()> {
        self.access.check_admin(caller)?;
        for id in executor_ids {
            if self.executors.remove(id).is_some() {
                info!(executor = %id, "Executor unauthorized");
            }
        }
        Ok(())
    }

    pub fn is_executor_authorized(&self, id: Address) -> bool {
        self.executors.contains_key(&id)
    }

    /// Register voting-power strategies; re-registration overwrites silently.
    pub fn authorize_voting_power_strategies(
        &self,
        caller: Address,
        strategies: Vec<Arc<dyn VotingPowerStrategy>>,
    ) -> GovernanceResult<()> {
        self.access.check_admin(caller)?;
        for strategy in strategies {
            info!(strategy = %strategy.id(), "Voting power strategy authorized");
            self.strategies.insert(strategy.id(), strategy);
        }
        Ok(())
    }

    /// Drop strategies; absent entries are a no-op.
    pub fn unauthorize_voting_power_strategies(
        &self,
        caller: Address,
        strategy_ids: &[Address],
    ) -> GovernanceResult<()> {
        self.access.check_admin(caller)?;
        for id in strategy_ids {
            if self.strategies.remove(id).is_some() {
                info!(strategy = %id, "Voting power strategy unauthorized");
            }
        }
        Ok(())
    }

    pub fn is_strategy_authorized(&self, id: Address) -> bool {
        self.strategies.contains_key(&id)
    }

    // ---- proposal creation ----

    #[allow(clippy::too_many_arguments)]
    pub fn create_binary_proposal(
        &self,
        caller: Address,
        executor_id: Address,
        strategy_id: Address,
        actions: Vec<ProposalAction>,
        start_time: u64,
        end_time: u64,
        link: String,
        now: u64,
    ) -> GovernanceResult<u64> {
        let kind = ProposalKind::Binary {
            vote_counts: [U256::ZERO, U256::ZERO],
            actions,
        };
        self.create_proposal(caller, executor_id, strategy_id, kind, start_time, end_time, link, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_generic_proposal(
        &self,
        caller: Address,
        executor_id: Address,
        strategy_id: Address,
        options: Vec<String>,
        start_time: u64,
        end_time: u64,
        link: String,
        now: u64,
    ) -> GovernanceResult<u64> {
        let kind = ProposalKind::Generic {
            vote_counts: vec![U256::ZERO; options.len()],
            options,
        };
        self.create_proposal(caller, executor_id, strategy_id, kind, start_time, end_time, link, now)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_proposal(
        &self,
        caller: Address,
        executor_id: Address,
        strategy_id: Address,
        kind: ProposalKind,
        start_time: u64,
        end_time: u64,
        link: String,
        now: u64,
    ) -> GovernanceResult<u64> {
        if caller != self.dao_operator {
            return Err(GovernanceError::OnlyDaoOperator);
        }
        if !self.executors.contains_key(&executor_id) {
            return Err(GovernanceError::ExecutorNotAuthorized);
        }
        let strategy = self
            .strategies
            .get(&strategy_id)
            .ok_or(GovernanceError::StrategyNotAuthorized)?
            .clone();

        match &kind {
            ProposalKind::Binary { actions, .. } => self
                .validator
                .validate_binary_proposal_creation(start_time, end_time, now, actions.len())?,
            ProposalKind::Generic { options, .. } => self
                .validator
                .validate_generic_proposal_creation(start_time, end_time, now, options.len())?,
        }
        if !strategy.validate_proposal_creation(start_time, end_time) {
            return Err(GovernanceError::StrategyValidationFailed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let proposal = Proposal {
            id,
            creator: caller,
            executor_id,
            strategy_id,
            start_time,
            end_time,
            execution_time: 0,
            max_voting_power: strategy.max_voting_power(now),
            link,
            executed: false,
            canceled: false,
            total_votes: U256::ZERO,
            kind,
        };
        info!(
            id,
            binary = proposal.is_binary(),
            start_time,
            end_time,
            executor = %executor_id,
            strategy = %strategy_id,
            "Proposal created"
        );
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    // ---- voting ----

    pub fn submit_vote(
        &self,
        caller: Address,
        proposal_id: u64,
        option_bitmask: u32,
        now: u64,
    ) -> GovernanceResult<()> {
        let mut entry = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        let proposal = entry.value_mut();

        if self.state_of(proposal, now) != ProposalState::Active {
            return Err(GovernanceError::VotingClosed);
        }
        if proposal.is_binary() {
            if option_bitmask != YES_MASK && option_bitmask != NO_MASK {
                return Err(GovernanceError::WrongBinaryVote);
            }
        } else {
            let option_count = proposal.option_count();
            if option_bitmask == 0 || option_bitmask >= (1u32 << option_count) {
                return Err(GovernanceError::InvalidOptions);
            }
        }

        let strategy = self
            .strategies
            .get(&proposal.strategy_id)
            .ok_or(GovernanceError::StrategyNotAuthorized)?
            .clone();
        let voting_power = strategy.voting_power(caller, now);

        let new_vote = Vote {
            option_bitmask,
            voting_power,
        };
        let old_vote = self.votes.insert((proposal_id, caller), new_vote);
        proposal.apply_vote_change(old_vote, new_vote);
        strategy.handle_vote(caller, proposal_id, voting_power);

        info!(
            proposal_id,
            voter = %caller,
            option_bitmask,
            %voting_power,
            revote = old_vote.is_some(),
            "Vote submitted"
        );
        Ok(())
    }

    // ---- lifecycle ----

    pub fn cancel(&self, caller: Address, proposal_id: u64, now: u64) -> GovernanceResult<()> {
        let mut entry = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        let proposal = entry.value_mut();
        let state = self.state_of(proposal, now);

        let uncancelable = if proposal.is_binary() {
            matches!(
                state,
                ProposalState::Canceled | ProposalState::Executed | ProposalState::Expired
            )
        } else {
            matches!(state, ProposalState::Canceled | ProposalState::Finalized)
        };
        if uncancelable {
            return Err(GovernanceError::InvalidStateToCancel);
        }

        let executor = self
            .executors
            .get(&proposal.executor_id)
            .ok_or(GovernanceError::ExecutorNotAuthorized)?
            .clone();
        if caller != proposal.creator && !executor.validate_proposal_cancellation(proposal, caller)
        {
            return Err(GovernanceError::CancellationNotValidated);
        }

        proposal.canceled = true;
        if proposal.execution_time != 0 {
            for action in proposal.actions() {
                executor.cancel_transaction(action, proposal.execution_time);
            }
        }
        if let Some(strategy) = self.strategies.get(&proposal.strategy_id) {
            strategy.handle_proposal_cancellation(proposal_id);
        }
        info!(proposal_id, caller = %caller, "Proposal canceled");
        Ok(())
    }

    /// Queue a succeeded binary proposal into its executor's timelock.
    pub fn queue(&self, caller: Address, proposal_id: u64, now: u64) -> GovernanceResult<()> {
        let mut entry = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        let proposal = entry.value_mut();

        if self.state_of(proposal, now) != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidStateToQueue);
        }
        let executor = self
            .executors
            .get(&proposal.executor_id)
            .ok_or(GovernanceError::ExecutorNotAuthorized)?
            .clone();

        let execution_time = now + executor.delay();

        // no action may be applied unless every action can be queued
        let keys: Vec<_> = proposal
            .actions()
            .iter()
            .map(|a| a.action_key(execution_time))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            if executor.is_action_queued(*key) || keys[..i].contains(key) {
                return Err(GovernanceError::DuplicatedAction);
            }
        }
        for action in proposal.actions() {
            executor.queue_transaction(action, execution_time, now)?;
        }

        proposal.execution_time = execution_time;
        info!(proposal_id, caller = %caller, execution_time, "Proposal queued");
        Ok(())
    }

    /// Execute a queued binary proposal. Ledger effects are atomic: if any
    /// action fails, everything executed so far is rolled back.
    pub fn execute(&self, caller: Address, proposal_id: u64, now: u64) -> GovernanceResult<()> {
        let mut entry = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        let proposal = entry.value_mut();

        if self.state_of(proposal, now) != ProposalState::Queued {
            return Err(GovernanceError::OnlyQueuedProposals);
        }
        let executor = self
            .executors
            .get(&proposal.executor_id)
            .ok_or(GovernanceError::ExecutorNotAuthorized)?
            .clone();

        let snapshot = self.ledger.snapshot();
        for (i, action) in proposal.actions().iter().enumerate() {
            if let Err(e) = executor.execute_transaction(action, proposal.execution_time, now) {
                warn!(proposal_id, error = %e, "Execution reverted");
                self.ledger.restore(&snapshot);
                for executed in &proposal.actions()[..i] {
                    executor.restore_transaction(executed, proposal.execution_time);
                }
                return Err(e);
            }
        }

        proposal.executed = true;
        info!(proposal_id, caller = %caller, "Proposal executed");
        Ok(())
    }

    // ---- views ----

    pub fn proposals_count(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst) - 1
    }

    pub fn proposal(&self, proposal_id: u64) -> Option<Proposal> {
        self.proposals.get(&proposal_id).map(|e| e.value().clone())
    }

    pub fn vote_of(&self, proposal_id: u64, voter: Address) -> Option<Vote> {
        self.votes.get(&(proposal_id, voter)).map(|e| *e.value())
    }

    pub fn get_proposal_state(
        &self,
        proposal_id: u64,
        now: u64,
    ) -> GovernanceResult<ProposalState> {
        let entry = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        Ok(self.state_of(entry.value(), now))
    }

    fn state_of(&self, proposal: &Proposal, now: u64) -> ProposalState {
        if proposal.canceled {
            return ProposalState::Canceled;
        }
        if now < proposal.start_time {
            return ProposalState::Pending;
        }
        if now < proposal.end_time {
            return ProposalState::Active;
        }
        if !proposal.is_binary() {
            return ProposalState::Finalized;
        }
        if !self.validator.is_binary_proposal_passed(proposal) {
            return ProposalState::Failed;
        }
        if proposal.executed {
            return ProposalState::Executed;
        }
        if proposal.execution_time == 0 {
            return ProposalState::Succeeded;
        }
        let over_grace = self
            .executors
            .get(&proposal.executor_id)
            .map(|e| e.is_over_grace_period(proposal.execution_time, now))
            .unwrap_or(false);
        if over_grace {
            ProposalState::Expired
        } else {
            ProposalState::Queued
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TimelockExecutor;
    use crate::proposal::{NO, YES};
    use crate::strategy::BalanceVotingStrategy;
    use crate::validator::StandardProposalValidator;
    use alloy::primitives::{address, Bytes};
    use kyberdao_treasury::NATIVE_TOKEN_ADDRESS;

    const ADMIN: Address = address!("f000000000000000000000000000000000000001");
    const OPERATOR: Address = address!("f000000000000000000000000000000000000002");
    const EXECUTOR_ID: Address = address!("f000000000000000000000000000000000000003");
    const STRATEGY_ID: Address = address!("f000000000000000000000000000000000000004");
    const TARGET: Address = address!("f000000000000000000000000000000000000005");
    const KNC: Address = address!("f000000000000000000000000000000000000006");

    const ALICE: Address = address!("f000000000000000000000000000000000000011");
    const BOB: Address = address!("f000000000000000000000000000000000000012");
    const CAROL: Address = address!("f000000000000000000000000000000000000013");

    const DAY: u64 = 86_400;
    const DELAY: u64 = 100;
    const GRACE: u64 = 1_000;
    const NOW: u64 = 1_700_000_000;

    fn action() -> ProposalAction {
        ProposalAction {
            target: TARGET,
            wei_value: U256::from(25u64),
            signature: "setFee(uint256)".to_string(),
            calldata: Bytes::from(vec![9u8]),
            with_delegatecall: false,
        }
    }

    fn setup() -> (Governance, Arc<TokenLedger>) {
        let ledger = Arc::new(TokenLedger::new());
        ledger.register_token(KNC, 18);
        ledger.mint(KNC, ALICE, U256::from(400u64));
        ledger.mint(KNC, BOB, U256::from(250u64));
        ledger.mint(KNC, CAROL, U256::from(350u64));
        ledger.mint(NATIVE_TOKEN_ADDRESS, EXECUTOR_ID, U256::from(1_000u64));

        // quorum 4% of 1000 = 40 power, differential 0.5% = 5 power
        let validator = Arc::new(StandardProposalValidator::new(DAY, 4, 400, 50));
        let governance = Governance::new(ADMIN, OPERATOR, validator, ledger.clone());

        governance
            .authorize_executors(
                ADMIN,
                vec![Arc::new(TimelockExecutor::new(
                    EXECUTOR_ID,
                    DELAY,
                    GRACE,
                    ledger.clone(),
                ))],
            )
            .unwrap();
        governance
            .authorize_voting_power_strategies(
                ADMIN,
                vec![Arc::new(BalanceVotingStrategy::new(
                    STRATEGY_ID,
                    KNC,
                    ledger.clone(),
                ))],
            )
            .unwrap();
        (governance, ledger)
    }

    fn create_binary(governance: &Governance) -> u64 {
        governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action()],
                NOW + 10,
                NOW + 10 + DAY,
                "ipfs://proposal".to_string(),
                NOW,
            )
            .unwrap()
    }

    #[test]
    fn test_creation_gating() {
        let (governance, _) = setup();

        let err = governance
            .create_binary_proposal(
                ALICE,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "only dao operator");

        let unknown = address!("f0000000000000000000000000000000000000ff");
        let err = governance
            .create_binary_proposal(
                OPERATOR,
                unknown,
                STRATEGY_ID,
                vec![action()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "executor not authorized");

        let err = governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                unknown,
                vec![action()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "strategy not authorized");

        // 86399-second window is one second too short, 86400 is accepted
        let err = governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action()],
                NOW,
                NOW + DAY - 1,
                String::new(),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "too short duration");
        assert!(governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action()],
                NOW,
                NOW + DAY,
                String::new(),
                NOW,
            )
            .is_ok());
    }

    #[test]
    fn test_binary_tally_invariant_under_revoting() {
        let (governance, ledger) = setup();
        let id = create_binary(&governance);
        let voting = NOW + 20;

        let tally_consistent = |governance: &Governance| {
            let p = governance.proposal(id).unwrap();
            assert_eq!(p.vote_counts()[YES] + p.vote_counts()[NO], p.total_votes);
        };

        governance.submit_vote(ALICE, id, YES_MASK, voting).unwrap();
        tally_consistent(&governance);
        governance.submit_vote(BOB, id, NO_MASK, voting).unwrap();
        tally_consistent(&governance);

        // Alice flips to NO
        governance.submit_vote(ALICE, id, NO_MASK, voting).unwrap();
        tally_consistent(&governance);
        let p = governance.proposal(id).unwrap();
        assert_eq!(p.vote_counts()[YES], U256::ZERO);
        assert_eq!(p.vote_counts()[NO], U256::from(650u64));

        // Alice's balance changes, then she re-votes YES: her old 400 leaves
        // NO and her fresh 150 lands on YES
        ledger.transfer(KNC, ALICE, CAROL, U256::from(250u64)).unwrap();
        governance.submit_vote(ALICE, id, YES_MASK, voting).unwrap();
        tally_consistent(&governance);
        let p = governance.proposal(id).unwrap();
        assert_eq!(p.vote_counts()[YES], U256::from(150u64));
        assert_eq!(p.vote_counts()[NO], U256::from(250u64));
    }

    #[test]
    fn test_binary_vote_mask_validation() {
        let (governance, _) = setup();
        let id = create_binary(&governance);

        let err = governance
            .submit_vote(ALICE, id, YES_MASK | NO_MASK, NOW + 20)
            .unwrap_err();
        assert_eq!(err.to_string(), "wrong vote for binary proposal");
    }

    #[test]
    fn test_voting_window() {
        let (governance, _) = setup();
        let id = create_binary(&governance);

        // pending
        let err = governance.submit_vote(ALICE, id, YES_MASK, NOW + 5).unwrap_err();
        assert_eq!(err.to_string(), "voting closed");
        // last active second
        assert!(governance
            .submit_vote(ALICE, id, YES_MASK, NOW + 10 + DAY - 1)
            .is_ok());
        // endTime itself is closed
        let err = governance
            .submit_vote(BOB, id, YES_MASK, NOW + 10 + DAY)
            .unwrap_err();
        assert_eq!(err.to_string(), "voting closed");
    }

    #[test]
    fn test_generic_multi_select_revoting() {
        let (governance, _) = setup();
        let id = governance
            .create_generic_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec!["a".into(), "b".into(), "c".into()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap();
        let voting = NOW + 20;

        // invalid masks
        let err = governance.submit_vote(ALICE, id, 0, voting).unwrap_err();
        assert_eq!(err.to_string(), "invalid options");
        let err = governance.submit_vote(ALICE, id, 0b1000, voting).unwrap_err();
        assert_eq!(err.to_string(), "invalid options");

        // multi-select: options 0 and 2
        governance.submit_vote(ALICE, id, 0b101, voting).unwrap();
        let p = governance.proposal(id).unwrap();
        assert_eq!(p.vote_counts(), &[U256::from(400u64), U256::ZERO, U256::from(400u64)]);
        assert_eq!(p.total_votes, U256::from(400u64));

        // change to options 0 and 1: bit 2 drains, bit 1 fills, bit 0 stays
        governance.submit_vote(ALICE, id, 0b011, voting).unwrap();
        let p = governance.proposal(id).unwrap();
        assert_eq!(
            p.vote_counts(),
            &[U256::from(400u64), U256::from(400u64), U256::ZERO]
        );
        assert_eq!(p.total_votes, U256::from(400u64));

        // generic proposals finalize and can never be queued
        let err = governance.queue(ALICE, id, NOW + 10 + DAY).unwrap_err();
        assert_eq!(err.to_string(), "invalid state to queue");
        assert_eq!(
            governance.get_proposal_state(id, NOW + 10 + DAY).unwrap(),
            ProposalState::Finalized
        );
    }

    #[test]
    fn test_full_binary_lifecycle() {
        let (governance, ledger) = setup();
        let id = create_binary(&governance);
        let voting = NOW + 20;
        let closed = NOW + 10 + DAY;

        governance.submit_vote(ALICE, id, YES_MASK, voting).unwrap();
        governance.submit_vote(BOB, id, NO_MASK, voting).unwrap();

        assert_eq!(
            governance.get_proposal_state(id, closed).unwrap(),
            ProposalState::Succeeded
        );

        // cannot execute an unqueued proposal
        let err = governance.execute(ALICE, id, closed).unwrap_err();
        assert_eq!(err.to_string(), "only queued proposals");

        governance.queue(ALICE, id, closed).unwrap();
        assert_eq!(
            governance.get_proposal_state(id, closed).unwrap(),
            ProposalState::Queued
        );

        // timelock still running
        let err = governance.execute(ALICE, id, closed + DELAY - 1).unwrap_err();
        assert_eq!(err.to_string(), "timelock not finished");

        governance.execute(ALICE, id, closed + DELAY).unwrap();
        assert_eq!(
            governance.get_proposal_state(id, closed + DELAY).unwrap(),
            ProposalState::Executed
        );
        // the action's wei reached the target
        assert_eq!(
            ledger.balance_of(NATIVE_TOKEN_ADDRESS, TARGET),
            U256::from(25u64)
        );

        // executed proposals cannot be canceled
        let err = governance.cancel(OPERATOR, id, closed + DELAY + 1).unwrap_err();
        assert_eq!(err.to_string(), "invalid state to cancel");
    }

    #[test]
    fn test_failed_proposal_cannot_queue() {
        let (governance, _) = setup();
        let id = create_binary(&governance);
        let closed = NOW + 10 + DAY;

        // nobody voted: quorum missed
        assert_eq!(
            governance.get_proposal_state(id, closed).unwrap(),
            ProposalState::Failed
        );
        let err = governance.queue(ALICE, id, closed).unwrap_err();
        assert_eq!(err.to_string(), "invalid state to queue");
    }

    #[test]
    fn test_queued_proposal_expires_after_grace() {
        let (governance, _) = setup();
        let id = create_binary(&governance);
        let closed = NOW + 10 + DAY;

        governance.submit_vote(ALICE, id, YES_MASK, NOW + 20).unwrap();
        governance.queue(ALICE, id, closed).unwrap();

        let expired_at = closed + DELAY + GRACE + 1;
        assert_eq!(
            governance.get_proposal_state(id, expired_at).unwrap(),
            ProposalState::Expired
        );
        let err = governance.execute(ALICE, id, expired_at).unwrap_err();
        assert_eq!(err.to_string(), "only queued proposals");
        // expired binary proposals are uncancelable too
        let err = governance.cancel(OPERATOR, id, expired_at).unwrap_err();
        assert_eq!(err.to_string(), "invalid state to cancel");
    }

    #[test]
    fn test_duplicate_actions_cannot_queue() {
        let (governance, _) = setup();
        let id = governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action(), action()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap();
        let closed = NOW + 10 + DAY;
        governance.submit_vote(ALICE, id, YES_MASK, NOW + 20).unwrap();

        let err = governance.queue(ALICE, id, closed).unwrap_err();
        assert_eq!(err.to_string(), "duplicated action");
        // nothing was applied: still Succeeded and unqueued
        assert_eq!(
            governance.get_proposal_state(id, closed).unwrap(),
            ProposalState::Succeeded
        );
    }

    #[test]
    fn test_cancel_semantics() {
        let (governance, _ledger) = setup();
        let id = create_binary(&governance);

        // outsiders cannot cancel while the executor forbids it
        let err = governance.cancel(ALICE, id, NOW + 20).unwrap_err();
        assert_eq!(err.to_string(), "validate proposal cancellation failed");

        // the creator can, from Active
        governance.cancel(OPERATOR, id, NOW + 20).unwrap();
        assert_eq!(
            governance.get_proposal_state(id, NOW + 20).unwrap(),
            ProposalState::Canceled
        );
        // voting on a canceled proposal is closed
        let err = governance.submit_vote(ALICE, id, YES_MASK, NOW + 20).unwrap_err();
        assert_eq!(err.to_string(), "voting closed");

        // canceling a queued proposal drops its timelocked actions
        let id = create_binary(&governance);
        let closed = NOW + 10 + DAY;
        governance.submit_vote(ALICE, id, YES_MASK, NOW + 20).unwrap();
        governance.queue(ALICE, id, closed).unwrap();
        let execution_time = governance.proposal(id).unwrap().execution_time;
        governance.cancel(OPERATOR, id, closed + 1).unwrap();

        // the action is gone from the executor: executing is impossible
        let err = governance.execute(ALICE, id, execution_time).unwrap_err();
        assert_eq!(err.to_string(), "only queued proposals");
    }

    #[test]
    fn test_execution_failure_rolls_ledger_back() {
        let (governance, ledger) = setup();

        // an action demanding more wei than the executor holds
        let greedy = ProposalAction {
            target: TARGET,
            wei_value: U256::from(600u64),
            signature: String::new(),
            calldata: Bytes::new(),
            with_delegatecall: false,
        };
        let id = governance
            .create_binary_proposal(
                OPERATOR,
                EXECUTOR_ID,
                STRATEGY_ID,
                vec![action(), greedy, action2()],
                NOW + 10,
                NOW + 10 + DAY,
                String::new(),
                NOW,
            )
            .unwrap();
        let closed = NOW + 10 + DAY;
        governance.submit_vote(ALICE, id, YES_MASK, NOW + 20).unwrap();
        governance.queue(ALICE, id, closed).unwrap();

        // drain the executor below the greedy action's requirement
        ledger
            .transfer(NATIVE_TOKEN_ADDRESS, EXECUTOR_ID, CAROL, U256::from(500u64))
            .unwrap();

        let err = governance.execute(ALICE, id, closed + DELAY).unwrap_err();
        assert_eq!(err.to_string(), "insufficient balance");
        // the first action's transfer was rolled back
        assert_eq!(ledger.balance_of(NATIVE_TOKEN_ADDRESS, TARGET), U256::ZERO);
        assert!(!governance.proposal(id).unwrap().executed);

        // refunding the executor lets the same queued proposal execute
        ledger.mint(NATIVE_TOKEN_ADDRESS, EXECUTOR_ID, U256::from(500u64));
        governance.execute(ALICE, id, closed + DELAY).unwrap();
        assert_eq!(
            ledger.balance_of(NATIVE_TOKEN_ADDRESS, TARGET),
            U256::from(635u64)
        );
    }

    fn action2() -> ProposalAction {
        ProposalAction {
            target: TARGET,
            wei_value: U256::from(10u64),
            signature: "setCap(uint256)".to_string(),
            calldata: Bytes::new(),
            with_delegatecall: false,
        }
    }
}
