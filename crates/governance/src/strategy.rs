//! Voting-power strategies.
//!
//! Governance never reads token balances itself; every power lookup goes
//! through a registered strategy. [`BalanceVotingStrategy`] prices power at
//! the live governance-token balance; [`EpochVotingStrategy`] freezes each
//! holder's balance at first use inside an epoch so power cannot move
//! mid-vote.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use kyberdao_treasury::TokenLedger;

/// Pluggable voting-power source.
pub trait VotingPowerStrategy: Send + Sync {
    /// Identity used by the governance strategy registry.
    fn id(&self) -> Address;

    /// `voter`'s power at `now`.
    fn voting_power(&self, voter: Address, now: u64) -> U256;

    /// Ceiling captured into a proposal at creation.
    fn max_voting_power(&self, now: u64) -> U256;

    /// Whether a proposal window suits this strategy.
    fn validate_proposal_creation(&self, start_time: u64, end_time: u64) -> bool;

    /// Notification of a recorded vote.
    fn handle_vote(&self, voter: Address, proposal_id: u64, power: U256);

    /// Notification of a canceled proposal.
    fn handle_proposal_cancellation(&self, proposal_id: u64);
}

/// Live-balance power: whatever the voter holds when the vote lands.
pub struct BalanceVotingStrategy {
    id: Address,
    token: Address,
    ledger: Arc<TokenLedger>,
}

impl BalanceVotingStrategy {
    pub fn new(id: Address, token: Address, ledger: Arc<TokenLedger>) -> Self {
        Self { id, token, ledger }
    }
}

impl VotingPowerStrategy for BalanceVotingStrategy {
    fn id(&self) -> Address {
        self.id
    }

    fn voting_power(&self, voter: Address, _now: u64) -> U256 {
        self.ledger.balance_of(self.token, voter)
    }

    fn max_voting_power(&self, _now: u64) -> U256 {
        self.ledger.total_supply_of(self.token)
    }

    fn validate_proposal_creation(&self, _start_time: u64, _end_time: u64) -> bool {
        true
    }

    fn handle_vote(&self, voter: Address, proposal_id: u64, power: U256) {
        debug!(voter = %voter, proposal_id, %power, "Vote handled");
    }

    fn handle_proposal_cancellation(&self, proposal_id: u64) {
        debug!(proposal_id, "Proposal cancellation handled");
    }
}

/// Epoch-frozen power: balances snapshot lazily at first use per epoch, and
/// proposals must open and close inside a single epoch.
pub struct EpochVotingStrategy {
    id: Address,
    token: Address,
    ledger: Arc<TokenLedger>,
    first_epoch_start: u64,
    epoch_period: u64,
    voter_snapshots: DashMap<(u64, Address), U256>,
    max_snapshots: DashMap<u64, U256>,
}

impl EpochVotingStrategy {
    pub fn new(
        id: Address,
        token: Address,
        ledger: Arc<TokenLedger>,
        first_epoch_start: u64,
        epoch_period: u64,
    ) -> Self {
        Self {
            id,
            token,
            ledger,
            first_epoch_start,
            epoch_period,
            voter_snapshots: DashMap::new(),
            max_snapshots: DashMap::new(),
        }
    }

    /// Epoch 0 precedes the first epoch; epochs count from 1 afterwards.
    pub fn epoch_of(&self, now: u64) -> u64 {
        if now < self.first_epoch_start {
            return 0;
        }
        (now - self.first_epoch_start) / self.epoch_period + 1
    }
}

impl VotingPowerStrategy for EpochVotingStrategy {
    fn id(&self) -> Address {
        self.id
    }

    fn voting_power(&self, voter: Address, now: u64) -> U256 {
        let epoch = self.epoch_of(now);
        *self
            .voter_snapshots
            .entry((epoch, voter))
            .or_insert_with(|| self.ledger.balance_of(self.token, voter))
    }

    fn max_voting_power(&self, now: u64) -> U256 {
        let epoch = self.epoch_of(now);
        *self
            .max_snapshots
            .entry(epoch)
            .or_insert_with(|| self.ledger.total_supply_of(self.token))
    }

    fn validate_proposal_creation(&self, start_time: u64, end_time: u64) -> bool {
        self.epoch_of(start_time) == self.epoch_of(end_time)
    }

    fn handle_vote(&self, voter: Address, proposal_id: u64, power: U256) {
        debug!(voter = %voter, proposal_id, %power, "Vote handled");
    }

    fn handle_proposal_cancellation(&self, proposal_id: u64) {
        debug!(proposal_id, "Proposal cancellation handled");
    }
}
