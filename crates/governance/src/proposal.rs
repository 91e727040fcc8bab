//! Proposal data model.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};

/// Bitmask for a binary YES vote.
pub const YES_MASK: u32 = 1;
/// Bitmask for a binary NO vote.
pub const NO_MASK: u32 = 2;

/// Index of the YES tally in a binary proposal's vote counts.
pub const YES: usize = 0;
/// Index of the NO tally in a binary proposal's vote counts.
pub const NO: usize = 1;

/// One on-chain action carried by a binary proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalAction {
    pub target: Address,
    pub wei_value: U256,
    pub signature: String,
    pub calldata: Bytes,
    pub with_delegatecall: bool,
}

impl ProposalAction {
    /// Key identifying this action inside a timelock queue. Two actions
    /// collide only when every field and the execution time match.
    pub fn action_key(&self, execution_time: u64) -> B256 {
        let mut preimage = Vec::with_capacity(
            20 + 32 + self.signature.len() + self.calldata.len() + 8 + 1,
        );
        preimage.extend_from_slice(self.target.as_slice());
        preimage.extend_from_slice(&self.wei_value.to_be_bytes::<32>());
        preimage.extend_from_slice(self.signature.as_bytes());
        preimage.extend_from_slice(&self.calldata);
        preimage.extend_from_slice(&execution_time.to_be_bytes());
        preimage.push(self.with_delegatecall as u8);
        keccak256(&preimage)
    }
}

/// Discriminates generic (poll) proposals from binary (executable) ones and
/// carries each kind's tallies.
#[derive(Debug, Clone)]
pub enum ProposalKind {
    Generic {
        options: Vec<String>,
        vote_counts: Vec<U256>,
    },
    Binary {
        actions: Vec<ProposalAction>,
        vote_counts: [U256; 2],
    },
}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Failed,
    Succeeded,
    Finalized,
    Queued,
    Expired,
    Executed,
}

/// One recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub option_bitmask: u32,
    pub voting_power: U256,
}

/// A governance proposal.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: u64,
    pub creator: Address,
    pub executor_id: Address,
    pub strategy_id: Address,
    pub start_time: u64,
    pub end_time: u64,
    /// 0 until queued
    pub execution_time: u64,
    /// Strategy-reported ceiling, captured at creation
    pub max_voting_power: U256,
    pub link: String,
    pub executed: bool,
    pub canceled: bool,
    pub total_votes: U256,
    pub kind: ProposalKind,
}

impl Proposal {
    pub fn is_binary(&self) -> bool {
        matches!(self.kind, ProposalKind::Binary { .. })
    }

    /// Number of selectable options: always 2 for binary proposals.
    pub fn option_count(&self) -> usize {
        match &self.kind {
            ProposalKind::Generic { options, .. } => options.len(),
            ProposalKind::Binary { .. } => 2,
        }
    }

    pub fn vote_counts(&self) -> &[U256] {
        match &self.kind {
            ProposalKind::Generic { vote_counts, .. } => vote_counts,
            ProposalKind::Binary { vote_counts, .. } => vote_counts,
        }
    }

    pub fn actions(&self) -> &[ProposalAction] {
        match &self.kind {
            ProposalKind::Binary { actions, .. } => actions,
            ProposalKind::Generic { .. } => &[],
        }
    }

    /// Shift this voter's tallies from `old` to `new`: every option keeps
    /// exactly the power of the voters whose current mask selects it.
    pub fn apply_vote_change(&mut self, old: Option<Vote>, new: Vote) {
        let option_count = self.option_count();
        let counts = match &mut self.kind {
            ProposalKind::Generic { vote_counts, .. } => vote_counts.as_mut_slice(),
            ProposalKind::Binary { vote_counts, .. } => vote_counts.as_mut_slice(),
        };
        for (i, count) in counts.iter_mut().enumerate().take(option_count) {
            if let Some(old) = &old {
                if old.option_bitmask & (1 << i) != 0 {
                    *count -= old.voting_power;
                }
            }
            if new.option_bitmask & (1 << i) != 0 {
                *count += new.voting_power;
            }
        }
        let old_power = old.map(|v| v.voting_power).unwrap_or(U256::ZERO);
        self.total_votes = self.total_votes - old_power + new.voting_power;
    }
}
