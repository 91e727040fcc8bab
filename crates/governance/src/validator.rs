//! Proposal creation and passing rules.

use alloy::primitives::U256;

use kyberdao_core::ExecutorParams;

use crate::errors::{GovernanceError, GovernanceResult};
use crate::proposal::{Proposal, ProposalKind, NO, YES};

/// Policy consulted at proposal creation and when deciding whether a closed
/// binary vote passed.
pub trait ProposalValidator: Send + Sync {
    fn validate_binary_proposal_creation(
        &self,
        start_time: u64,
        end_time: u64,
        now: u64,
        action_count: usize,
    ) -> GovernanceResult<()>;

    fn validate_generic_proposal_creation(
        &self,
        start_time: u64,
        end_time: u64,
        now: u64,
        options_count: usize,
    ) -> GovernanceResult<()>;

    fn is_binary_proposal_passed(&self, proposal: &Proposal) -> bool;
}

/// Quorum-and-differential validator.
#[derive(Debug, Clone)]
pub struct StandardProposalValidator {
    /// Minimum `end_time - start_time`
    pub min_voting_duration: u64,
    /// Maximum option count for generic proposals
    pub max_voting_options: usize,
    /// Minimum participation, in bps of max voting power
    pub min_quorum_bps: u16,
    /// Minimum YES-over-NO margin, in bps of max voting power
    pub vote_differential_bps: u16,
}

impl StandardProposalValidator {
    pub fn new(
        min_voting_duration: u64,
        max_voting_options: usize,
        min_quorum_bps: u16,
        vote_differential_bps: u16,
    ) -> Self {
        Self {
            min_voting_duration,
            max_voting_options,
            min_quorum_bps,
            vote_differential_bps,
        }
    }

    pub fn from_params(params: &ExecutorParams) -> Self {
        Self::new(
            params.min_voting_duration,
            params.max_voting_options,
            params.min_quorum_bps,
            params.vote_differential_bps,
        )
    }

    fn validate_window(&self, start_time: u64, end_time: u64, now: u64) -> GovernanceResult<()> {
        if start_time < now {
            return Err(GovernanceError::StartTimeInPast);
        }
        if end_time <= start_time {
            return Err(GovernanceError::InvalidTimeOrder);
        }
        if end_time - start_time < self.min_voting_duration {
            return Err(GovernanceError::TooShortDuration);
        }
        Ok(())
    }
}

impl ProposalValidator for StandardProposalValidator {
    fn validate_binary_proposal_creation(
        &self,
        start_time: u64,
        end_time: u64,
        now: u64,
        action_count: usize,
    ) -> GovernanceResult<()> {
        if action_count == 0 {
            return Err(GovernanceError::EmptyActions);
        }
        self.validate_window(start_time, end_time, now)
    }

    fn validate_generic_proposal_creation(
        &self,
        start_time: u64,
        end_time: u64,
        now: u64,
        options_count: usize,
    ) -> GovernanceResult<()> {
        if options_count < 2 || options_count > self.max_voting_options {
            return Err(GovernanceError::InvalidOptionsCount);
        }
        self.validate_window(start_time, end_time, now)
    }

    /// Quorum: YES + NO participation reaches `min_quorum_bps` of the max
    /// voting power. Differential: YES exceeds NO by strictly more than
    /// `vote_differential_bps` of the max voting power.
    fn is_binary_proposal_passed(&self, proposal: &Proposal) -> bool {
        let ProposalKind::Binary { vote_counts, .. } = &proposal.kind else {
            return false;
        };
        let yes = vote_counts[YES];
        let no = vote_counts[NO];
        let bps = U256::from(10_000u64);

        let quorum_ok =
            (yes + no) * bps >= proposal.max_voting_power * U256::from(self.min_quorum_bps);
        let differential_ok = yes > no
            && (yes - no) * bps
                > proposal.max_voting_power * U256::from(self.vote_differential_bps);
        quorum_ok && differential_ok
    }
}
