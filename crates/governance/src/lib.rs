//! DAO governance engine.
//!
//! This crate provides the proposal lifecycle state machine and its policy
//! objects:
//! - [`Governance`]: create/vote/cancel/queue/execute over binary and
//!   generic proposals
//! - [`ProposalValidator`] / [`StandardProposalValidator`]: creation checks
//!   plus quorum and vote-differential rules
//! - [`Executor`] / [`TimelockExecutor`]: delayed, grace-limited execution
//!   of approved actions
//! - [`VotingPowerStrategy`] with live-balance and epoch-snapshot
//!   implementations

mod errors;
mod executor;
mod governance;
mod proposal;
mod strategy;
mod validator;

pub use errors::{GovernanceError, GovernanceResult};
pub use executor::{Executor, TimelockExecutor};
pub use governance::Governance;
pub use proposal::{
    Proposal, ProposalAction, ProposalKind, ProposalState, Vote, NO, NO_MASK, YES, YES_MASK,
};
pub use strategy::{BalanceVotingStrategy, EpochVotingStrategy, VotingPowerStrategy};
pub use validator::{ProposalValidator, StandardProposalValidator};
