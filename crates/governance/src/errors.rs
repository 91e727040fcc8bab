//! Governance errors.

use kyberdao_core::AccessError;
use kyberdao_treasury::LedgerError;
use thiserror::Error;

/// Error during governance operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    // authorization
    #[error("only dao operator")]
    OnlyDaoOperator,
    #[error("executor not authorized")]
    ExecutorNotAuthorized,
    #[error("strategy not authorized")]
    StrategyNotAuthorized,

    // proposal creation
    #[error("empty actions")]
    EmptyActions,
    #[error("too short duration")]
    TooShortDuration,
    #[error("start time in the past")]
    StartTimeInPast,
    #[error("invalid time order")]
    InvalidTimeOrder,
    #[error("invalid options count")]
    InvalidOptionsCount,
    #[error("strategy validation failed")]
    StrategyValidationFailed,

    // voting
    #[error("proposal not found")]
    ProposalNotFound,
    #[error("voting closed")]
    VotingClosed,
    #[error("wrong vote for binary proposal")]
    WrongBinaryVote,
    #[error("invalid options")]
    InvalidOptions,

    // lifecycle
    #[error("invalid state to cancel")]
    InvalidStateToCancel,
    #[error("validate proposal cancellation failed")]
    CancellationNotValidated,
    #[error("invalid state to queue")]
    InvalidStateToQueue,
    #[error("only queued proposals")]
    OnlyQueuedProposals,

    // timelock
    #[error("duplicated action")]
    DuplicatedAction,
    #[error("execution time underestimated")]
    ExecutionTimeUnderestimated,
    #[error("action not queued")]
    ActionNotQueued,
    #[error("timelock not finished")]
    TimelockNotFinished,
    #[error("grace period finished")]
    GracePeriodFinished,

    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;
