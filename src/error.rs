//! Error taxonomy surfaced by the orchestration core.
//!
//! Every failure that reaches a caller is an [`ArenaError`]. Callers that only need
//! to branch on the category (for a status code or a UI badge) use [`ArenaError::kind`];
//! the `Display` output is the short user-facing message.

use serde::Serialize;
use thiserror::Error;

use crate::agent::{AgentId, MatchId, TournamentId};
use crate::game_interface::GameKind;

/// Result alias used by every public operation of the crate.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Category of an [`ArenaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ArenaError::NoEligibleAgents`].
    NoEligibleAgents,
    /// See [`ArenaError::InvalidMove`].
    InvalidMove,
    /// See [`ArenaError::ExecutionTimeout`].
    ExecutionTimeout,
    /// See [`ArenaError::SequenceViolation`].
    SequenceViolation,
    /// See [`ArenaError::PersistenceFailure`].
    PersistenceFailure,
    /// See [`ArenaError::NotFound`].
    NotFound,
    /// See [`ArenaError::TournamentBusy`].
    TournamentBusy,
    /// See [`ArenaError::UnresolvedMatches`].
    UnresolvedMatches,
    /// See [`ArenaError::InvalidRequest`].
    InvalidRequest,
    /// See [`ArenaError::Directory`].
    Directory,
}

/// Errors returned by the arena operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// A scheduler was started for a game with an empty field.
    #[error("no eligible agents for {0}")]
    NoEligibleAgents(GameKind),

    /// An agent produced an action the game does not accept.
    #[error("invalid move from agent {agent}: {detail}")]
    InvalidMove { agent: AgentId, detail: String },

    /// An agent did not answer before its deadline.
    #[error("agent {0} timed out")]
    ExecutionTimeout(AgentId),

    /// An action was appended out of order or twice.
    #[error("sequence violation in match {match_id}: expected move {expected}, got {got}")]
    SequenceViolation {
        match_id: MatchId,
        expected: u32,
        got: u32,
    },

    /// The store could not be reached or rejected the write. Nothing was committed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Another scheduler is currently advancing this tournament.
    #[error("tournament {0} is being advanced by another caller")]
    TournamentBusy(TournamentId),

    /// The latest round holds failed matches that must be resolved first.
    #[error("tournament {tournament} has unresolved matches: {matches:?}")]
    UnresolvedMatches {
        tournament: TournamentId,
        matches: Vec<MatchId>,
    },

    /// The request is malformed (unknown game, agent not in match, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The agent/group directory failed.
    #[error("agent directory error: {0}")]
    Directory(String),
}

impl ArenaError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoEligibleAgents(_) => ErrorKind::NoEligibleAgents,
            Self::InvalidMove { .. } => ErrorKind::InvalidMove,
            Self::ExecutionTimeout(_) => ErrorKind::ExecutionTimeout,
            Self::SequenceViolation { .. } => ErrorKind::SequenceViolation,
            Self::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::TournamentBusy(_) => ErrorKind::TournamentBusy,
            Self::UnresolvedMatches { .. } => ErrorKind::UnresolvedMatches,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Directory(_) => ErrorKind::Directory,
        }
    }

    /// Wraps an infrastructure error coming from a store adapter.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::PersistenceFailure(err.to_string())
    }

    /// Wraps an infrastructure error coming from a directory adapter.
    pub fn directory(err: impl std::fmt::Display) -> Self {
        Self::Directory(err.to_string())
    }
}

/// Message body handed to the operator layer: short text plus the taxonomy kind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ArenaError> for ErrorReport {
    fn from(err: &ArenaError) -> Self {
        ErrorReport {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
