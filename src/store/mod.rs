//! Persistence port for tournaments, rounds, matches, actions and contests.
//!
//! Writes that create a round or record a contest run are all-or-nothing: either
//! the round, its matches, their action logs and the tournament status change are
//! all visible, or none of them is.

use crate::agent::{AgentId, ContestId, MatchId, TournamentId};
use crate::error::ArenaResult;
use crate::model::{Action, Contest, Match, Round, Tournament, TournamentStatus};

mod memory;

pub use memory::InMemoryStore;

/// Kind of record an identifier is allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tournament,
    Round,
    Match,
    Contest,
}

/// One round ready to be committed.
#[derive(Debug, Clone)]
pub struct RoundCommit {
    pub round: Round,
    /// Action log of each non-bye match of the round.
    pub actions: Vec<(MatchId, Vec<Action>)>,
    /// Tournament status after the commit.
    pub status: TournamentStatus,
    pub winner: Option<AgentId>,
}

/// Storage contract used by the [`Arena`](crate::server::Arena).
pub trait ArenaStore: Send + Sync {
    /// Allocates a fresh identifier, unique per kind.
    fn next_id(&self, kind: EntityKind) -> ArenaResult<u64>;

    /// Stores a new tournament with no rounds.
    fn insert_tournament(&self, tournament: Tournament) -> ArenaResult<()>;

    /// Changes the status and winner of a tournament.
    ///
    /// # Errors
    /// [`NotFound`](crate::error::ArenaError::NotFound) for an unknown tournament.
    fn set_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        winner: Option<AgentId>,
    ) -> ArenaResult<()>;

    /// Appends a round to its tournament, writes the action logs and the status change.
    ///
    /// # Errors
    /// [`SequenceViolation`](crate::error::ArenaError::SequenceViolation) when an
    /// action log is not contiguous, round numbers that do not follow the last
    /// round, and any persistence failure. Nothing is written on error.
    fn commit_round(&self, commit: RoundCommit) -> ArenaResult<()>;

    /// Stores a new tournament together with its first round, in one write.
    ///
    /// # Errors
    /// The errors of [`insert_tournament`](Self::insert_tournament) and
    /// [`commit_round`](Self::commit_round). Neither the tournament nor the round is
    /// stored on error.
    fn insert_with_round(&self, tournament: Tournament, commit: RoundCommit) -> ArenaResult<()>;

    /// Replaces a failed match after an operator resolved it.
    fn replace_match(&self, tournament: TournamentId, updated: Match) -> ArenaResult<()>;

    fn tournament(&self, id: TournamentId) -> ArenaResult<Tournament>;

    /// Rounds of a tournament in round order.
    fn rounds(&self, id: TournamentId) -> ArenaResult<Vec<Round>>;

    /// All tournaments in creation order.
    fn tournaments(&self) -> ArenaResult<Vec<Tournament>>;

    /// Tournament holding `match_id`, with the match itself.
    fn find_match(&self, match_id: MatchId) -> ArenaResult<(TournamentId, Match)>;

    /// Action log of a match (tournament match or contest run).
    fn actions(&self, match_id: MatchId) -> ArenaResult<Vec<Action>>;

    fn insert_contest(&self, contest: Contest) -> ArenaResult<()>;

    /// Stores a finished contest run: the updated contest and the run's action log.
    fn record_contest_run(&self, contest: Contest, actions: Vec<Action>) -> ArenaResult<()>;

    fn contest(&self, id: ContestId) -> ArenaResult<Contest>;
}
