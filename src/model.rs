//! Records produced by the schedulers and kept by the store.
//!
//! Everything here is plain data: schedulers create it, the store keeps it, queries
//! serialize it. Once a [`Match`] is recorded as completed it is never edited.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::agent::{Agent, AgentId, ContestId, MatchId, RoundId, TournamentId};
use crate::bracket::Seeding;
use crate::game_interface::GameKind;
use crate::standings::ScoringScheme;

/// Current version of [`MatchMetadata`].
pub const METADATA_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentKind {
    Knockout,
    RoundRobin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Pending,
    Running,
    Completed,
}

/// A tournament and the entrants snapshotted when it was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub game: GameKind,
    pub kind: TournamentKind,
    pub status: TournamentStatus,
    pub scoring: ScoringScheme,
    pub seeding: Seeding,
    pub entrants: Vec<Agent>,
    pub winner: Option<AgentId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Tournament {
    pub fn entrant(&self, id: AgentId) -> Option<&Agent> {
        self.entrants.iter().find(|a| a.id == id)
    }
}

/// One round of a tournament. Rounds are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament: TournamentId,
    /// 1-based, strictly increasing within a tournament.
    pub number: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub matches: Vec<Match>,
}

impl Round {
    /// Matches that ended in the `failed` state and still wait for an operator.
    pub fn failed_matches(&self) -> Vec<MatchId> {
        self.matches
            .iter()
            .filter(|m| m.status == MatchStatus::Failed)
            .map(|m| m.id)
            .collect()
    }
}

/// Match result from the first agent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
    Bye,
}

impl MatchResult {
    /// Same result seen from the other side.
    pub fn flipped(self) -> MatchResult {
        match self {
            MatchResult::Win => MatchResult::Loss,
            MatchResult::Loss => MatchResult::Win,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Completed,
    /// History could not be recorded consistently. Excluded from standings until resolved.
    Failed,
}

/// Why an agent lost a match or a round without a normal game result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    InvalidMove,
    ExecutionTimeout,
    Crashed,
    LaunchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub agent: AgentId,
    pub kind: FaultKind,
    /// Move number the fault happened at, if the agent got that far.
    pub move_number: Option<u32>,
    pub detail: String,
}

/// Structured display data attached to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub version: u16,
    pub game: GameKind,
    pub agent1_label: String,
    pub agent2_label: Option<String>,
    pub faults: Vec<FaultRecord>,
    /// The action log ends in the middle of a simultaneous round.
    pub incomplete_round: bool,
    /// Set when a drawn knockout match was decided by bracket order.
    pub advanced_by_tiebreak: Option<AgentId>,
    /// Reason a match ended up `failed`.
    pub failure: Option<String>,
    /// A failed match was settled by an operator.
    pub resolved_by_operator: bool,
}

impl MatchMetadata {
    pub fn new(game: GameKind, agent1: &Agent, agent2: Option<&Agent>) -> Self {
        MatchMetadata {
            version: METADATA_VERSION,
            game,
            agent1_label: agent1.label(),
            agent2_label: agent2.map(Agent::label),
            faults: vec![],
            incomplete_round: false,
            advanced_by_tiebreak: None,
            failure: None,
            resolved_by_operator: false,
        }
    }
}

/// A single match. `agent2 == None` denotes a bye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub agent1: AgentId,
    pub agent2: Option<AgentId>,
    pub agent1_score: u32,
    pub agent2_score: u32,
    pub result: MatchResult,
    pub winner: Option<AgentId>,
    pub status: MatchStatus,
    pub metadata: MatchMetadata,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Match {
    /// A bye: resolved immediately as an advance for `agent`, with no actions.
    pub fn bye(id: MatchId, game: GameKind, agent: &Agent, created_at: OffsetDateTime) -> Match {
        Match {
            id,
            agent1: agent.id,
            agent2: None,
            agent1_score: 0,
            agent2_score: 0,
            result: MatchResult::Bye,
            winner: Some(agent.id),
            status: MatchStatus::Completed,
            metadata: MatchMetadata::new(game, agent, None),
            created_at,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.agent2.is_none()
    }

    pub fn involves(&self, agent: AgentId) -> bool {
        self.agent1 == agent || self.agent2 == Some(agent)
    }

    /// Result of this match for `agent`, `None` when it did not take part.
    pub fn result_for(&self, agent: AgentId) -> Option<MatchResult> {
        if self.agent1 == agent {
            Some(self.result)
        } else if self.agent2 == Some(agent) {
            Some(self.result.flipped())
        } else {
            None
        }
    }

    /// Agent that moves on in a knockout bracket.
    pub fn advancing(&self) -> Option<AgentId> {
        if self.status != MatchStatus::Completed {
            return None;
        }
        self.winner.or(self.metadata.advanced_by_tiebreak)
    }
}

/// One recorded move of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// 0-based, contiguous within a match.
    pub move_number: u32,
    pub agent: AgentId,
    /// What the agent sent, verbatim.
    pub payload: String,
    /// Game snapshot after the action was applied.
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    Pending,
    Completed,
    Failed,
}

/// A one-off two-agent contest outside any tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: ContestId,
    pub name: String,
    pub game: GameKind,
    pub agent1: Agent,
    pub agent2: Agent,
    pub status: ContestStatus,
    pub winner: Option<AgentId>,
    /// Latest run of this contest.
    pub last_match: Option<Match>,
    /// Number of times the contest was run.
    pub runs: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CodeRef, Group, GroupId};

    fn agent(id: u64) -> Agent {
        Agent::new(
            AgentId(id),
            format!("a{id}"),
            Group {
                id: GroupId(1),
                name: "g".into(),
            },
            GameKind::TicTacToe,
            CodeRef::new("x"),
        )
    }

    #[test]
    fn bye_advances_its_agent() {
        let bye = Match::bye(
            MatchId(1),
            GameKind::TicTacToe,
            &agent(3),
            OffsetDateTime::UNIX_EPOCH,
        );
        assert!(bye.is_bye());
        assert_eq!(bye.result, MatchResult::Bye);
        assert_eq!(bye.advancing(), Some(AgentId(3)));
        assert_eq!(bye.result_for(AgentId(3)), Some(MatchResult::Bye));
        assert_eq!(bye.result_for(AgentId(4)), None);
        assert_eq!(bye.metadata.version, METADATA_VERSION);
    }

    #[test]
    fn results_flip_for_second_agent() {
        let mut m = Match::bye(
            MatchId(1),
            GameKind::TicTacToe,
            &agent(1),
            OffsetDateTime::UNIX_EPOCH,
        );
        m.agent2 = Some(AgentId(2));
        m.result = MatchResult::Loss;
        m.winner = Some(AgentId(2));
        assert_eq!(m.result_for(AgentId(2)), Some(MatchResult::Win));
        m.status = MatchStatus::Failed;
        assert_eq!(m.advancing(), None);
    }

    #[test]
    fn metadata_serializes_with_version() {
        let meta = MatchMetadata::new(GameKind::Connect4, &agent(1), Some(&agent(2)));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["game"], "conn4");
        assert_eq!(json["agent2_label"], "g/a2");
    }
}
