//! Leaderboards derived from recorded matches.
//!
//! Standings are never stored: they are recomputed from the match records every
//! time they are asked for. The fold only reads completed matches, iterates agents
//! in a fixed order, and sorts with a total order, so two computations over the same
//! matches produce identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::{Agent, AgentId, GroupId};
use crate::model::{Match, MatchResult, MatchStatus};

/// Points granted per match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoringScheme {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Default for ScoringScheme {
    fn default() -> Self {
        ScoringScheme {
            win: 2,
            draw: 1,
            loss: 0,
        }
    }
}

impl ScoringScheme {
    /// Points for one result. A bye is worth a win.
    pub fn points(&self, result: MatchResult) -> u32 {
        match result {
            MatchResult::Win | MatchResult::Bye => self.win,
            MatchResult::Draw => self.draw,
            MatchResult::Loss => self.loss,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub group_id: GroupId,
    pub group_name: String,
    pub points: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub byes: u32,
    /// Matches taken part in, byes included.
    pub rounds_played: u32,
}

impl LeaderboardEntry {
    fn empty(agent: &Agent) -> Self {
        LeaderboardEntry {
            agent_id: agent.id,
            agent_name: agent.name.clone(),
            group_id: agent.group.id,
            group_name: agent.group.name.clone(),
            points: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            byes: 0,
            rounds_played: 0,
        }
    }

    /// Games actually played (byes excluded).
    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    /// `wins / games`, 0.0 when no game was played.
    pub fn win_rate(&self) -> f64 {
        win_rate(self.wins, self.games())
    }
}

/// Aggregated results of all agents of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStanding {
    pub group_id: GroupId,
    pub group: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games: u32,
    pub win_rate: f64,
}

fn win_rate(wins: u32, games: u32) -> f64 {
    if games == 0 {
        0.0
    } else {
        f64::from(wins) / f64::from(games)
    }
}

/// Folds completed matches into one row per agent of `agents`.
///
/// Pending and failed matches are ignored. Rows are sorted by points, then wins
/// (both descending), then agent id.
pub fn aggregate<'a>(
    matches: impl IntoIterator<Item = &'a Match>,
    agents: &[Agent],
    scoring: ScoringScheme,
) -> Vec<LeaderboardEntry> {
    let mut rows: BTreeMap<AgentId, LeaderboardEntry> = agents
        .iter()
        .map(|agent| (agent.id, LeaderboardEntry::empty(agent)))
        .collect();

    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        for agent in std::iter::once(m.agent1).chain(m.agent2) {
            let Some(result) = m.result_for(agent) else {
                continue;
            };
            let Some(row) = rows.get_mut(&agent) else {
                warn!(%agent, match_id = %m.id, "match references an unknown agent");
                continue;
            };
            row.points += scoring.points(result);
            row.rounds_played += 1;
            match result {
                MatchResult::Win => row.wins += 1,
                MatchResult::Loss => row.losses += 1,
                MatchResult::Draw => row.draws += 1,
                MatchResult::Bye => row.byes += 1,
            }
        }
    }

    let mut rows: Vec<_> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then(a.agent_id.cmp(&b.agent_id))
    });
    rows
}

/// Folds completed, non-bye matches into one row per group owning an agent of `agents`.
///
/// Rows are sorted by win rate (descending), then wins, then group id.
pub fn group_standings<'a>(
    matches: impl IntoIterator<Item = &'a Match>,
    agents: &[Agent],
) -> Vec<GroupStanding> {
    let group_of: BTreeMap<AgentId, GroupId> =
        agents.iter().map(|a| (a.id, a.group.id)).collect();
    let mut rows: BTreeMap<GroupId, GroupStanding> = BTreeMap::new();
    for agent in agents {
        rows.entry(agent.group.id).or_insert_with(|| GroupStanding {
            group_id: agent.group.id,
            group: agent.group.name.clone(),
            wins: 0,
            losses: 0,
            draws: 0,
            games: 0,
            win_rate: 0.0,
        });
    }

    for m in matches {
        if m.status != MatchStatus::Completed || m.is_bye() {
            continue;
        }
        for agent in std::iter::once(m.agent1).chain(m.agent2) {
            let (Some(result), Some(group)) = (m.result_for(agent), group_of.get(&agent)) else {
                continue;
            };
            let Some(row) = rows.get_mut(group) else {
                continue;
            };
            row.games += 1;
            match result {
                MatchResult::Win => row.wins += 1,
                MatchResult::Loss => row.losses += 1,
                MatchResult::Draw => row.draws += 1,
                MatchResult::Bye => {}
            }
        }
    }

    let mut rows: Vec<_> = rows
        .into_values()
        .map(|mut row| {
            row.win_rate = win_rate(row.wins, row.games);
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.win_rate
            .total_cmp(&a.win_rate)
            .then(b.wins.cmp(&a.wins))
            .then(a.group_id.cmp(&b.group_id))
    });
    rows
}
