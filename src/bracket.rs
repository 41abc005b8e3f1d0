//! Single-elimination bracket logic.
//!
//! Only the pure part of the knockout lives here: how entrants are seeded, how a
//! field is paired, and what the next step of a tournament is given the rounds
//! already recorded. Running the matches and committing rounds is done by
//! [`Arena`](crate::server::Arena).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::agent::{Agent, AgentId};
use crate::error::{ArenaError, ArenaResult};
use crate::model::{Round, Tournament, TournamentStatus};

/// Order in which entrants are placed in the first round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seeding {
    /// Registration order, as returned by the directory.
    #[default]
    InputOrder,
    /// Deterministic shuffle driven by `seed`.
    Shuffled { seed: u64 },
}

impl Seeding {
    /// Orders `agents` for the first round.
    pub fn apply(&self, mut agents: Vec<Agent>) -> Vec<Agent> {
        match self {
            Seeding::InputOrder => agents,
            Seeding::Shuffled { seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                agents.shuffle(&mut rng);
                agents
            }
        }
    }
}

/// One slot of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    Match(Agent, Agent),
    Bye(Agent),
}

/// Pairs 1st vs 2nd, 3rd vs 4th... An odd field gives the last agent a bye.
pub fn pair_field(field: &[Agent]) -> Vec<Pairing> {
    field
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => Pairing::Match(a.clone(), b.clone()),
            [a] => Pairing::Bye(a.clone()),
            _ => unreachable!("chunks(2) yields one or two agents"),
        })
        .collect()
}

/// Number of rounds a knockout over `entrants` agents takes, `ceil(log2(n))`.
pub fn expected_rounds(entrants: usize) -> u32 {
    if entrants <= 1 {
        0
    } else {
        usize::BITS - (entrants - 1).leading_zeros()
    }
}

/// What advancing a tournament should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// The tournament is already over.
    AlreadyCompleted,
    /// A single agent is left: it wins the tournament.
    Finish(AgentId),
    /// Play round `number` with `pairings`.
    Play { number: u32, pairings: Vec<Pairing> },
}

/// Computes the next step of `tournament` given its recorded `rounds`.
///
/// # Errors
/// [`ArenaError::UnresolvedMatches`] when the latest round holds failed matches.
pub fn next_step(tournament: &Tournament, rounds: &[Round]) -> ArenaResult<NextStep> {
    if tournament.status == TournamentStatus::Completed {
        return Ok(NextStep::AlreadyCompleted);
    }

    let field: Vec<Agent> = match rounds.last() {
        None => tournament.entrants.clone(),
        Some(last) => {
            let failed = last.failed_matches();
            if !failed.is_empty() {
                return Err(ArenaError::UnresolvedMatches {
                    tournament: tournament.id,
                    matches: failed,
                });
            }
            last.matches
                .iter()
                .filter_map(|m| m.advancing())
                .filter_map(|id| tournament.entrant(id).cloned())
                .collect()
        }
    };
    trace!(tournament = %tournament.id, field = field.len(), "next field");

    match field.as_slice() {
        [] => Err(ArenaError::InvalidRequest(format!(
            "{} has no agent left to play",
            tournament.id
        ))),
        [winner] => {
            info!(tournament = %tournament.id, winner = %winner.id, "knockout decided");
            Ok(NextStep::Finish(winner.id))
        }
        _ => Ok(NextStep::Play {
            number: rounds.len() as u32 + 1,
            pairings: pair_field(&field),
        }),
    }
}
