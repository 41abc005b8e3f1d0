//! The operation surface of the arena.
//!
//! [`Arena`] wires the injected collaborators together:
//!
//! - an [`AgentDirectory`] listing eligible agents per game,
//! - an [`AgentRuntime`] turning agent code into live sessions,
//! - an [`ArenaStore`] keeping tournaments, rounds, matches, actions and contests,
//!
//! and exposes the knockout, round-robin and contest operations on top of them.
//! Matches of one round or batch run concurrently through a [`MatchPool`].
//!
//! # Knockout lifecycle
//!
//! A tournament is created `pending` with a snapshot of the eligible agents. Every
//! call to [`Arena::advance_round`] plays one full round and commits it at once;
//! the first commit moves the tournament to `running`, and the commit leaving a
//! single agent standing moves it to `completed` with that agent as winner. A
//! field of two is decided by its first commit, so it goes from `pending`
//! straight to `completed`.
//! Only one caller may advance a given tournament at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agent_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::from_env();
//!     let directory = FsDirectory::scan("agents", config)?;
//!     let arena = Arena::new(
//!         Arc::new(directory),
//!         Arc::new(ProcessRuntime::new(&config)),
//!         Arc::new(InMemoryStore::new()),
//!         config,
//!     );
//!
//!     let id = arena.create_tournament(GameKind::Connect4)?;
//!     while let Advance::Round(_) = arena.advance_round(id)? {}
//!     let detail = arena.get_tournament(id)?;
//!     println!("winner: {:?}", detail.tournament.winner);
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, TryLockError};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument, trace, warn};

use crate::agent::{Agent, AgentId, ContestId, MatchId, RoundId, TournamentId};
use crate::agent_runtime::AgentRuntime;
use crate::bracket::{expected_rounds, next_step, NextStep, Pairing, Seeding};
use crate::configuration::Configuration;
use crate::error::{ArenaError, ArenaResult};
use crate::events::{ArenaEvent, EventBus};
use crate::game_interface::{GameFactory, GameKind};
use crate::games::{pair_rounds, RpsPlayback, StandardGames};
use crate::history::check_sequence;
use crate::logger::init_logger;
use crate::match_executor::{MatchOutcome, MatchSettings};
use crate::match_pool::{CancelToken, MatchPool};
use crate::model::{
    Action, Contest, ContestStatus, Match, MatchMetadata, MatchResult, MatchStatus, Round,
    Tournament, TournamentKind, TournamentStatus,
};
use crate::registry::AgentDirectory;
use crate::round_robin::{pairings, RoundRobinReport};
use crate::standings::{aggregate, LeaderboardEntry, ScoringScheme};
use crate::store::{ArenaStore, EntityKind, RoundCommit};

/// Result of [`Arena::advance_round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advance {
    /// A new round was played and committed.
    Round(RoundId),
    /// Nothing left to play.
    NoOp,
}

/// A tournament with its rounds and current standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentDetail {
    pub tournament: Tournament,
    pub rounds: Vec<Round>,
    pub standings: Vec<LeaderboardEntry>,
}

/// Listing row of a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub name: String,
    pub game: GameKind,
    pub kind: TournamentKind,
    pub status: TournamentStatus,
    pub winner: Option<AgentId>,
    /// Rounds whose matches all completed.
    pub completed_rounds: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// One recorded match with its history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDetail {
    pub tournament: TournamentId,
    #[serde(rename = "match")]
    pub record: Match,
    pub actions: Vec<Action>,
    /// Actions regrouped by round, for rock-paper-scissors only.
    pub playback: Option<RpsPlayback>,
}

/// How the two agents of a contest are picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestPairing {
    Explicit(AgentId, AgentId),
    /// First eligible agent against the first eligible agent of another group.
    Auto,
}

/// A contest and the history of its latest run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContestDetail {
    pub contest: Contest,
    pub actions: Vec<Action>,
    pub playback: Option<RpsPlayback>,
}

/// Tournament and contest orchestration.
pub struct Arena {
    directory: Arc<dyn AgentDirectory>,
    store: Arc<dyn ArenaStore>,
    pool: MatchPool,
    events: EventBus,
    config: Configuration,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl Arena {
    /// Create an [`Arena`] playing the built-in games.
    pub fn new(
        directory: Arc<dyn AgentDirectory>,
        runtime: Arc<dyn AgentRuntime>,
        store: Arc<dyn ArenaStore>,
        config: Configuration,
    ) -> Arena {
        let games = Arc::new(StandardGames::new(&config));
        Self::with_games(directory, runtime, games, store, config)
    }

    /// Create an [`Arena`] with a custom [`GameFactory`].
    #[instrument(skip_all)]
    pub fn with_games(
        directory: Arc<dyn AgentDirectory>,
        runtime: Arc<dyn AgentRuntime>,
        games: Arc<dyn GameFactory>,
        store: Arc<dyn ArenaStore>,
        config: Configuration,
    ) -> Arena {
        if config.log {
            if let Err(e) = init_logger() {
                eprintln!("logging disabled: {e:#}");
            }
        }
        trace!(?config);

        Arena {
            directory,
            store,
            pool: MatchPool::new(config, runtime, games),
            events: EventBus::new(),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Receiver of every event published from now on.
    pub fn subscribe(&self) -> Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    /// Create a knockout tournament with the default scoring and input-order seeding.
    pub fn create_tournament(&self, game: GameKind) -> ArenaResult<TournamentId> {
        self.create_tournament_with(game, self.config.scoring(), Seeding::default())
    }

    /// Create a knockout tournament over the agents currently eligible for `game`.
    ///
    /// # Errors
    /// [`ArenaError::NoEligibleAgents`] when the directory lists no agent; nothing is created.
    #[instrument(skip(self))]
    pub fn create_tournament_with(
        &self,
        game: GameKind,
        scoring: ScoringScheme,
        seeding: Seeding,
    ) -> ArenaResult<TournamentId> {
        let agents = self.directory.list_agents(game)?;
        if agents.is_empty() {
            warn!("no eligible agents");
            return Err(ArenaError::NoEligibleAgents(game));
        }

        let id = TournamentId(self.store.next_id(EntityKind::Tournament)?);
        let entrants = seeding.apply(agents);
        let entrant_count = entrants.len();
        self.store.insert_tournament(Tournament {
            id,
            name: format!("{game} knockout {}", id.0),
            game,
            kind: TournamentKind::Knockout,
            status: TournamentStatus::Pending,
            scoring,
            seeding,
            entrants,
            winner: None,
            created_at: OffsetDateTime::now_utc(),
        })?;
        info!(%id, entrants = entrant_count, "tournament created");
        self.events.publish(ArenaEvent::TournamentCreated {
            tournament: id,
            game,
            entrants: entrant_count,
        });
        Ok(id)
    }

    /// Plays the next round of a knockout tournament.
    ///
    /// Returns [`Advance::NoOp`] once the tournament is completed. When a single
    /// agent is left the tournament is completed by this call.
    ///
    /// # Errors
    /// - [`ArenaError::TournamentBusy`] while another call advances the same tournament.
    /// - [`ArenaError::UnresolvedMatches`] while the latest round holds failed matches.
    /// - [`ArenaError::PersistenceFailure`]: the round is not committed at all.
    #[instrument(skip(self))]
    pub fn advance_round(&self, id: TournamentId) -> ArenaResult<Advance> {
        let lock = self.tournament_lock(id)?;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ArenaError::TournamentBusy(id)),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let tournament = self.store.tournament(id)?;
        if tournament.kind != TournamentKind::Knockout {
            return Err(ArenaError::InvalidRequest(format!("{id} is not a knockout")));
        }
        let rounds = self.store.rounds(id)?;

        let (number, pairings) = match next_step(&tournament, &rounds)? {
            NextStep::AlreadyCompleted => return Ok(Advance::NoOp),
            NextStep::Finish(winner) => {
                self.store
                    .set_tournament_status(id, TournamentStatus::Completed, Some(winner))?;
                self.events.publish(ArenaEvent::TournamentCompleted {
                    tournament: id,
                    winner: Some(winner),
                });
                return Ok(Advance::NoOp);
            }
            NextStep::Play { number, pairings } => (number, pairings),
        };

        let round_id = RoundId(self.store.next_id(EntityKind::Round)?);
        let created_at = OffsetDateTime::now_utc();
        let (matches, actions) = self.play_knockout_round(&tournament, pairings, created_at)?;

        let failed = matches.iter().any(|m| m.status == MatchStatus::Failed);
        let advancing: Vec<AgentId> = matches.iter().filter_map(Match::advancing).collect();
        let (status, winner) = match advancing.as_slice() {
            [winner] if !failed => (TournamentStatus::Completed, Some(*winner)),
            _ => (TournamentStatus::Running, None),
        };

        let recorded: Vec<ArenaEvent> = matches
            .iter()
            .filter(|m| !m.is_bye())
            .map(|m| ArenaEvent::MatchRecorded {
                match_id: m.id,
                result: m.result,
                winner: m.winner,
            })
            .collect();
        self.store.commit_round(RoundCommit {
            round: Round {
                id: round_id,
                tournament: id,
                number,
                created_at,
                matches,
            },
            actions,
            status,
            winner,
        })?;
        let total = expected_rounds(tournament.entrants.len());
        info!(%id, round = number, of = total, ?status, "round committed");

        for event in recorded {
            self.events.publish(event);
        }
        self.events.publish(ArenaEvent::RoundCompleted {
            tournament: id,
            round: round_id,
            number,
        });
        if status == TournamentStatus::Completed {
            self.events.publish(ArenaEvent::TournamentCompleted {
                tournament: id,
                winner,
            });
        }
        Ok(Advance::Round(round_id))
    }

    fn play_knockout_round(
        &self,
        tournament: &Tournament,
        pairings: Vec<Pairing>,
        created_at: OffsetDateTime,
    ) -> ArenaResult<(Vec<Match>, Vec<(MatchId, Vec<Action>)>)> {
        let mut slots = Vec::with_capacity(pairings.len());
        let mut batch = vec![];
        for pairing in pairings {
            let match_id = MatchId(self.store.next_id(EntityKind::Match)?);
            match pairing {
                Pairing::Bye(agent) => {
                    trace!(agent = %agent.id, "bye");
                    slots.push(Slot::Ready(Match::bye(
                        match_id,
                        tournament.game,
                        &agent,
                        created_at,
                    )));
                }
                Pairing::Match(agent1, agent2) => {
                    slots.push(Slot::Played(match_id));
                    batch.push(MatchSettings {
                        match_id,
                        game: tournament.game,
                        agent1,
                        agent2,
                    });
                }
            }
        }

        // a round is a barrier: never cancelled, every match is waited for
        let settings: HashMap<MatchId, MatchSettings> =
            batch.iter().map(|s| (s.match_id, s.clone())).collect();
        let mut outcomes: HashMap<MatchId, MatchOutcome> = self
            .pool
            .run(batch, &CancelToken::new())
            .played
            .into_iter()
            .map(|(s, o)| (s.match_id, o))
            .collect();

        let mut matches = Vec::with_capacity(slots.len());
        let mut actions = vec![];
        for slot in slots {
            match slot {
                Slot::Ready(bye) => matches.push(bye),
                Slot::Played(match_id) => {
                    let Some(settings) = settings.get(&match_id) else {
                        continue;
                    };
                    let (record, log) = match outcomes.remove(&match_id) {
                        Some(outcome) => record_match(settings, outcome, created_at, true),
                        None => failed_match(settings, created_at, "no result from match runner"),
                    };
                    actions.push((match_id, log));
                    matches.push(record);
                }
            }
        }
        Ok((matches, actions))
    }

    /// Settles a failed match in favor of `winner`.
    ///
    /// # Errors
    /// [`ArenaError::InvalidRequest`] when the match is not failed or `winner` did not play it.
    #[instrument(skip(self))]
    pub fn resolve_match(&self, match_id: MatchId, winner: AgentId) -> ArenaResult<()> {
        let (tournament, _) = self.store.find_match(match_id)?;
        let lock = self.tournament_lock(tournament)?;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ArenaError::TournamentBusy(tournament)),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let (_, mut record) = self.store.find_match(match_id)?;
        if record.status != MatchStatus::Failed {
            return Err(ArenaError::InvalidRequest(format!("{match_id} is not failed")));
        }
        if record.is_bye() || !record.involves(winner) {
            return Err(ArenaError::InvalidRequest(format!(
                "{winner} did not play {match_id}"
            )));
        }

        record.status = MatchStatus::Completed;
        record.winner = Some(winner);
        record.result = if record.agent1 == winner {
            MatchResult::Win
        } else {
            MatchResult::Loss
        };
        record.metadata.resolved_by_operator = true;
        let event = ArenaEvent::MatchRecorded {
            match_id,
            result: record.result,
            winner: record.winner,
        };
        self.store.replace_match(tournament, record)?;
        info!(%match_id, %winner, "failed match resolved by operator");
        self.events.publish(event);
        Ok(())
    }

    /// A tournament, its rounds and standings recomputed from its matches.
    pub fn get_tournament(&self, id: TournamentId) -> ArenaResult<TournamentDetail> {
        let tournament = self.store.tournament(id)?;
        let rounds = self.store.rounds(id)?;
        let standings = aggregate(
            rounds.iter().flat_map(|r| r.matches.iter()),
            &tournament.entrants,
            tournament.scoring,
        );
        Ok(TournamentDetail {
            tournament,
            rounds,
            standings,
        })
    }

    /// Every tournament in creation order.
    pub fn list_tournaments(&self) -> ArenaResult<Vec<TournamentSummary>> {
        self.store
            .tournaments()?
            .into_iter()
            .map(|t| {
                let rounds = self.store.rounds(t.id)?;
                let completed_rounds = rounds
                    .iter()
                    .filter(|r| r.matches.iter().all(|m| m.status == MatchStatus::Completed))
                    .count();
                let leaderboard = aggregate(
                    rounds.iter().flat_map(|r| r.matches.iter()),
                    &t.entrants,
                    t.scoring,
                );
                Ok(TournamentSummary {
                    id: t.id,
                    name: t.name,
                    game: t.game,
                    kind: t.kind,
                    status: t.status,
                    winner: t.winner,
                    completed_rounds,
                    leaderboard,
                })
            })
            .collect()
    }

    /// A recorded tournament match and its action log.
    pub fn get_match(&self, match_id: MatchId) -> ArenaResult<MatchDetail> {
        let (tournament, record) = self.store.find_match(match_id)?;
        let actions = self.store.actions(match_id)?;
        let playback = (record.metadata.game == GameKind::RockPaperScissors)
            .then(|| pair_rounds(&actions));
        Ok(MatchDetail {
            tournament,
            record,
            actions,
            playback,
        })
    }

    /// Plays every pair of agents eligible for `game` once.
    pub fn run_round_robin(&self, game: GameKind) -> ArenaResult<RoundRobinReport> {
        self.run_round_robin_with(game, &CancelToken::new())
    }

    /// [`run_round_robin`](Self::run_round_robin) that stops issuing new pairings once
    /// `cancel` is set. Matches already played are kept and reported.
    ///
    /// # Errors
    /// [`ArenaError::NoEligibleAgents`] when the directory lists no agent.
    #[instrument(skip(self, cancel))]
    pub fn run_round_robin_with(
        &self,
        game: GameKind,
        cancel: &CancelToken,
    ) -> ArenaResult<RoundRobinReport> {
        let mut agents = self.directory.list_agents(game)?;
        if agents.is_empty() {
            warn!("no eligible agents");
            return Err(ArenaError::NoEligibleAgents(game));
        }
        agents.sort_by_key(|a| a.id);

        let mut batch = vec![];
        for (agent1, agent2) in pairings(&agents) {
            batch.push(MatchSettings {
                match_id: MatchId(self.store.next_id(EntityKind::Match)?),
                game,
                agent1,
                agent2,
            });
        }
        let scheduled = batch.len();
        info!(agents = agents.len(), matches = scheduled, "round robin started");

        let created_at = OffsetDateTime::now_utc();
        let result = self.pool.run(batch, cancel);
        let mut matches = Vec::with_capacity(result.played.len());
        let mut actions = Vec::with_capacity(result.played.len());
        for (settings, outcome) in result.played {
            let (record, log) = record_match(&settings, outcome, created_at, false);
            actions.push((record.id, log));
            matches.push(record);
        }

        let scoring = self.config.scoring();
        let mut report = RoundRobinReport::new(
            game,
            &agents,
            matches,
            scoring,
            scheduled,
            result.cancelled,
        );
        if self.config.persist_round_robin {
            report.tournament = Some(self.persist_round_robin(&report, agents, actions, created_at)?);
        }

        for m in &report.matches {
            self.events.publish(ArenaEvent::MatchRecorded {
                match_id: m.id,
                result: m.result,
                winner: m.winner,
            });
        }
        self.events.publish(ArenaEvent::RoundRobinFinished {
            game,
            total_matches: report.total_matches,
            cancelled: report.cancelled,
        });
        info!(matches = report.total_matches, cancelled = report.cancelled, "round robin finished");
        Ok(report)
    }

    fn persist_round_robin(
        &self,
        report: &RoundRobinReport,
        entrants: Vec<Agent>,
        actions: Vec<(MatchId, Vec<Action>)>,
        created_at: OffsetDateTime,
    ) -> ArenaResult<TournamentId> {
        let id = TournamentId(self.store.next_id(EntityKind::Tournament)?);
        let round_id = RoundId(self.store.next_id(EntityKind::Round)?);
        let winner = match report.leaderboard.as_slice() {
            [first, second, ..] if first.points > second.points => Some(first.agent_id),
            [only] => Some(only.agent_id),
            _ => None,
        };
        let tournament = Tournament {
            id,
            name: format!("{} round robin {}", report.game, id.0),
            game: report.game,
            kind: TournamentKind::RoundRobin,
            status: TournamentStatus::Pending,
            scoring: self.config.scoring(),
            seeding: Seeding::InputOrder,
            entrants,
            winner: None,
            created_at,
        };
        let round = RoundCommit {
            round: Round {
                id: round_id,
                tournament: id,
                number: 1,
                created_at,
                matches: report.matches.clone(),
            },
            actions,
            status: TournamentStatus::Completed,
            winner,
        };
        self.store.insert_with_round(tournament, round)?;
        Ok(id)
    }

    /// Create a one-off contest between two agents of `game`.
    ///
    /// # Errors
    /// - [`ArenaError::NotFound`] when an explicit agent is not eligible for `game`.
    /// - [`ArenaError::InvalidRequest`] when both explicit agents are the same.
    /// - [`ArenaError::NoEligibleAgents`] when automatic pairing finds no two agents
    ///   from different groups.
    #[instrument(skip(self))]
    pub fn create_contest(
        &self,
        name: &str,
        game: GameKind,
        pairing: ContestPairing,
    ) -> ArenaResult<ContestId> {
        let (agent1, agent2) = match pairing {
            ContestPairing::Explicit(a, b) => {
                if a == b {
                    return Err(ArenaError::InvalidRequest(format!(
                        "{a} cannot play against itself"
                    )));
                }
                (
                    self.directory.get_agent(game, a)?,
                    self.directory.get_agent(game, b)?,
                )
            }
            ContestPairing::Auto => {
                let agents = self.directory.list_agents(game)?;
                let mut iter = agents.iter();
                let first = iter.next().ok_or(ArenaError::NoEligibleAgents(game))?;
                let second = iter
                    .find(|a| a.group.id != first.group.id)
                    .ok_or(ArenaError::NoEligibleAgents(game))?;
                (first.clone(), second.clone())
            }
        };

        let id = ContestId(self.store.next_id(EntityKind::Contest)?);
        self.store.insert_contest(Contest {
            id,
            name: name.to_string(),
            game,
            agent1,
            agent2,
            status: ContestStatus::Pending,
            winner: None,
            last_match: None,
            runs: 0,
            created_at: OffsetDateTime::now_utc(),
            completed_at: None,
        })?;
        info!(%id, "contest created");
        Ok(id)
    }

    /// Runs a contest once more. Every run is a new match; the contest keeps the latest.
    #[instrument(skip(self))]
    pub fn run_contest(&self, id: ContestId) -> ArenaResult<Match> {
        let mut contest = self.store.contest(id)?;
        let settings = MatchSettings {
            match_id: MatchId(self.store.next_id(EntityKind::Match)?),
            game: contest.game,
            agent1: contest.agent1.clone(),
            agent2: contest.agent2.clone(),
        };
        let created_at = OffsetDateTime::now_utc();
        let (record, actions) = match self
            .pool
            .run(vec![settings.clone()], &CancelToken::new())
            .played
            .pop()
        {
            Some((_, outcome)) => record_match(&settings, outcome, created_at, false),
            None => failed_match(&settings, created_at, "no result from match runner"),
        };

        contest.status = match record.status {
            MatchStatus::Failed => ContestStatus::Failed,
            _ => ContestStatus::Completed,
        };
        contest.winner = record.winner;
        contest.runs += 1;
        contest.completed_at = Some(OffsetDateTime::now_utc());
        contest.last_match = Some(record.clone());
        self.store.record_contest_run(contest, actions)?;

        info!(%id, winner = ?record.winner, "contest run recorded");
        self.events.publish(ArenaEvent::ContestCompleted {
            contest: id,
            winner: record.winner,
        });
        Ok(record)
    }

    /// A contest and the action log of its latest run.
    pub fn get_contest(&self, id: ContestId) -> ArenaResult<ContestDetail> {
        let contest = self.store.contest(id)?;
        let actions = match &contest.last_match {
            Some(run) => self.store.actions(run.id)?,
            None => vec![],
        };
        let playback = (contest.game == GameKind::RockPaperScissors && contest.last_match.is_some())
            .then(|| pair_rounds(&actions));
        Ok(ContestDetail {
            contest,
            actions,
            playback,
        })
    }

    fn tournament_lock(&self, id: TournamentId) -> ArenaResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(ArenaError::persistence)?;
        Ok(locks.entry(id).or_default().clone())
    }
}

enum Slot {
    Ready(Match),
    Played(MatchId),
}

/// Turns an executor outcome into a match record and its action log.
///
/// A log that is not a contiguous sequence cannot be recorded: the match is then
/// stored as `failed` without actions.
fn record_match(
    settings: &MatchSettings,
    outcome: MatchOutcome,
    created_at: OffsetDateTime,
    knockout: bool,
) -> (Match, Vec<Action>) {
    let MatchOutcome {
        agent1_score,
        agent2_score,
        result,
        winner,
        mut actions,
        mut metadata,
    } = outcome;

    let mut status = MatchStatus::Completed;
    if let Err(e) = check_sequence(settings.match_id, 0, &actions) {
        status = MatchStatus::Failed;
        metadata.failure = Some(e.to_string());
        actions.clear();
    }
    if knockout && result == MatchResult::Draw && status == MatchStatus::Completed {
        metadata.advanced_by_tiebreak = Some(settings.agent1.id);
    }

    let record = Match {
        id: settings.match_id,
        agent1: settings.agent1.id,
        agent2: Some(settings.agent2.id),
        agent1_score,
        agent2_score,
        result,
        winner,
        status,
        metadata,
        created_at,
    };
    (record, actions)
}

fn failed_match(
    settings: &MatchSettings,
    created_at: OffsetDateTime,
    reason: &str,
) -> (Match, Vec<Action>) {
    warn!(match_id = %settings.match_id, reason, "match failed");
    let mut metadata = MatchMetadata::new(settings.game, &settings.agent1, Some(&settings.agent2));
    metadata.failure = Some(reason.to_string());
    let record = Match {
        id: settings.match_id,
        agent1: settings.agent1.id,
        agent2: Some(settings.agent2.id),
        agent1_score: 0,
        agent2_score: 0,
        result: MatchResult::Draw,
        winner: None,
        status: MatchStatus::Failed,
        metadata,
        created_at,
    };
    (record, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CodeRef, Group, GroupId};
    use crate::model::FaultKind;

    fn agent(id: u64) -> Agent {
        Agent::new(
            AgentId(id),
            format!("a{id}"),
            Group {
                id: GroupId(id),
                name: format!("g{id}"),
            },
            GameKind::TicTacToe,
            CodeRef::new("x"),
        )
    }

    fn settings() -> MatchSettings {
        MatchSettings {
            match_id: MatchId(7),
            game: GameKind::TicTacToe,
            agent1: agent(1),
            agent2: agent(2),
        }
    }

    fn outcome(result: MatchResult, actions: Vec<Action>) -> MatchOutcome {
        MatchOutcome {
            agent1_score: 0,
            agent2_score: 0,
            result,
            winner: None,
            actions,
            metadata: MatchMetadata::new(GameKind::TicTacToe, &agent(1), Some(&agent(2))),
        }
    }

    fn action(n: u32) -> Action {
        Action {
            move_number: n,
            agent: AgentId(1),
            payload: String::new(),
            state: String::new(),
        }
    }

    #[test]
    fn knockout_draw_advances_first_agent() {
        let (record, _) = record_match(
            &settings(),
            outcome(MatchResult::Draw, vec![]),
            OffsetDateTime::UNIX_EPOCH,
            true,
        );
        assert_eq!(record.winner, None);
        assert_eq!(record.metadata.advanced_by_tiebreak, Some(AgentId(1)));
        assert_eq!(record.advancing(), Some(AgentId(1)));

        let (record, _) = record_match(
            &settings(),
            outcome(MatchResult::Draw, vec![]),
            OffsetDateTime::UNIX_EPOCH,
            false,
        );
        assert_eq!(record.advancing(), None);
    }

    #[test]
    fn broken_log_fails_the_match() {
        let (record, log) = record_match(
            &settings(),
            outcome(MatchResult::Win, vec![action(0), action(0)]),
            OffsetDateTime::UNIX_EPOCH,
            true,
        );
        assert_eq!(record.status, MatchStatus::Failed);
        assert!(log.is_empty());
        assert!(record.metadata.failure.is_some());
        assert_eq!(record.advancing(), None);
    }

    #[test]
    fn runner_failure_is_a_failed_match() {
        let (record, log) = failed_match(&settings(), OffsetDateTime::UNIX_EPOCH, "gone");
        assert_eq!(record.status, MatchStatus::Failed);
        assert!(log.is_empty());
        assert!(record.metadata.faults.iter().all(|f| f.kind != FaultKind::Crashed));
    }
}
