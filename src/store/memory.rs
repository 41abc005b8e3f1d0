//! In-memory store, used by the binary and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::{ArenaStore, EntityKind, RoundCommit};
use crate::agent::{AgentId, ContestId, MatchId, TournamentId};
use crate::error::{ArenaError, ArenaResult};
use crate::history::{check_sequence, HistoryRecorder};
use crate::model::{Action, Contest, Match, Round, Tournament, TournamentStatus};

/// Thread-safe in-memory store.
///
/// [`fail_writes`](Self::fail_writes) makes every write fail with
/// [`ArenaError::PersistenceFailure`], to exercise the all-or-nothing paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    fail_writes: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct StoreState {
    counters: HashMap<EntityKind, u64>,
    tournaments: BTreeMap<TournamentId, TournamentEntry>,
    match_index: HashMap<MatchId, TournamentId>,
    contests: BTreeMap<ContestId, Contest>,
    history: HistoryRecorder,
}

#[derive(Debug)]
struct TournamentEntry {
    tournament: Tournament,
    rounds: Vec<Round>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an unavailable backend for every following write.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> ArenaResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!("write rejected: store unavailable");
            return Err(ArenaError::persistence("store unavailable"));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> ArenaResult<T>) -> ArenaResult<T> {
        let state = self.state.read().map_err(ArenaError::persistence)?;
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> ArenaResult<T>) -> ArenaResult<T> {
        self.check_writable()?;
        let mut state = self.state.write().map_err(ArenaError::persistence)?;
        f(&mut state)
    }
}

impl StoreState {
    fn entry(&self, id: TournamentId) -> ArenaResult<&TournamentEntry> {
        self.tournaments
            .get(&id)
            .ok_or_else(|| ArenaError::NotFound(id.to_string()))
    }

    fn entry_mut(&mut self, id: TournamentId) -> ArenaResult<&mut TournamentEntry> {
        self.tournaments
            .get_mut(&id)
            .ok_or_else(|| ArenaError::NotFound(id.to_string()))
    }

    fn apply_round(&mut self, commit: RoundCommit) -> ArenaResult<()> {
        let tournament = commit.round.tournament;
        let entry = self.entry(tournament)?;
        let expected = entry.rounds.len() as u32 + 1;
        if commit.round.number != expected {
            return Err(ArenaError::InvalidRequest(format!(
                "{tournament} expects round {expected}, got {}",
                commit.round.number
            )));
        }
        for m in &commit.round.matches {
            if self.match_index.contains_key(&m.id) {
                return Err(ArenaError::InvalidRequest(format!("duplicate {}", m.id)));
            }
        }
        for (match_id, actions) in &commit.actions {
            check_sequence(*match_id, self.history.len(*match_id)?, actions)?;
        }

        // validated: nothing below can fail halfway
        for (match_id, actions) in &commit.actions {
            self.history.append_all(*match_id, actions)?;
        }
        for m in &commit.round.matches {
            self.match_index.insert(m.id, tournament);
        }
        let entry = self.entry_mut(tournament)?;
        debug!(%tournament, round = commit.round.number, "round committed");
        entry.rounds.push(commit.round);
        entry.tournament.status = commit.status;
        entry.tournament.winner = commit.winner;
        Ok(())
    }
}

impl ArenaStore for InMemoryStore {
    fn next_id(&self, kind: EntityKind) -> ArenaResult<u64> {
        let mut state = self.state.write().map_err(ArenaError::persistence)?;
        let counter = state.counters.entry(kind).or_default();
        *counter += 1;
        Ok(*counter)
    }

    fn insert_tournament(&self, tournament: Tournament) -> ArenaResult<()> {
        self.write(|state| {
            if state.tournaments.contains_key(&tournament.id) {
                return Err(ArenaError::InvalidRequest(format!(
                    "duplicate {}",
                    tournament.id
                )));
            }
            state.tournaments.insert(
                tournament.id,
                TournamentEntry {
                    tournament,
                    rounds: vec![],
                },
            );
            Ok(())
        })
    }

    fn set_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        winner: Option<AgentId>,
    ) -> ArenaResult<()> {
        self.write(|state| {
            let entry = state.entry_mut(id)?;
            entry.tournament.status = status;
            entry.tournament.winner = winner;
            Ok(())
        })
    }

    fn commit_round(&self, commit: RoundCommit) -> ArenaResult<()> {
        self.write(|state| state.apply_round(commit))
    }

    fn insert_with_round(&self, tournament: Tournament, commit: RoundCommit) -> ArenaResult<()> {
        self.write(|state| {
            let id = tournament.id;
            if state.tournaments.contains_key(&id) {
                return Err(ArenaError::InvalidRequest(format!("duplicate {id}")));
            }
            if commit.round.tournament != id {
                return Err(ArenaError::InvalidRequest(format!(
                    "round of {} committed with {id}",
                    commit.round.tournament
                )));
            }
            state.tournaments.insert(
                id,
                TournamentEntry {
                    tournament,
                    rounds: vec![],
                },
            );
            // apply_round validates before touching anything
            state.apply_round(commit).inspect_err(|_| {
                state.tournaments.remove(&id);
            })
        })
    }

    fn replace_match(&self, tournament: TournamentId, updated: Match) -> ArenaResult<()> {
        self.write(|state| {
            let entry = state.entry_mut(tournament)?;
            let slot = entry
                .rounds
                .iter_mut()
                .flat_map(|r| r.matches.iter_mut())
                .find(|m| m.id == updated.id)
                .ok_or_else(|| ArenaError::NotFound(updated.id.to_string()))?;
            *slot = updated;
            Ok(())
        })
    }

    fn tournament(&self, id: TournamentId) -> ArenaResult<Tournament> {
        self.read(|state| Ok(state.entry(id)?.tournament.clone()))
    }

    fn rounds(&self, id: TournamentId) -> ArenaResult<Vec<Round>> {
        self.read(|state| Ok(state.entry(id)?.rounds.clone()))
    }

    fn tournaments(&self) -> ArenaResult<Vec<Tournament>> {
        self.read(|state| {
            Ok(state
                .tournaments
                .values()
                .map(|e| e.tournament.clone())
                .collect())
        })
    }

    fn find_match(&self, match_id: MatchId) -> ArenaResult<(TournamentId, Match)> {
        self.read(|state| {
            let not_found = || ArenaError::NotFound(match_id.to_string());
            let tournament = *state.match_index.get(&match_id).ok_or_else(not_found)?;
            let found = state
                .entry(tournament)?
                .rounds
                .iter()
                .flat_map(|r| r.matches.iter())
                .find(|m| m.id == match_id)
                .cloned()
                .ok_or_else(not_found)?;
            Ok((tournament, found))
        })
    }

    fn actions(&self, match_id: MatchId) -> ArenaResult<Vec<Action>> {
        self.read(|state| state.history.read(match_id))
    }

    fn insert_contest(&self, contest: Contest) -> ArenaResult<()> {
        self.write(|state| {
            if state.contests.contains_key(&contest.id) {
                return Err(ArenaError::InvalidRequest(format!("duplicate {}", contest.id)));
            }
            state.contests.insert(contest.id, contest);
            Ok(())
        })
    }

    fn record_contest_run(&self, contest: Contest, actions: Vec<Action>) -> ArenaResult<()> {
        self.write(|state| {
            if !state.contests.contains_key(&contest.id) {
                return Err(ArenaError::NotFound(contest.id.to_string()));
            }
            if let Some(run) = &contest.last_match {
                check_sequence(run.id, state.history.len(run.id)?, &actions)?;
                state.history.append_all(run.id, &actions)?;
            }
            state.contests.insert(contest.id, contest);
            Ok(())
        })
    }

    fn contest(&self, id: ContestId) -> ArenaResult<Contest> {
        self.read(|state| {
            state
                .contests
                .get(&id)
                .cloned()
                .ok_or_else(|| ArenaError::NotFound(id.to_string()))
        })
    }
}
