//! Runs one match between two agents.
//!
//! The executor owns the game for the whole match: agents only ever see the state
//! string the game produces for them and answer with an action string. Agent 1 is
//! seated first and always opens. Any agent failure (launch, crash, timeout,
//! illegal action) ends the match with a loss for that agent and a fault record;
//! nothing in here returns an error to the scheduler.

use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info, instrument, trace, warn};

use crate::agent::{Agent, AgentId, MatchId};
use crate::agent_runtime::{AgentRuntime, AgentSession};
use crate::configuration::Configuration;
use crate::game_interface::{Applied, GameFactory, GameKind, Outcome, Seat, Sequentialness};
use crate::model::{Action, FaultKind, FaultRecord, MatchMetadata, MatchResult};

/// Everything needed to start a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub match_id: MatchId,
    pub game: GameKind,
    /// Seated first, moves first.
    pub agent1: Agent,
    pub agent2: Agent,
}

impl MatchSettings {
    fn agent(&self, seat: Seat) -> &Agent {
        match seat {
            Seat::First => &self.agent1,
            Seat::Second => &self.agent2,
        }
    }
}

impl Display for MatchSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} vs {}", self.agent1.name, self.agent2.name)
    }
}

/// Result of a match as seen by agent 1.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub agent1_score: u32,
    pub agent2_score: u32,
    pub result: MatchResult,
    pub winner: Option<AgentId>,
    pub actions: Vec<Action>,
    pub metadata: MatchMetadata,
}

impl MatchOutcome {
    fn decided(settings: &MatchSettings, outcome: Outcome, scores: [u32; 2]) -> Self {
        let (result, winner) = match outcome {
            Outcome::Winner(Seat::First) => (MatchResult::Win, Some(settings.agent1.id)),
            Outcome::Winner(Seat::Second) => (MatchResult::Loss, Some(settings.agent2.id)),
            Outcome::Draw => (MatchResult::Draw, None),
        };
        MatchOutcome {
            agent1_score: scores[0],
            agent2_score: scores[1],
            result,
            winner,
            actions: vec![],
            metadata: MatchMetadata::new(settings.game, &settings.agent1, Some(&settings.agent2)),
        }
    }

    /// `loser` forfeits: the other seat wins 1-0.
    fn forfeit(settings: &MatchSettings, loser: Seat) -> Self {
        let winner = loser.other();
        let mut scores = [0; 2];
        scores[winner.index()] = 1;
        Self::decided(settings, Outcome::Winner(winner), scores)
    }

    /// Outcome of a match stopped by the watchdog: the agent on move loses.
    pub fn timed_out(settings: &MatchSettings, progress: &MatchProgress) -> Self {
        let (actions, to_move) = progress.snapshot();
        let loser = settings.agent(to_move).id;
        let mut outcome = Self::forfeit(settings, to_move);
        outcome.metadata.faults.push(FaultRecord {
            agent: loser,
            kind: FaultKind::ExecutionTimeout,
            move_number: Some(actions.len() as u32),
            detail: "match timeout exceeded".into(),
        });
        outcome.metadata.incomplete_round =
            settings.game == GameKind::RockPaperScissors && actions.len() % 2 == 1;
        outcome.actions = actions;
        outcome
    }
}

/// Live view of a running match, shared with the watchdog of the pool.
#[derive(Debug, Default)]
pub struct MatchProgress {
    inner: Mutex<ProgressState>,
}

#[derive(Debug, Clone)]
struct ProgressState {
    actions: Vec<Action>,
    to_move: Seat,
}

impl Default for ProgressState {
    fn default() -> Self {
        ProgressState {
            actions: vec![],
            to_move: Seat::First,
        }
    }
}

impl MatchProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }

    /// Actions recorded so far and the seat currently on move.
    pub fn snapshot(&self) -> (Vec<Action>, Seat) {
        let guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (guard.actions.clone(), guard.to_move)
    }
}

/// Runs a match from launch to result.
#[instrument(skip_all, fields(match_id = %settings.match_id, game = %settings.game, %settings))]
pub fn run_match(
    settings: &MatchSettings,
    config: &Configuration,
    runtime: &dyn AgentRuntime,
    games: &dyn GameFactory,
    progress: &MatchProgress,
) -> MatchOutcome {
    let match_deadline = Instant::now() + config.match_timeout;

    let first = launch_with_retries(runtime, &settings.agent1, settings.game, config);
    let second = launch_with_retries(runtime, &settings.agent2, settings.game, config);
    let mut sessions = match (first, second) {
        (Ok(first), Ok(second)) => [first, second],
        (first, second) => return launch_failure(settings, first.err(), second.err()),
    };

    let mut game = games.new_game(settings.game);
    let simultaneous = game.get_game_info().sequentialness == Sequentialness::Simultaneous;
    let mut actions: Vec<Action> = vec![];
    let mut faults = vec![];

    while !game.is_finished() {
        let move_number = actions.len() as u32;
        if move_number >= config.max_moves {
            info!(move_number, "move cap reached");
            break;
        }

        let seat = game.get_current_player();
        let agent = settings.agent(seat);
        progress.update(|p| p.to_move = seat);

        let state = game.get_state();
        let deadline = match_deadline.min(Instant::now() + config.action_timeout);
        trace!(%agent.id, move_number, %state, "asking for action");

        let payload = match sessions[seat.index()].select_action(&state, deadline) {
            Ok(payload) => payload,
            Err(fault) => {
                warn!(%agent.id, move_number, %fault, "agent failed");
                return agent_failure(
                    settings,
                    seat,
                    actions,
                    faults,
                    simultaneous,
                    FaultRecord {
                        agent: agent.id,
                        kind: fault.kind(),
                        move_number: Some(move_number),
                        detail: fault.to_string(),
                    },
                );
            }
        };

        match game.apply_action(&payload) {
            Err(illegal) => {
                warn!(%agent.id, move_number, %illegal, "illegal move");
                return agent_failure(
                    settings,
                    seat,
                    actions,
                    faults,
                    simultaneous,
                    FaultRecord {
                        agent: agent.id,
                        kind: FaultKind::InvalidMove,
                        move_number: Some(move_number),
                        detail: illegal.to_string(),
                    },
                );
            }
            Ok(applied) => {
                if let Applied::Forfeited(reason) = applied {
                    debug!(%agent.id, move_number, %reason, "round forfeited");
                    faults.push(FaultRecord {
                        agent: agent.id,
                        kind: FaultKind::InvalidMove,
                        move_number: Some(move_number),
                        detail: reason,
                    });
                }
                let action = Action {
                    move_number,
                    agent: agent.id,
                    payload,
                    state: game.snapshot(),
                };
                progress.update(|p| p.actions.push(action.clone()));
                actions.push(action);
            }
        }
    }

    let mut outcome = MatchOutcome::decided(settings, game.outcome(), game.scores());
    outcome.metadata.faults = faults;
    outcome.metadata.incomplete_round = simultaneous && actions.len() % 2 == 1;
    outcome.actions = actions;
    info!(result = ?outcome.result, winner = ?outcome.winner, "match finished");
    outcome
}

fn agent_failure(
    settings: &MatchSettings,
    seat: Seat,
    actions: Vec<Action>,
    mut faults: Vec<FaultRecord>,
    simultaneous: bool,
    fault: FaultRecord,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::forfeit(settings, seat);
    faults.push(fault);
    outcome.metadata.faults = faults;
    outcome.metadata.incomplete_round = simultaneous && actions.len() % 2 == 1;
    outcome.actions = actions;
    outcome
}

fn launch_failure(
    settings: &MatchSettings,
    first: Option<anyhow::Error>,
    second: Option<anyhow::Error>,
) -> MatchOutcome {
    let mut outcome = match (&first, &second) {
        (Some(_), None) => MatchOutcome::forfeit(settings, Seat::First),
        (None, Some(_)) => MatchOutcome::forfeit(settings, Seat::Second),
        _ => MatchOutcome::decided(settings, Outcome::Draw, [0, 0]),
    };
    for (seat, err) in [(Seat::First, first), (Seat::Second, second)] {
        if let Some(err) = err {
            outcome.metadata.faults.push(FaultRecord {
                agent: settings.agent(seat).id,
                kind: FaultKind::LaunchFailed,
                move_number: None,
                detail: format!("{err:#}"),
            });
        }
    }
    outcome
}

fn launch_with_retries(
    runtime: &dyn AgentRuntime,
    agent: &Agent,
    game: GameKind,
    config: &Configuration,
) -> anyhow::Result<Box<dyn AgentSession>> {
    let mut attempt = 0;
    loop {
        match runtime.launch(agent, game) {
            Ok(session) => return Ok(session),
            Err(e) if attempt < config.launch_retries => {
                attempt += 1;
                warn!(%agent.id, attempt, "launch failed, retrying: {e:#}");
            }
            Err(e) => {
                warn!(%agent.id, "launch failed: {e:#}");
                return Err(e);
            }
        }
    }
}
