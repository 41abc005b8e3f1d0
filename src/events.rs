//! Notifications published by the arena.
//!
//! Subscribers get their own channel from [`EventBus::subscribe`]. Publishing never
//! blocks, and subscribers that dropped their receiver are forgotten on the next
//! publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::{AgentId, ContestId, MatchId, RoundId, TournamentId};
use crate::game_interface::GameKind;
use crate::model::MatchResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArenaEvent {
    TournamentCreated {
        tournament: TournamentId,
        game: GameKind,
        entrants: usize,
    },
    MatchRecorded {
        match_id: MatchId,
        result: MatchResult,
        winner: Option<AgentId>,
    },
    RoundCompleted {
        tournament: TournamentId,
        round: RoundId,
        number: u32,
    },
    TournamentCompleted {
        tournament: TournamentId,
        winner: Option<AgentId>,
    },
    RoundRobinFinished {
        game: GameKind,
        total_matches: usize,
        cancelled: bool,
    },
    ContestCompleted {
        contest: ContestId,
        winner: Option<AgentId>,
    },
}

/// Fan-out of [`ArenaEvent`]s to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ArenaEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ArenaEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: ArenaEvent) {
        trace!(?event, "publish");
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<ArenaEvent>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
