//! Append-only action log, one sequence per match.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::warn;

use crate::agent::MatchId;
use crate::error::{ArenaError, ArenaResult};
use crate::model::Action;

/// Keeps the ordered actions of every match.
///
/// Move numbers must start at 0 and increase by exactly one. Anything else is
/// rejected with [`ArenaError::SequenceViolation`] and leaves the log untouched.
#[derive(Debug, Default)]
pub struct HistoryRecorder {
    logs: RwLock<HashMap<MatchId, Vec<Action>>>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one action to the log of `match_id`.
    pub fn append(&self, match_id: MatchId, action: Action) -> ArenaResult<()> {
        let mut logs = self.logs.write().map_err(ArenaError::persistence)?;
        let log = logs.entry(match_id).or_default();
        check_sequence(match_id, log.len(), std::slice::from_ref(&action))?;
        log.push(action);
        Ok(())
    }

    /// Appends a batch. Either every action is written or none.
    pub fn append_all(&self, match_id: MatchId, actions: &[Action]) -> ArenaResult<()> {
        let mut logs = self.logs.write().map_err(ArenaError::persistence)?;
        let len = logs.get(&match_id).map_or(0, Vec::len);
        check_sequence(match_id, len, actions)?;
        logs.entry(match_id)
            .or_default()
            .extend(actions.iter().cloned());
        Ok(())
    }

    /// Actions of `match_id` in move order. Unknown matches have an empty history.
    pub fn read(&self, match_id: MatchId) -> ArenaResult<Vec<Action>> {
        let logs = self.logs.read().map_err(ArenaError::persistence)?;
        Ok(logs.get(&match_id).cloned().unwrap_or_default())
    }

    /// Number of actions recorded for `match_id`.
    pub fn len(&self, match_id: MatchId) -> ArenaResult<usize> {
        let logs = self.logs.read().map_err(ArenaError::persistence)?;
        Ok(logs.get(&match_id).map_or(0, Vec::len))
    }
}

/// Checks that `actions` continue a log currently holding `existing` actions.
pub fn check_sequence(match_id: MatchId, existing: usize, actions: &[Action]) -> ArenaResult<()> {
    for (offset, action) in actions.iter().enumerate() {
        let expected = (existing + offset) as u32;
        if action.move_number != expected {
            warn!(%match_id, expected, got = action.move_number, "action out of sequence");
            return Err(ArenaError::SequenceViolation {
                match_id,
                expected,
                got: action.move_number,
            });
        }
    }
    Ok(())
}
