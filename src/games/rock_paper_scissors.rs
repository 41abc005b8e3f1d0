//! Rock-Paper-Scissors played in rounds.
//!
//! Each round is two recorded actions: the first seat chooses, then the second.
//! The second seat never sees the first seat's pending choice.
//!
//! State sent to the player on move: `"round=<n>;score=<mine>-<theirs>;last=<move>"`,
//! where `last` is the opponent's move from the previous round (`-` if none).
//! Expected action: `rock`, `paper` or `scissors`.
//!
//! A move outside that vocabulary costs the offender the round. The first seat's
//! move is judged first, so when both are invalid the second seat takes the
//! round. The match ends when a seat reaches the target
//! number of round wins or when the round cap is hit.

use std::{fmt::Display, str::FromStr};

use serde::Serialize;

use crate::agent::AgentId;
use crate::game_interface::{
    Applied, Game, GameInfo, GameKind, IllegalMove, Outcome, Seat, Sequentialness,
};
use crate::model::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpsMove {
    Rock,
    Paper,
    Scissors,
}

impl RpsMove {
    /// The move this one defeats.
    pub fn beats(self) -> RpsMove {
        match self {
            RpsMove::Rock => RpsMove::Scissors,
            RpsMove::Scissors => RpsMove::Paper,
            RpsMove::Paper => RpsMove::Rock,
        }
    }
}

impl FromStr for RpsMove {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(RpsMove::Rock),
            "paper" => Ok(RpsMove::Paper),
            "scissors" => Ok(RpsMove::Scissors),
            other => Err(format!("'{other}' is not rock, paper or scissors")),
        }
    }
}

impl Display for RpsMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RpsMove::Rock => "rock",
            RpsMove::Paper => "paper",
            RpsMove::Scissors => "scissors",
        })
    }
}

/// Winner of one round, `None` for a draw.
pub fn determine_winner(first: RpsMove, second: RpsMove) -> Option<Seat> {
    if first == second {
        None
    } else if first.beats() == second {
        Some(Seat::First)
    } else {
        Some(Seat::Second)
    }
}

/// Round winner when either move may be outside the vocabulary.
fn resolve_round(first: Option<RpsMove>, second: Option<RpsMove>) -> Option<Seat> {
    match (first, second) {
        (Some(a), Some(b)) => determine_winner(a, b),
        (None, _) => Some(Seat::Second),
        (Some(_), None) => Some(Seat::First),
    }
}

pub struct RockPaperScissors {
    target_wins: u32,
    max_rounds: u32,
    round: u32,
    pending: Option<(String, Option<RpsMove>)>,
    last_moves: Option<[String; 2]>,
    score: [u32; 2],
    current: Seat,
}

impl RockPaperScissors {
    /// `target_wins` round wins end the match; `max_rounds` caps its length.
    pub fn new(target_wins: u32, max_rounds: u32) -> Self {
        RockPaperScissors {
            target_wins: target_wins.max(1),
            max_rounds: max_rounds.max(1),
            round: 1,
            pending: None,
            last_moves: None,
            score: [0, 0],
            current: Seat::First,
        }
    }
}

impl Game for RockPaperScissors {
    fn get_game_info(&self) -> GameInfo {
        GameInfo {
            kind: GameKind::RockPaperScissors,
            sequentialness: Sequentialness::Simultaneous,
        }
    }

    fn apply_action(&mut self, action: &str) -> Result<Applied, IllegalMove> {
        let parsed = action.parse::<RpsMove>();
        let applied = match &parsed {
            Ok(_) => Applied::Accepted,
            Err(reason) => Applied::Forfeited(reason.clone()),
        };
        let parsed = parsed.ok();

        match self.current {
            Seat::First => {
                self.pending = Some((action.trim().to_string(), parsed));
            }
            Seat::Second => {
                let (first_raw, first) = self.pending.take().unwrap_or_default();
                if let Some(winner) = resolve_round(first, parsed) {
                    self.score[winner.index()] += 1;
                }
                self.last_moves = Some([first_raw, action.trim().to_string()]);
                self.round += 1;
            }
        }
        self.current = self.current.other();
        Ok(applied)
    }

    fn get_state(&self) -> String {
        let me = self.current.index();
        let them = self.current.other().index();
        let last = self
            .last_moves
            .as_ref()
            .map_or("-", |moves| moves[them].as_str());
        format!(
            "round={};score={}-{};last={last}",
            self.round, self.score[me], self.score[them]
        )
    }

    fn snapshot(&self) -> String {
        match (&self.pending, &self.last_moves) {
            (Some(_), _) => format!(
                "round={};awaiting=second;score={}-{}",
                self.round, self.score[0], self.score[1]
            ),
            (None, Some([a, b])) => format!(
                "round={};moves={a}:{b};score={}-{}",
                self.round - 1,
                self.score[0],
                self.score[1]
            ),
            (None, None) => format!("round={};score=0-0", self.round),
        }
    }

    fn get_current_player(&self) -> Seat {
        self.current
    }

    fn is_finished(&self) -> bool {
        self.pending.is_none()
            && (self.score.iter().any(|&s| s >= self.target_wins) || self.round > self.max_rounds)
    }

    fn outcome(&self) -> Outcome {
        match self.score[0].cmp(&self.score[1]) {
            std::cmp::Ordering::Greater => Outcome::Winner(Seat::First),
            std::cmp::Ordering::Less => Outcome::Winner(Seat::Second),
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    fn scores(&self) -> [u32; 2] {
        self.score
    }
}

/// One replayed round of a recorded RPS match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpsRound {
    /// 1-based round number.
    pub number: u32,
    pub first: Action,
    pub second: Action,
    /// Agent that won the round, `None` for a draw.
    pub winner: Option<AgentId>,
}

/// Recorded actions regrouped into rounds for playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpsPlayback {
    pub rounds: Vec<RpsRound>,
    /// Trailing action of a round the opponent never answered.
    pub incomplete: Option<Action>,
}

/// Pairs consecutive actions into rounds. An odd trailing action is reported as
/// incomplete, never paired.
pub fn pair_rounds(actions: &[Action]) -> RpsPlayback {
    let mut chunks = actions.chunks_exact(2);
    let rounds = chunks
        .by_ref()
        .zip(1..)
        .map(|(pair, number)| {
            let (first, second) = (&pair[0], &pair[1]);
            let winner = resolve_round(first.payload.parse().ok(), second.payload.parse().ok())
                .map(|seat| match seat {
                    Seat::First => first.agent,
                    Seat::Second => second.agent,
                });
            RpsRound {
                number,
                first: first.clone(),
                second: second.clone(),
                winner,
            }
        })
        .collect();
    let incomplete = chunks.remainder().first().cloned();
    RpsPlayback { rounds, incomplete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RpsMove::*;

    #[test]
    fn determine_winner_matches_relation_table() {
        let table = [
            (Rock, Rock, None),
            (Rock, Paper, Some(Seat::Second)),
            (Rock, Scissors, Some(Seat::First)),
            (Paper, Rock, Some(Seat::First)),
            (Paper, Paper, None),
            (Paper, Scissors, Some(Seat::Second)),
            (Scissors, Rock, Some(Seat::Second)),
            (Scissors, Paper, Some(Seat::First)),
            (Scissors, Scissors, None),
        ];
        for (a, b, expected) in table {
            assert_eq!(determine_winner(a, b), expected, "{a} vs {b}");
        }
    }

    #[test]
    fn best_of_three_ends_at_two_wins() {
        let mut game = RockPaperScissors::new(2, 10);
        for m in ["rock", "scissors", "paper", "paper", "scissors", "paper"] {
            assert!(!game.is_finished());
            game.apply_action(m).unwrap();
        }
        assert!(game.is_finished());
        assert_eq!(game.scores(), [2, 0]);
        assert_eq!(game.outcome(), Outcome::Winner(Seat::First));
    }

    #[test]
    fn invalid_move_loses_only_the_round() {
        let mut game = RockPaperScissors::new(2, 10);
        assert_eq!(game.apply_action("rock").unwrap(), Applied::Accepted);
        assert!(matches!(
            game.apply_action("lizard").unwrap(),
            Applied::Forfeited(_)
        ));
        assert_eq!(game.scores(), [1, 0]);
        assert!(!game.is_finished());

        game.apply_action("dynamite").unwrap();
        game.apply_action("spock").unwrap();
        assert_eq!(game.scores(), [1, 1], "invalid first move loses first");
    }

    #[test]
    fn second_seat_does_not_see_pending_move() {
        let mut game = RockPaperScissors::new(2, 10);
        game.apply_action("paper").unwrap();
        assert_eq!(game.get_state(), "round=1;score=0-0;last=-");
        assert_eq!(game.snapshot(), "round=1;awaiting=second;score=0-0");
        game.apply_action("rock").unwrap();
        assert_eq!(game.snapshot(), "round=1;moves=paper:rock;score=1-0");
        assert_eq!(game.get_state(), "round=2;score=1-0;last=rock");
    }

    #[test]
    fn round_cap_decides_on_score() {
        let mut game = RockPaperScissors::new(5, 2);
        for m in ["rock", "rock", "rock", "paper"] {
            game.apply_action(m).unwrap();
        }
        assert!(game.is_finished());
        assert_eq!(game.outcome(), Outcome::Winner(Seat::Second));
    }

    fn action(n: u32, agent: u64, payload: &str) -> Action {
        Action {
            move_number: n,
            agent: AgentId(agent),
            payload: payload.into(),
            state: String::new(),
        }
    }

    #[test]
    fn playback_pairs_rounds() {
        let actions = [
            action(0, 1, "rock"),
            action(1, 2, "scissors"),
            action(2, 1, "paper"),
            action(3, 2, "rock"),
        ];
        let playback = pair_rounds(&actions);
        assert_eq!(playback.rounds.len(), 2);
        assert_eq!(playback.rounds[0].winner, Some(AgentId(1)));
        assert_eq!(playback.rounds[1].winner, Some(AgentId(1)));
        assert_eq!(playback.rounds[1].number, 2);
        assert!(playback.incomplete.is_none());
    }

    #[test]
    fn playback_flags_trailing_action() {
        let actions = [
            action(0, 1, "rock"),
            action(1, 2, "rock"),
            action(2, 1, "paper"),
        ];
        let playback = pair_rounds(&actions);
        assert_eq!(playback.rounds.len(), 1);
        assert_eq!(playback.rounds[0].winner, None);
        assert_eq!(playback.incomplete, Some(action(2, 1, "paper")));
    }

    #[test]
    fn playback_judges_first_seat_first() {
        let actions = [
            action(0, 1, "dynamite"),
            action(1, 2, "spock"),
            action(2, 1, "rock"),
            action(3, 2, "lizard"),
        ];
        let playback = pair_rounds(&actions);
        assert_eq!(playback.rounds[0].winner, Some(AgentId(2)));
        assert_eq!(playback.rounds[1].winner, Some(AgentId(1)));
    }
}
