//! Traits the match executor drives games through.
//!
//! A [`Game`] is always played by two seats. Sequential games (Connect-4,
//! Tic-Tac-Toe) alternate turns; simultaneous games (Rock-Paper-Scissors) are
//! serialized as "first seat chooses, then second seat chooses" with the
//! first choice hidden from the second seat until the round resolves.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// The games the arena knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameKind {
    /// Connect-4 on a 7x6 board.
    #[serde(rename = "conn4")]
    Connect4,
    /// Tic-Tac-Toe on a 3x3 board.
    #[serde(rename = "tictactoe")]
    TicTacToe,
    /// Rock-Paper-Scissors played in rounds.
    #[serde(rename = "rps")]
    RockPaperScissors,
}

impl GameKind {
    /// All supported games.
    pub const ALL: [GameKind; 3] = [
        GameKind::Connect4,
        GameKind::TicTacToe,
        GameKind::RockPaperScissors,
    ];

    /// Short identifier used on the wire and in directory layouts.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Connect4 => "conn4",
            GameKind::TicTacToe => "tictactoe",
            GameKind::RockPaperScissors => "rps",
        }
    }
}

impl Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conn4" | "connect4" | "connect-4" => Ok(GameKind::Connect4),
            "tictactoe" | "tic-tac-toe" | "ttt" => Ok(GameKind::TicTacToe),
            "rps" | "rock-paper-scissors" | "rockpaperscissors" => {
                Ok(GameKind::RockPaperScissors)
            }
            other => Err(format!("unknown game '{other}'")),
        }
    }
}

/// Which of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// Agent 1, always moves first.
    First,
    /// Agent 2.
    Second,
}

impl Seat {
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

/// Sequential: one player after the other (connect-4).
/// Simultaneous: both players choose per round (rock-paper-scissors).
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Sequentialness {
    Sequential,
    Simultaneous,
}

/// Static description of a game.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct GameInfo {
    pub kind: GameKind,
    pub sequentialness: Sequentialness,
}

/// Final (or current, when the move cap is hit) result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Seat),
    Draw,
}

/// A move the game refuses outright. The mover loses the match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal move '{action}': {reason}")]
pub struct IllegalMove {
    pub action: String,
    pub reason: String,
}

/// How an accepted action was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Normal move.
    Accepted,
    /// The action was recorded but was outside the game vocabulary, costing the
    /// mover the current round only (simultaneous games).
    Forfeited(String),
}

/// What the game should implement
pub trait Game: Send {
    /// Static information about this game.
    fn get_game_info(&self) -> GameInfo;

    /// Apply the action of the current player.
    ///
    /// # Errors
    /// [`IllegalMove`] when the action cannot be played at all. The current
    /// player is then considered to have lost the match.
    fn apply_action(&mut self, action: &str) -> Result<Applied, IllegalMove>;

    /// The state that will be sent to the current player.
    fn get_state(&self) -> String;

    /// Snapshot of the full game state, stored with each recorded action.
    fn snapshot(&self) -> String;

    /// The seat that should play now.
    fn get_current_player(&self) -> Seat;

    /// True if game is finished
    fn is_finished(&self) -> bool;

    /// Result so far. Only meaningful when finished or when the executor stops
    /// the game at the move cap.
    fn outcome(&self) -> Outcome;

    /// Per-seat score reported on the match record.
    fn scores(&self) -> [u32; 2];
}

/// What will be given to the executor to allow it to create games
pub trait GameFactory: Send + Sync {
    /// Returns an initialized game
    fn new_game(&self, kind: GameKind) -> Box<dyn Game>;
}

#[cfg(test)]
mod interface_tests {
    use super::*;

    struct DummyGame {
        moves: u32,
    }

    impl Game for DummyGame {
        fn get_game_info(&self) -> GameInfo {
            GameInfo {
                kind: GameKind::TicTacToe,
                sequentialness: Sequentialness::Sequential,
            }
        }

        fn apply_action(&mut self, _action: &str) -> Result<Applied, IllegalMove> {
            self.moves += 1;
            Ok(Applied::Accepted)
        }

        fn get_state(&self) -> String {
            self.moves.to_string()
        }

        fn snapshot(&self) -> String {
            self.get_state()
        }

        fn get_current_player(&self) -> Seat {
            if self.moves % 2 == 0 {
                Seat::First
            } else {
                Seat::Second
            }
        }

        fn is_finished(&self) -> bool {
            self.moves >= 3
        }

        fn outcome(&self) -> Outcome {
            Outcome::Draw
        }

        fn scores(&self) -> [u32; 2] {
            [0, 0]
        }
    }

    struct DummyFactory;

    impl GameFactory for DummyFactory {
        fn new_game(&self, _kind: GameKind) -> Box<dyn Game> {
            Box::new(DummyGame { moves: 0 })
        }
    }

    #[test]
    fn test_dyn_factory() {
        let mut game = DummyFactory.new_game(GameKind::TicTacToe);
        assert_eq!(game.get_current_player(), Seat::First);
        game.apply_action("x").unwrap();
        assert_eq!(game.get_current_player(), Seat::Second);
        assert_eq!(game.get_state(), "1");
    }

    #[test]
    fn game_kind_parses_aliases() {
        assert_eq!("Connect4".parse::<GameKind>(), Ok(GameKind::Connect4));
        assert_eq!("conn4".parse::<GameKind>(), Ok(GameKind::Connect4));
        assert_eq!("rps".parse::<GameKind>(), Ok(GameKind::RockPaperScissors));
        assert!("chess".parse::<GameKind>().is_err());
        for kind in GameKind::ALL {
            assert_eq!(kind.to_string().parse::<GameKind>(), Ok(kind));
        }
    }

    #[test]
    fn seats_alternate() {
        assert_eq!(Seat::First.other(), Seat::Second);
        assert_eq!(Seat::Second.other().index(), 0);
    }
}
