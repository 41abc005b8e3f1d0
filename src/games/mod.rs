//! Built-in game rules.

pub mod connect4;
pub mod rock_paper_scissors;
pub mod tic_tac_toe;

pub use connect4::Connect4;
pub use rock_paper_scissors::{
    determine_winner, pair_rounds, RockPaperScissors, RpsMove, RpsPlayback, RpsRound,
};
pub use tic_tac_toe::TicTacToe;

use crate::configuration::Configuration;
use crate::game_interface::{Game, GameFactory, GameKind};

/// Factory for the three built-in games, parameterised by the configuration.
#[derive(Debug, Clone, Copy)]
pub struct StandardGames {
    rps_target_wins: u32,
    rps_max_rounds: u32,
}

impl StandardGames {
    pub fn new(config: &Configuration) -> Self {
        StandardGames {
            rps_target_wins: config.rps_target_wins,
            rps_max_rounds: config.rps_max_rounds,
        }
    }
}

impl Default for StandardGames {
    fn default() -> Self {
        Self::new(&Configuration::default())
    }
}

impl GameFactory for StandardGames {
    fn new_game(&self, kind: GameKind) -> Box<dyn Game> {
        match kind {
            GameKind::Connect4 => Box::new(Connect4::new()),
            GameKind::TicTacToe => Box::new(TicTacToe::new()),
            GameKind::RockPaperScissors => Box::new(RockPaperScissors::new(
                self.rps_target_wins,
                self.rps_max_rounds,
            )),
        }
    }
}
