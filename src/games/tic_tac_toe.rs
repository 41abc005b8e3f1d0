//! Tic-Tac-Toe.
//!
//! State sent to the player on move: `"<symbol>;<cells>"`, `<cells>` being the nine
//! cells row by row, each `.`, `X` or `O`. Expected action: a cell index `0..=8`.

use crate::game_interface::{
    Applied, Game, GameInfo, GameKind, IllegalMove, Outcome, Seat, Sequentialness,
};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub struct TicTacToe {
    board: [Option<Seat>; 9],
    current: Seat,
    winner: Option<Seat>,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    pub fn new() -> Self {
        TicTacToe {
            board: [None; 9],
            current: Seat::First,
            winner: None,
        }
    }

    fn cells(&self) -> String {
        self.board
            .iter()
            .map(|cell| match cell {
                None => '.',
                Some(Seat::First) => 'X',
                Some(Seat::Second) => 'O',
            })
            .collect()
    }

    fn is_winner(&self, seat: Seat) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.board[i] == Some(seat)))
    }

    fn is_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }
}

impl Game for TicTacToe {
    fn get_game_info(&self) -> GameInfo {
        GameInfo {
            kind: GameKind::TicTacToe,
            sequentialness: Sequentialness::Sequential,
        }
    }

    fn apply_action(&mut self, action: &str) -> Result<Applied, IllegalMove> {
        let illegal = |reason: &str| IllegalMove {
            action: action.to_string(),
            reason: reason.to_string(),
        };
        let cell: usize = action
            .trim()
            .parse()
            .map_err(|_| illegal("not a cell index"))?;
        match self.board.get(cell) {
            None => return Err(illegal("cell out of range")),
            Some(Some(_)) => return Err(illegal("cell already taken")),
            Some(None) => {}
        }

        self.board[cell] = Some(self.current);
        if self.is_winner(self.current) {
            self.winner = Some(self.current);
        }
        self.current = self.current.other();
        Ok(Applied::Accepted)
    }

    fn get_state(&self) -> String {
        let symbol = if self.current == Seat::First { 'X' } else { 'O' };
        format!("{symbol};{}", self.cells())
    }

    fn snapshot(&self) -> String {
        let cells = self.cells();
        [&cells[0..3], &cells[3..6], &cells[6..9]].join("\n")
    }

    fn get_current_player(&self) -> Seat {
        self.current
    }

    fn is_finished(&self) -> bool {
        self.winner.is_some() || self.is_full()
    }

    fn outcome(&self) -> Outcome {
        self.winner.map_or(Outcome::Draw, Outcome::Winner)
    }

    fn scores(&self) -> [u32; 2] {
        match self.winner {
            Some(Seat::First) => [1, 0],
            Some(Seat::Second) => [0, 1],
            None => [0, 0],
        }
    }
}
