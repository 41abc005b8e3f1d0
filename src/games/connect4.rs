//! Connect-4 on a 7-column, 6-row board.
//!
//! State sent to the player on move: `"<symbol>;<last column or -1>;<rows>"` where
//! `<symbol>` is `X` (first seat) or `O`, and `<rows>` lists the six rows from top
//! to bottom separated by `/`, each cell being `.`, `X` or `O`.
//! Expected action: the column index `0..=6`.

use crate::game_interface::{
    Applied, Game, GameInfo, GameKind, IllegalMove, Outcome, Seat, Sequentialness,
};

const COLUMNS: usize = 7;
const ROWS: usize = 6;

pub struct Connect4 {
    // columns[c][r], r = 0 is the bottom cell
    columns: [[Option<Seat>; ROWS]; COLUMNS],
    heights: [usize; COLUMNS],
    current: Seat,
    last_move: Option<usize>,
    winner: Option<Seat>,
}

impl Default for Connect4 {
    fn default() -> Self {
        Self::new()
    }
}

impl Connect4 {
    pub fn new() -> Self {
        Connect4 {
            columns: [[None; ROWS]; COLUMNS],
            heights: [0; COLUMNS],
            current: Seat::First,
            last_move: None,
            winner: None,
        }
    }

    fn symbol(cell: Option<Seat>) -> char {
        match cell {
            None => '.',
            Some(Seat::First) => 'X',
            Some(Seat::Second) => 'O',
        }
    }

    fn rows(&self) -> Vec<String> {
        (0..ROWS)
            .rev()
            .map(|r| {
                (0..COLUMNS)
                    .map(|c| Self::symbol(self.columns[c][r]))
                    .collect()
            })
            .collect()
    }

    fn is_full(&self) -> bool {
        self.heights.iter().all(|&h| h == ROWS)
    }

    fn cell(&self, c: isize, r: isize) -> Option<Seat> {
        if c < 0 || r < 0 || c >= COLUMNS as isize || r >= ROWS as isize {
            return None;
        }
        self.columns[c as usize][r as usize]
    }

    fn wins_from(&self, col: usize, row: usize, seat: Seat) -> bool {
        const DIRS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
        let (c, r) = (col as isize, row as isize);
        DIRS.iter().any(|&(dc, dr)| {
            let mut count = 1;
            for sign in [1, -1] {
                let mut k = 1;
                while self.cell(c + sign * k * dc, r + sign * k * dr) == Some(seat) {
                    count += 1;
                    k += 1;
                }
            }
            count >= 4
        })
    }
}

impl Game for Connect4 {
    fn get_game_info(&self) -> GameInfo {
        GameInfo {
            kind: GameKind::Connect4,
            sequentialness: Sequentialness::Sequential,
        }
    }

    fn apply_action(&mut self, action: &str) -> Result<Applied, IllegalMove> {
        let illegal = |reason: &str| IllegalMove {
            action: action.to_string(),
            reason: reason.to_string(),
        };
        let col: usize = action
            .trim()
            .parse()
            .map_err(|_| illegal("not a column number"))?;
        if col >= COLUMNS {
            return Err(illegal("column out of range"));
        }
        let row = self.heights[col];
        if row >= ROWS {
            return Err(illegal("column is full"));
        }

        self.columns[col][row] = Some(self.current);
        self.heights[col] += 1;
        self.last_move = Some(col);
        if self.wins_from(col, row, self.current) {
            self.winner = Some(self.current);
        }
        self.current = self.current.other();
        Ok(Applied::Accepted)
    }

    fn get_state(&self) -> String {
        let symbol = Self::symbol(Some(self.current));
        let last = self.last_move.map_or(-1, |c| c as i64);
        format!("{symbol};{last};{}", self.rows().join("/"))
    }

    fn snapshot(&self) -> String {
        self.rows().join("\n")
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
