//! Tic-tac-toe game state.
//!
//! The board is indexed 1..9 row-major. Turn order and terminal state are
//! enforced here; who is allowed to call what is the session layer's job.

use std::fmt;

use morris_netproto::role::Role;
use thiserror::Error;

/// Length of the rendered board: three rows of `C|C|C\n`.
pub const BOARD_STATE_LEN: usize = 18;

/// All eight winning lines, as cell indices 0..9.
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

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("unparsable move")]
    Malformed,
    #[error("no role in the game")]
    BadRole,
    #[error("game is over")]
    GameOver,
    #[error("not this role's turn")]
    WrongTurn,
    #[error("symbol disagrees with assignment")]
    WrongSymbol,
    #[error("cell out of range")]
    CellOutOfRange,
    #[error("cell already occupied")]
    CellOccupied,
}

/// An immutable, validated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Board cell, 1..9 row-major.
    pub cell: u8,
    pub role: Role,
    /// `b'X'` or `b'O'`, fixed at parse time.
    pub symbol: u8,
}

impl fmt::Display for Move {
    /// Renders the long wire form, `d<-S`; parsing it back yields this move.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<-{}", self.cell, self.symbol as char)
    }
}

/// One game between two roles.
#[derive(Debug, Default)]
pub struct Game {
    cells: [Option<Role>; 9],
    expected_turn: Role,
    /// Symbols for First / Second, assigned on first move parse.
    symbols: [Option<u8>; 2],
    over: bool,
    winner: Role,
}

impl Game {
    pub fn new() -> Self {
        Self {
            expected_turn: Role::First,
            ..Self::default()
        }
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Winning role, or `Role::None` for a draw or an unfinished game.
    pub fn winner(&self) -> Role {
        self.winner
    }

    pub fn expected_turn(&self) -> Role {
        self.expected_turn
    }

    fn symbol_index(role: Role) -> Result<usize, GameError> {
        match role {
            Role::First => Ok(0),
            Role::Second => Ok(1),
            Role::None => Err(GameError::BadRole),
        }
    }

    fn symbol_of(&self, role: Role) -> Option<u8> {
        Self::symbol_index(role).ok().and_then(|i| self.symbols[i])
    }

    /// Resolve `role`'s symbol, assigning one if still unassigned.
    ///
    /// Without a requested symbol the first assignee gets `X` and the other
    /// role gets whatever is left. A requested symbol must match an existing
    /// assignment and may not collide with the opponent's.
    fn assign_symbol(&mut self, role: Role, requested: Option<u8>) -> Result<u8, GameError> {
        let idx = Self::symbol_index(role)?;
        let other = self.symbols[1 - idx];

        if let Some(sym) = self.symbols[idx] {
            return match requested {
                Some(r) if r != sym => Err(GameError::WrongSymbol),
                _ => Ok(sym),
            };
        }

        let sym = match requested {
            Some(r) => {
                if other == Some(r) {
                    return Err(GameError::WrongSymbol);
                }
                r
            }
            None => match other {
                Some(b'X') => b'O',
                Some(_) => b'X',
                None => b'X',
            },
        };
        self.symbols[idx] = Some(sym);
        Ok(sym)
    }

    /// Interpret `s` as a move by `role`.
    ///
    /// Accepted forms: a single digit `1`..`9`, or the four-character
    /// `d<-S` with `S` literally `X` or `O`. Never touches the board, but
    /// may fix the role's symbol assignment.
    pub fn parse_move(&mut self, role: Role, s: &str) -> Result<Move, GameError> {
        if role == Role::None {
            return Err(GameError::BadRole);
        }
        let b = s.as_bytes();
        match b.len() {
            1 => {
                if !b[0].is_ascii_digit() || b[0] == b'0' {
                    return Err(GameError::Malformed);
                }
                let symbol = self.assign_symbol(role, None)?;
                Ok(Move {
                    cell: b[0] - b'0',
                    role,
                    symbol,
                })
            }
            4 => {
                if !b[0].is_ascii_digit() || b[0] == b'0' || b[1] != b'<' || b[2] != b'-' {
                    return Err(GameError::Malformed);
                }
                if b[3] != b'X' && b[3] != b'O' {
                    return Err(GameError::Malformed);
                }
                let symbol = self.assign_symbol(role, Some(b[3]))?;
                Ok(Move {
                    cell: b[0] - b'0',
                    role,
                    symbol,
                })
            }
            _ => Err(GameError::Malformed),
        }
    }

    /// Apply a parsed move, flip the turn, and re-evaluate terminal state.
    pub fn apply(&mut self, mv: &Move) -> Result<(), GameError> {
        if self.over {
            return Err(GameError::GameOver);
        }
        if mv.role == Role::None || mv.role != self.expected_turn {
            return Err(GameError::WrongTurn);
        }
        if self.symbol_of(mv.role) != Some(mv.symbol) {
            return Err(GameError::WrongSymbol);
        }
        if !(1..=9).contains(&mv.cell) {
            return Err(GameError::CellOutOfRange);
        }
        let idx = (mv.cell - 1) as usize;
        if self.cells[idx].is_some() {
            return Err(GameError::CellOccupied);
        }

        self.cells[idx] = Some(mv.role);
        self.expected_turn = mv.role.opponent();
        self.scan_terminal();
        Ok(())
    }

    fn scan_terminal(&mut self) {
        for line in LINES {
            let [a, b, c] = line.map(|i| self.cells[i]);
            if let Some(role) = a
                && b == Some(role)
                && c == Some(role)
            {
                self.over = true;
                self.winner = role;
                return;
            }
        }
        if self.cells.iter().all(Option::is_some) {
            self.over = true;
            self.winner = Role::None;
        }
    }

    /// Resign the game on behalf of `role`; the opponent wins.
    pub fn resign(&mut self, role: Role) -> Result<(), GameError> {
        if role == Role::None {
            return Err(GameError::BadRole);
        }
        if self.over {
            return Err(GameError::GameOver);
        }
        self.over = true;
        self.winner = role.opponent();
        Ok(())
    }

    /// Render the board as exactly [`BOARD_STATE_LEN`] bytes:
    /// three rows of `C|C|C\n` where `C` is the cell's symbol or a space.
    pub fn unparse_state(&self) -> String {
        let mut out = String::with_capacity(BOARD_STATE_LEN);
        for row in 0..3 {
            for col in 0..3 {
                let cell = self.cells[row * 3 + col];
                let sym = cell.and_then(|r| self.symbol_of(r)).unwrap_or(b' ');
                out.push(sym as char);
                if col != 2 {
                    out.push('|');
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{BOARD_STATE_LEN, Game, GameError, Move};
    use morris_netproto::role::Role;

    fn play(game: &mut Game, role: Role, s: &str) {
        let mv = game.parse_move(role, s).unwrap();
        game.apply(&mv).unwrap();
    }

    #[test]
    fn initial_state_renders_empty_board() {
        let game = Game::new();
        let state = game.unparse_state();
        assert_eq!(state.len(), BOARD_STATE_LEN);
        assert_eq!(state, " | | \n | | \n | | \n");
        assert_eq!(game.expected_turn(), Role::First);
        assert!(!game.is_over());
    }

    #[test]
    fn short_form_assigns_x_to_first_mover() {
        let mut game = Game::new();
        let mv = game.parse_move(Role::First, "5").unwrap();
        assert_eq!(mv, Move { cell: 5, role: Role::First, symbol: b'X' });
        game.apply(&mv).unwrap();
        assert_eq!(game.unparse_state(), " | | \n |X| \n | | \n");

        // Second mover gets whichever symbol is left.
        let mv = game.parse_move(Role::Second, "1").unwrap();
        assert_eq!(mv.symbol, b'O');
    }

    #[test]
    fn long_form_can_pick_o_for_the_first_mover() {
        let mut game = Game::new();
        play(&mut game, Role::First, "5<-O");
        let mv = game.parse_move(Role::Second, "1").unwrap();
        assert_eq!(mv.symbol, b'X');
    }

    #[test]
    fn long_form_symbol_must_match_assignment() {
        let mut game = Game::new();
        play(&mut game, Role::First, "5");
        assert_eq!(
            game.parse_move(Role::First, "1<-O"),
            Err(GameError::WrongSymbol)
        );
        // Claiming the opponent's symbol is rejected as well.
        assert_eq!(
            game.parse_move(Role::Second, "1<-X"),
            Err(GameError::WrongSymbol)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        let mut game = Game::new();
        for s in ["", "0", "a", "12", "5<-Z", "5<_X", "5->X", "10<-X", "55555"] {
            assert!(game.parse_move(Role::First, s).is_err(), "accepted {s:?}");
        }
        assert_eq!(game.parse_move(Role::None, "5"), Err(GameError::BadRole));
    }

    #[test]
    fn apply_enforces_turn_order_and_occupancy() {
        let mut game = Game::new();
        let mv = game.parse_move(Role::Second, "5");
        // Parsing is allowed out of turn; applying is not.
        let mv = mv.unwrap();
        assert_eq!(game.apply(&mv), Err(GameError::WrongTurn));

        play(&mut game, Role::First, "5");
        let mv = game.parse_move(Role::Second, "5").unwrap();
        assert_eq!(game.apply(&mv), Err(GameError::CellOccupied));
    }

    #[test]
    fn row_win_locks_the_game() {
        let mut game = Game::new();
        play(&mut game, Role::First, "1");
        play(&mut game, Role::Second, "4");
        play(&mut game, Role::First, "2");
        play(&mut game, Role::Second, "5");
        play(&mut game, Role::First, "3");

        assert!(game.is_over());
        assert_eq!(game.winner(), Role::First);

        let mv = game.parse_move(Role::Second, "6").unwrap();
        assert_eq!(game.apply(&mv), Err(GameError::GameOver));
        assert_eq!(game.resign(Role::Second), Err(GameError::GameOver));
    }

    #[test]
    fn column_and_diagonal_wins_are_detected() {
        // Column 1-4-7 for Second.
        let mut game = Game::new();
        play(&mut game, Role::First, "2");
        play(&mut game, Role::Second, "1");
        play(&mut game, Role::First, "3");
        play(&mut game, Role::Second, "4");
        play(&mut game, Role::First, "5");
        play(&mut game, Role::Second, "7");
        assert_eq!(game.winner(), Role::Second);

        // Anti-diagonal 3-5-7 for First.
        let mut game = Game::new();
        play(&mut game, Role::First, "3");
        play(&mut game, Role::Second, "1");
        play(&mut game, Role::First, "5");
        play(&mut game, Role::Second, "2");
        play(&mut game, Role::First, "7");
        assert_eq!(game.winner(), Role::First);
    }

    #[test]
    fn full_board_without_a_line_is_a_draw() {
        let mut game = Game::new();
        // X O X / X O O / O X X
        for (role, cell) in [
            (Role::First, "1"),
            (Role::Second, "2"),
            (Role::First, "3"),
            (Role::Second, "5"),
            (Role::First, "4"),
            (Role::Second, "6"),
            (Role::First, "8"),
            (Role::Second, "7"),
            (Role::First, "9"),
        ] {
            play(&mut game, role, cell);
        }
        assert!(game.is_over());
        assert_eq!(game.winner(), Role::None);
    }

    #[test]
    fn resignation_awards_the_opponent() {
        let mut game = Game::new();
        play(&mut game, Role::First, "5");
        game.resign(Role::First).unwrap();
        assert!(game.is_over());
        assert_eq!(game.winner(), Role::Second);
    }

    #[test]
    fn unparsed_state_round_trips_cell_symbols() {
        let mut game = Game::new();
        play(&mut game, Role::First, "5");
        play(&mut game, Role::Second, "1");
        play(&mut game, Role::First, "9");

        let state = game.unparse_state();
        assert_eq!(state, "O| | \n |X| \n | |X\n");

        // Every rendered symbol maps back to the role that owns it.
        let rows: Vec<&str> = state.lines().collect();
        for (row, line) in rows.iter().enumerate() {
            for (col, sym) in line.split('|').enumerate() {
                let cell = row * 3 + col + 1;
                match sym {
                    "X" => assert!([5, 9].contains(&cell)),
                    "O" => assert_eq!(cell, 1),
                    " " => {}
                    other => panic!("unexpected cell {other:?}"),
                }
            }
        }
    }

    #[test]
    fn move_display_round_trips_through_parse() {
        let mut game = Game::new();
        let mv = game.parse_move(Role::First, "7").unwrap();
        assert_eq!(mv.to_string(), "7<-X");
        let reparsed = game.parse_move(Role::First, &mv.to_string()).unwrap();
        assert_eq!(reparsed, mv);
    }
}
