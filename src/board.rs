//! Board state manager.
//! Owns the 8x8 grid of piece symbols and the three update paths: local
//! moves, digitized boards from the recognition service, and engine replies.
//! Keeps the last digitized board around for change detection.
//! Update operations never mutate in place; they return a fresh state plus
//! an event describing what happened.

use std::fmt;

use anyhow::{Context, Result, bail};
use log::{debug, warn};

pub const BOARD_SIZE: usize = 8;

/// Empty-square sentinel used across the wire formats and the grid.
pub const EMPTY: char = '.';

/// The 12 recognized piece symbols (uppercase White, lowercase Black).
const PIECE_SYMBOLS: &str = "KQRBNPkqrbnp";

const INITIAL_POSITION: [[char; BOARD_SIZE]; BOARD_SIZE] = [
    ['r', 'n', 'b', 'q', 'k', 'b', 'n', 'r'],
    ['p'; BOARD_SIZE],
    [EMPTY; BOARD_SIZE],
    [EMPTY; BOARD_SIZE],
    [EMPTY; BOARD_SIZE],
    [EMPTY; BOARD_SIZE],
    ['P'; BOARD_SIZE],
    ['R', 'N', 'B', 'Q', 'K', 'B', 'N', 'R'],
];

fn is_piece_symbol(c: char) -> bool {
    PIECE_SYMBOLS.contains(c)
}

/// A (row, column) reference into the grid. Row 0 is rank 8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    /// Parses algebraic notation ("e2") into grid coordinates.
    pub fn from_algebraic(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let (file, rank) = match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => (f, r),
            _ => bail!("'{}' is not a square name", s),
        };
        let col = match file {
            'a'..='h' => file as usize - 'a' as usize,
            _ => bail!("'{}' has no file letter a-h", s),
        };
        let rank = rank
            .to_digit(10)
            .filter(|r| (1..=8).contains(r))
            .with_context(|| format!("'{}' has no rank digit 1-8", s))?;
        Ok(Square { row: BOARD_SIZE - rank as usize, col })
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col as u8) as char, BOARD_SIZE - self.row)
    }
}

/// An origin/destination pair in coordinate notation, with the optional
/// promotion hint carried through but never applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<char>,
}

impl Move {
    /// Parses 4-character coordinate notation ("e2e4"), tolerating a
    /// trailing promotion letter ("e7e8q"). Anything past that is ignored.
    pub fn from_coordinates(s: &str) -> Result<Self> {
        let from = Square::from_algebraic(s.get(0..2).unwrap_or_default())
            .with_context(|| format!("bad origin in move '{}'", s))?;
        let to = Square::from_algebraic(s.get(2..4).unwrap_or_default())
            .with_context(|| format!("bad destination in move '{}'", s))?;
        let promotion = s
            .get(4..)
            .and_then(|rest| rest.chars().next())
            .filter(|c| "qrbnQRBN".contains(*c));
        Ok(Move { from, to, promotion })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

/// An 8x8 grid of piece symbols. Every cell is either `EMPTY` or one of the
/// 12 known symbols; `from_grid` enforces that on ingest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[char; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Standard initial position.
    pub fn initial() -> Self {
        Board { cells: INITIAL_POSITION }
    }

    pub fn blank() -> Self {
        Board { cells: [[EMPTY; BOARD_SIZE]; BOARD_SIZE] }
    }

    /// Builds a board from the raw grid a recognition response carries.
    /// A non-8x8 shape is a hard error. An unknown symbol is only logged:
    /// the cell is stored as empty and the rest of the grid still loads.
    pub fn from_grid(grid: &[Vec<String>]) -> Result<Self> {
        if grid.len() != BOARD_SIZE || grid.iter().any(|row| row.len() != BOARD_SIZE) {
            bail!("unrecognized board format: expected an 8x8 grid");
        }
        let mut cells = [[EMPTY; BOARD_SIZE]; BOARD_SIZE];
        for (row, cols) in grid.iter().enumerate() {
            for (col, cell) in cols.iter().enumerate() {
                let symbol = cell.chars().next().unwrap_or(EMPTY);
                cells[row][col] = if symbol == EMPTY || is_piece_symbol(symbol) {
                    symbol
                } else {
                    warn!(
                        "unknown piece symbol '{}' at {}; leaving the square empty",
                        cell,
                        Square { row, col }
                    );
                    EMPTY
                };
            }
        }
        Ok(Board { cells })
    }

    pub fn get(&self, sq: Square) -> char {
        self.cells[sq.row][sq.col]
    }

    /// Position part plus side to move; castling and en passant are not
    /// tracked, which matches what the rules oracle is asked to judge.
    pub fn to_fen(&self, white_to_move: bool) -> String {
        let placement: Vec<String> = self
            .cells
            .iter()
            .map(|row| {
                let mut out = String::new();
                let mut empties = 0;
                for &cell in row {
                    if cell == EMPTY {
                        empties += 1;
                    } else {
                        if empties > 0 {
                            out.push_str(&empties.to_string());
                            empties = 0;
                        }
                        out.push(cell);
                    }
                }
                if empties > 0 {
                    out.push_str(&empties.to_string());
                }
                out
            })
            .collect();
        format!(
            "{} {} - - 0 1",
            placement.join("/"),
            if white_to_move { 'w' } else { 'b' }
        )
    }

    /// Rows as space-joined cell strings, the engine service's input form.
    pub fn wire_rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" "))
            .collect()
    }

    /// Row-major copy of the grid for JSON payloads.
    pub fn grid(&self) -> Vec<Vec<char>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }

    /// Cell-by-cell differences as (square, old, new).
    pub fn diff(&self, newer: &Board) -> Vec<(Square, char, char)> {
        let mut changes = Vec::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if self.cells[row][col] != newer.cells[row][col] {
                    changes.push((Square { row, col }, self.cells[row][col], newer.cells[row][col]));
                }
            }
        }
        changes
    }

    fn relocated(&self, mv: Move) -> Board {
        let mut cells = self.cells;
        cells[mv.to.row][mv.to.col] = cells[mv.from.row][mv.from.col];
        cells[mv.from.row][mv.from.col] = EMPTY;
        Board { cells }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            write!(f, "{} ", BOARD_SIZE - i)?;
            for cell in row {
                write!(f, " {}", cell)?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

/// What an update did, for the caller to surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    /// The digitized board differs from the previous snapshot (or there
    /// was no snapshot yet).
    MoveDetected,
    /// The digitized board matches the previous snapshot exactly.
    NoChange,
}

/// The owned state: the live board plus the last digitized snapshot.
#[derive(Clone, Debug)]
pub struct BoardState {
    board: Board,
    last_digitized: Option<Board>,
}

impl BoardState {
    pub fn new() -> Self {
        BoardState { board: Board::initial(), last_digitized: None }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Relocates a piece the user entered. The origin must hold a piece;
    /// legality against the side to move is the caller's job (it goes
    /// through the rules oracle before this is called).
    pub fn apply_local_move(&self, mv: Move) -> Result<BoardState> {
        if self.board.get(mv.from) == EMPTY {
            bail!("illegal move: {} is empty", mv.from);
        }
        Ok(BoardState {
            board: self.board.relocated(mv),
            last_digitized: self.last_digitized.clone(),
        })
    }

    /// Replaces the whole board with a digitized one. The comparison runs
    /// against the previous *snapshot*, not the live board, and the new
    /// board becomes the snapshot whatever the outcome.
    pub fn apply_digitized(&self, board: Board) -> (BoardState, BoardEvent) {
        let event = match &self.last_digitized {
            None => BoardEvent::MoveDetected,
            Some(prev) => {
                let changes = prev.diff(&board);
                if changes.is_empty() {
                    BoardEvent::NoChange
                } else {
                    for (sq, old, new) in &changes {
                        debug!("board changed at {}: '{}' -> '{}'", sq, old, new);
                    }
                    BoardEvent::MoveDetected
                }
            }
        };
        let state = BoardState { board: board.clone(), last_digitized: Some(board) };
        (state, event)
    }

    /// Applies an engine reply. The engine is trusted, so there is no
    /// legality or empty-origin check. Notation shorter than four
    /// characters applies nothing and is not an error.
    pub fn apply_engine_move(&self, notation: &str) -> Result<(BoardState, Option<Move>)> {
        if notation.chars().count() < 4 {
            debug!("engine notation '{}' too short, nothing applied", notation);
            return Ok((self.clone(), None));
        }
        let mv = Move::from_coordinates(notation)?;
        let state = BoardState {
            board: self.board.relocated(mv),
            last_digitized: self.last_digitized.clone(),
        };
        Ok((state, Some(mv)))
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: [&str; 8]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.chars().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_square_round_trip_all_64() {
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let sq = Square { row, col };
                let back = Square::from_algebraic(&sq.to_string()).unwrap();
                assert_eq!(back, sq);
            }
        }
    }

    #[test]
    fn test_square_known_corners() {
        assert_eq!(Square::from_algebraic("a8").unwrap(), Square { row: 0, col: 0 });
        assert_eq!(Square::from_algebraic("h1").unwrap(), Square { row: 7, col: 7 });
        assert_eq!(Square { row: 6, col: 4 }.to_string(), "e2");
    }

    #[test]
    fn test_square_rejects_garbage() {
        assert!(Square::from_algebraic("i1").is_err());
        assert!(Square::from_algebraic("a9").is_err());
        assert!(Square::from_algebraic("a").is_err());
        assert!(Square::from_algebraic("a10").is_err());
    }

    #[test]
    fn test_move_parses_promotion_hint() {
        let mv = Move::from_coordinates("e7e8q").unwrap();
        assert_eq!(mv.promotion, Some('q'));
        assert_eq!(mv.to_string(), "e7e8q");
        assert_eq!(Move::from_coordinates("e2e4").unwrap().promotion, None);
    }

    #[test]
    fn test_digitized_replacement_is_exact() {
        let grid = grid_from([
            "r.bqkbnr", "pppppppp", "..n.....", "........",
            "....P...", "........", "PPPP.PPP", "RNBQKBNR",
        ]);
        let board = Board::from_grid(&grid).unwrap();
        let (state, _) = BoardState::new().apply_digitized(board.clone());
        assert_eq!(*state.board(), board);
        assert_eq!(state.board().get(Square { row: 4, col: 4 }), 'P');
        assert_eq!(state.board().get(Square { row: 2, col: 2 }), 'n');
    }

    #[test]
    fn test_first_digitization_always_signals() {
        let (_, event) = BoardState::new().apply_digitized(Board::initial());
        assert_eq!(event, BoardEvent::MoveDetected);
    }

    #[test]
    fn test_identical_digitization_signals_once() {
        let (state, first) = BoardState::new().apply_digitized(Board::initial());
        let (_, second) = state.apply_digitized(Board::initial());
        assert_eq!(first, BoardEvent::MoveDetected);
        assert_eq!(second, BoardEvent::NoChange);
    }

    #[test]
    fn test_change_detection_uses_snapshot_not_live_board() {
        // A local move changes the live board but not the snapshot, so an
        // identical re-digitization must stay quiet.
        let (state, _) = BoardState::new().apply_digitized(Board::initial());
        let moved = state
            .apply_local_move(Move::from_coordinates("e2e4").unwrap())
            .unwrap();
        let (_, event) = moved.apply_digitized(Board::initial());
        assert_eq!(event, BoardEvent::NoChange);
    }

    #[test]
    fn test_local_move_from_empty_origin_is_refused() {
        let state = BoardState::new();
        let before = state.board().clone();
        let err = state
            .apply_local_move(Move::from_coordinates("e4e5").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("illegal move"));
        assert_eq!(*state.board(), before);
    }

    #[test]
    fn test_engine_move_e2e4_on_initial_board() {
        let (state, mv) = BoardState::new().apply_engine_move("e2e4").unwrap();
        assert_eq!(mv.unwrap().to_string(), "e2e4");
        assert_eq!(state.board().get(Square { row: 6, col: 4 }), EMPTY);
        assert_eq!(state.board().get(Square { row: 4, col: 4 }), 'P');
    }

    #[test]
    fn test_engine_move_short_notation_is_a_noop() {
        let state = BoardState::new();
        let (after, mv) = state.apply_engine_move("e2").unwrap();
        assert!(mv.is_none());
        assert_eq!(*after.board(), *state.board());
        let (after, mv) = state.apply_engine_move("").unwrap();
        assert!(mv.is_none());
        assert_eq!(*after.board(), *state.board());
    }

    #[test]
    fn test_engine_move_bad_squares_is_an_error() {
        assert!(BoardState::new().apply_engine_move("zzzz").is_err());
    }

    #[test]
    fn test_from_grid_rejects_bad_shape() {
        let mut grid = grid_from([
            "rnbqkbnr", "pppppppp", "........", "........",
            "........", "........", "PPPPPPPP", "RNBQKBNR",
        ]);
        grid.pop();
        let err = Board::from_grid(&grid).unwrap_err();
        assert!(err.to_string().contains("unrecognized board format"));

        let mut grid = grid_from([
            "rnbqkbnr", "pppppppp", "........", "........",
            "........", "........", "PPPPPPPP", "RNBQKBNR",
        ]);
        grid[3].push(".".to_string());
        assert!(Board::from_grid(&grid).is_err());
    }

    #[test]
    fn test_from_grid_treats_unknown_symbols_as_empty() {
        let mut grid = grid_from([
            "rnbqkbnr", "pppppppp", "........", "........",
            "........", "........", "PPPPPPPP", "RNBQKBNR",
        ]);
        grid[3][3] = "X".to_string();
        let board = Board::from_grid(&grid).unwrap();
        assert_eq!(board.get(Square { row: 3, col: 3 }), EMPTY);
        // The rest of the grid still loads.
        assert_eq!(board.get(Square { row: 0, col: 0 }), 'r');
    }

    #[test]
    fn test_initial_fen() {
        assert_eq!(
            Board::initial().to_fen(true),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1"
        );
        assert!(Board::initial().to_fen(false).contains(" b - - 0 1"));
    }

    #[test]
    fn test_wire_rows_are_space_joined() {
        let rows = Board::initial().wire_rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], "r n b q k b n r");
        assert_eq!(rows[4], ". . . . . . . .");
    }

    #[test]
    fn test_diff_reports_old_and_new() {
        let before = Board::initial();
        let (after, _) = BoardState::new().apply_engine_move("e2e4").unwrap();
        let changes = before.diff(after.board());
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&(Square { row: 6, col: 4 }, 'P', EMPTY)));
        assert!(changes.contains(&(Square { row: 4, col: 4 }, EMPTY, 'P')));
    }
}
