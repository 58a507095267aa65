//! Legality oracle.
//! Bridges the board grid to shakmaty: set up the position from FEN and ask
//! whether a candidate (origin, destination) pair is in the legal-move set
//! for the side to move. Validation only; moves are never generated here.

use log::debug;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, File, Move as LibMove, Position, Rank, Square as LibSquare};

use crate::board::{Board, Move, Square};

fn lib_square(sq: Square) -> LibSquare {
    // Row 0 is rank 8 in the grid; shakmaty counts ranks from 1.
    LibSquare::from_coords(File::new(sq.col as u32), Rank::new(7 - sq.row as u32))
}

fn castle_king_target(king: LibSquare, rook: LibSquare) -> LibSquare {
    let file = if rook.file() > king.file() { File::G } else { File::C };
    LibSquare::from_coords(file, king.rank())
}

/// True if the candidate move is legal for the side to move. Digitized
/// boards can describe positions shakmaty refuses to set up (missing kings
/// and the like); every candidate is illegal on such a board.
pub fn is_legal(board: &Board, white_to_move: bool, mv: Move) -> bool {
    let fen = board.to_fen(white_to_move);
    let position: Chess = match Fen::from_ascii(fen.as_bytes()) {
        Ok(parsed) => match parsed.into_position(CastlingMode::Standard) {
            Ok(position) => position,
            Err(e) => {
                debug!("rules oracle cannot set up '{}': {}", fen, e);
                return false;
            }
        },
        Err(e) => {
            debug!("rules oracle cannot parse '{}': {}", fen, e);
            return false;
        }
    };

    let from = lib_square(mv.from);
    let to = lib_square(mv.to);
    position.legal_moves().iter().any(|legal| match legal {
        // Castling is matched on either encoding: king destination or
        // king-takes-rook.
        LibMove::Castle { king, rook } => {
            *king == from && (*rook == to || castle_king_target(*king, *rook) == to)
        }
        other => other.from() == Some(from) && other.to() == to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardState;

    fn mv(s: &str) -> Move {
        Move::from_coordinates(s).unwrap()
    }

    fn board_from(rows: [&str; 8]) -> Board {
        let grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.chars().map(String::from).collect())
            .collect();
        Board::from_grid(&grid).unwrap()
    }

    #[test]
    fn test_opening_pawn_pushes() {
        let board = Board::initial();
        assert!(is_legal(&board, true, mv("e2e4")));
        assert!(is_legal(&board, true, mv("e2e3")));
        assert!(!is_legal(&board, true, mv("e2e5")));
        assert!(!is_legal(&board, true, mv("e2d3")));
    }

    #[test]
    fn test_side_to_move_is_respected() {
        let board = Board::initial();
        assert!(!is_legal(&board, true, mv("e7e5")));
        assert!(is_legal(&board, false, mv("e7e5")));
    }

    #[test]
    fn test_knight_jump() {
        let board = Board::initial();
        assert!(is_legal(&board, true, mv("g1f3")));
        assert!(!is_legal(&board, true, mv("g1g3")));
    }

    #[test]
    fn test_legal_after_engine_relocation() {
        let (state, _) = BoardState::new().apply_engine_move("e2e4").unwrap();
        assert!(is_legal(state.board(), false, mv("e7e5")));
        assert!(!is_legal(state.board(), false, mv("e4e5")));
    }

    #[test]
    fn test_king_moves_without_castling_rights() {
        let board = board_from([
            "r...k..r",
            "pppppppp",
            "........",
            "........",
            "........",
            "........",
            "PPPPPPPP",
            "R...K..R",
        ]);
        // The generated FEN never carries castling rights, so only plain
        // king steps are in the legal set here.
        assert!(is_legal(&board, true, mv("e1f1")));
        assert!(is_legal(&board, true, mv("e1d1")));
        assert!(!is_legal(&board, true, mv("e1g1")));
    }

    #[test]
    fn test_unplayable_position_rejects_everything() {
        let board = Board::blank();
        assert!(!is_legal(&board, true, mv("e2e4")));
        assert!(!is_legal(&board, false, mv("e7e5")));
    }
}
