//! The physical placement of pieces

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoardSquare, Color, Piece, PieceKind};

/// Errors from reading a position out of FEN
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("FEN is missing the {0} field")]
    MissingField(&'static str),
    #[error("piece placement must have 8 ranks, found {0}")]
    WrongRankCount(usize),
    #[error("rank {0} of the piece placement doesn't cover exactly 8 files")]
    WrongFileCount(u8),
    #[error("unknown piece letter {0:?}")]
    UnknownPiece(char),
    #[error("invalid {field} field {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// An 8×8 grid of optional pieces
///
/// Indexed as `squares[rank][file]`, with rank 0 being white's back rank.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    /// A board with no pieces on it
    pub const EMPTY: Self = Self {
        squares: [[None; 8]; 8],
    };

    /// The order of the pieces on each back rank, from the a-file
    const BACK_RANK: [PieceKind; 8] = [
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Rook,
    ];

    /// The pieces as they stand at the start of a chess game
    pub const fn initial() -> Self {
        let mut board = Self::EMPTY;
        let mut file = 0;
        while file < 8 {
            let back = Self::BACK_RANK[file];
            board.squares[0][file] = Some(Piece::new(back, Color::White));
            board.squares[1][file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board.squares[6][file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board.squares[7][file] = Some(Piece::new(back, Color::Black));
            file += 1;
        }
        board
    }

    /// Find the piece, if any, at the given square
    ///
    /// Returns `None` if the given square is invalid.
    pub fn get(&self, square: BoardSquare) -> Option<Piece> {
        let (rank, file) = square.to_rank_file()?;
        self.squares[rank as usize][file as usize]
    }

    /// Whether a piece stands on the given square
    pub fn is_occupied(&self, square: BoardSquare) -> bool {
        self.get(square).is_some()
    }

    /// Put the given piece (or nothing) on a square, returning what was there before
    ///
    /// Writing to an invalid square does nothing.
    pub fn set(&mut self, square: BoardSquare, piece: Option<Piece>) -> Option<Piece> {
        let (rank, file) = square.to_rank_file()?;
        core::mem::replace(&mut self.squares[rank as usize][file as usize], piece)
    }

    /// Remove and return the piece at a square
    pub fn take(&mut self, square: BoardSquare) -> Option<Piece> {
        self.set(square, None)
    }

    /// Iterate over every occupied square and the piece on it
    pub fn pieces(&self) -> impl Iterator<Item = (BoardSquare, Piece)> + '_ {
        BoardSquare::all_squares().filter_map(|square| Some((square, self.get(square)?)))
    }

    /// The pieces of one color
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (BoardSquare, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }

    /// Count the pieces matching the predicate
    pub fn count(&self, predicate: impl Fn(Piece) -> bool) -> usize {
        self.pieces().filter(|&(_, piece)| predicate(piece)).count()
    }

    /// Where the king of the given color stands
    ///
    /// If there's more than one, this is the first found from a1.
    pub fn king_square(&self, color: Color) -> Option<BoardSquare> {
        let king = Piece::new(PieceKind::King, color);
        self.pieces()
            .find(|&(_, piece)| piece == king)
            .map(|(square, _)| square)
    }

    /// Parse the piece placement field of a FEN string
    pub fn from_fen_placement(placement: &str) -> Result<Self, FenError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::WrongRankCount(ranks.len()));
        }
        let mut board = Self::EMPTY;
        for (rank_idx, rank) in ranks.into_iter().enumerate() {
            let rank_idx = 7 - rank_idx as u8;
            let mut file = 0u8;
            for c in rank.chars() {
                if let Some(empty) = c.to_digit(10) {
                    file += empty as u8;
                    if file > 8 {
                        return Err(FenError::WrongFileCount(rank_idx + 1));
                    }
                    continue;
                }
                let piece = Piece::from_fen_letter(c).ok_or(FenError::UnknownPiece(c))?;
                if file >= 8 {
                    return Err(FenError::WrongFileCount(rank_idx + 1));
                }
                board.set(BoardSquare::from_rank_file(rank_idx, file), Some(piece));
                file += 1;
            }
            if file != 8 {
                return Err(FenError::WrongFileCount(rank_idx + 1));
            }
        }
        Ok(board)
    }

    /// Write the piece placement field of a FEN string
    pub fn to_fen_placement(&self) -> String {
        let mut placement = String::with_capacity(64);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[rank][file] {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.fen_letter());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }
        placement
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Board")
            .field(&self.to_fen_placement())
            .finish()
    }
}

/// Shows the board from white's side, with black pieces in lowercase
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let c = self.squares[rank][file].map_or('.', Piece::fen_letter);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        f.write_str("   a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

    #[test]
    fn test_opening_position_fen_parsing() {
        assert_eq!(
            Board::initial(),
            Board::from_fen_placement(INITIAL_PLACEMENT).unwrap()
        );
    }

    #[test]
    fn test_opening_position_to_fen() {
        assert_eq!(Board::initial().to_fen_placement(), INITIAL_PLACEMENT);
    }

    #[test]
    fn test_initial_counts() {
        let board = Board::initial();
        for color in Color::COLORS {
            assert_eq!(board.count(|p| p.color == color), 16);
            assert_eq!(
                board.count(|p| p == Piece::new(PieceKind::Pawn, color)),
                8
            );
        }
        assert_eq!(board.king_square(Color::White), Some(BoardSquare::E1));
        assert_eq!(board.king_square(Color::Black), Some(BoardSquare::E8));
        assert_eq!(
            board.get(BoardSquare::D8),
            Some(Piece::new(PieceKind::Queen, Color::Black))
        );
    }

    #[test]
    fn test_set_and_take() {
        let mut board = Board::EMPTY;
        let knight = Piece::new(PieceKind::Knight, Color::White);
        assert_eq!(board.set(BoardSquare::C3, Some(knight)), None);
        assert!(board.is_occupied(BoardSquare::C3));
        assert_eq!(board.take(BoardSquare::C3), Some(knight));
        assert!(!board.is_occupied(BoardSquare::C3));
        assert_eq!(board.set(BoardSquare::INVALID, Some(knight)), None);
        assert_eq!(board, Board::EMPTY);
    }

    #[test]
    fn test_placement_round_trip() {
        let placement = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R";
        let board = Board::from_fen_placement(placement).unwrap();
        assert_eq!(board.to_fen_placement(), placement);
    }

    #[test]
    fn test_bad_placements() {
        assert_eq!(
            Board::from_fen_placement("8/8/8"),
            Err(FenError::WrongRankCount(3))
        );
        assert_eq!(
            Board::from_fen_placement("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN"),
            Err(FenError::WrongFileCount(1))
        );
        assert_eq!(
            Board::from_fen_placement("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNRR"),
            Err(FenError::WrongFileCount(1))
        );
        assert_eq!(
            Board::from_fen_placement("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX"),
            Err(FenError::UnknownPiece('X'))
        );
    }

    #[test]
    fn test_board_serializes_as_ranks() {
        let json = serde_json::to_value(Board::initial()).unwrap();
        let ranks = json.as_array().unwrap();
        assert_eq!(ranks.len(), 8);
        assert_eq!(ranks[0][4]["kind"], "king");
        assert_eq!(ranks[0][4]["color"], "white");
        assert!(ranks[3][0].is_null());
        let back: Board = serde_json::from_value(json).unwrap();
        assert_eq!(back, Board::initial());
    }
}
