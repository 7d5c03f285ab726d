use board::{BoardSquare, Color, FenError, Piece, PieceKind};
use serde::{Deserialize, Serialize};

use crate::{attacks, DetailedMove, Game, IllegalMove};

bitflags::bitflags! {
    /// Which of the pieces involved in castling have ever moved
    ///
    /// Flags are only ever added. A king or rook that returns to its starting square still can't
    /// castle, and an empty corner doesn't by itself set anything: castling checks separately
    /// that the rook is really there.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CastlingRights: u8 {
        const WhiteKingMoved = 0b0000_0001;
        const WhiteQueensideRookMoved = 0b0000_0010;
        const WhiteKingsideRookMoved = 0b0000_0100;
        const BlackKingMoved = 0b0000_1000;
        const BlackQueensideRookMoved = 0b0001_0000;
        const BlackKingsideRookMoved = 0b0010_0000;
    }
}

/// Which rook the king castles with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub const SIDES: [CastleSide; 2] = [CastleSide::Kingside, CastleSide::Queenside];

    /// The side a king moving two files onto `target` is castling towards
    pub const fn from_king_target(target: BoardSquare) -> Option<Self> {
        match target.file() {
            6 => Some(Self::Kingside),
            2 => Some(Self::Queenside),
            _ => None,
        }
    }

    /// The notation recorded for a castle to this side
    pub const fn token(self) -> &'static str {
        match self {
            Self::Kingside => "O-O",
            Self::Queenside => "O-O-O",
        }
    }

    /// Where this side's rook starts
    pub const fn rook_source(self, color: Color) -> BoardSquare {
        match self {
            Self::Kingside => BoardSquare::from_rank_file(color.back_rank(), 7),
            Self::Queenside => BoardSquare::from_rank_file(color.back_rank(), 0),
        }
    }

    /// Where this side's rook lands after castling
    pub const fn rook_target(self, color: Color) -> BoardSquare {
        match self {
            Self::Kingside => BoardSquare::from_rank_file(color.back_rank(), 5),
            Self::Queenside => BoardSquare::from_rank_file(color.back_rank(), 3),
        }
    }

    /// The letter used for castling this way in FEN
    const fn fen_letter(self, color: Color) -> char {
        match (self, color) {
            (Self::Kingside, Color::White) => 'K',
            (Self::Queenside, Color::White) => 'Q',
            (Self::Kingside, Color::Black) => 'k',
            (Self::Queenside, Color::Black) => 'q',
        }
    }
}

/// The square every king starts on
pub(crate) const fn king_home(color: Color) -> BoardSquare {
    BoardSquare::from_rank_file(color.back_rank(), 4)
}

impl CastlingRights {
    /// The flag for the king of `color` having moved
    pub const fn king_moved(color: Color) -> Self {
        match color {
            Color::White => Self::WhiteKingMoved,
            Color::Black => Self::BlackKingMoved,
        }
    }

    /// The flag for the rook of `color` on `side` having moved
    pub const fn rook_moved(color: Color, side: CastleSide) -> Self {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => Self::WhiteKingsideRookMoved,
            (Color::White, CastleSide::Queenside) => Self::WhiteQueensideRookMoved,
            (Color::Black, CastleSide::Kingside) => Self::BlackKingsideRookMoved,
            (Color::Black, CastleSide::Queenside) => Self::BlackQueensideRookMoved,
        }
    }

    /// Whether neither the king nor the rook needed for this castle has moved
    ///
    /// This says nothing about whether the castle is legal right now.
    pub const fn allows(self, color: Color, side: CastleSide) -> bool {
        !self.intersects(Self::king_moved(color).union(Self::rook_moved(color, side)))
    }

    /// The flags after the given move has been made
    pub(crate) fn after_move(self, mv: &DetailedMove) -> Self {
        let mut moved = self;
        let color = mv.piece.color;
        match mv.piece.kind {
            PieceKind::King => {
                moved |= Self::king_moved(color);
                if let Some(side) = mv.castle {
                    moved |= Self::rook_moved(color, side);
                }
            }
            PieceKind::Rook => {
                for side in CastleSide::SIDES {
                    if mv.source == side.rook_source(color) {
                        moved |= Self::rook_moved(color, side);
                    }
                }
            }
            _ => {}
        }
        // A corner rook captured at home is gone for good, even if another rook walks in later
        if let Some(captured) = mv.captured {
            let opponent = color.other();
            for side in CastleSide::SIDES {
                if captured == side.rook_source(opponent) {
                    moved |= Self::rook_moved(opponent, side);
                }
            }
        }
        moved
    }

    /// Parse the castling field of a FEN string
    ///
    /// A missing letter marks its rook as moved, and a color with neither letter has its king
    /// marked as moved too.
    pub fn from_fen(field: &str) -> Result<Self, FenError> {
        let valid =
            field == "-" || (!field.is_empty() && field.chars().all(|c| "KQkq".contains(c)));
        if !valid {
            return Err(FenError::InvalidField {
                field: "castling",
                value: field.to_owned(),
            });
        }
        let mut moved = Self::empty();
        for color in Color::COLORS {
            let mut any_side = false;
            for side in CastleSide::SIDES {
                if field.contains(side.fen_letter(color)) {
                    any_side = true;
                } else {
                    moved |= Self::rook_moved(color, side);
                }
            }
            if !any_side {
                moved |= Self::king_moved(color);
            }
        }
        Ok(moved)
    }

    /// Write the castling field of a FEN string
    pub fn to_fen(self) -> String {
        let mut options = String::with_capacity(4);
        for color in Color::COLORS {
            for side in CastleSide::SIDES {
                if self.allows(color, side) {
                    options.push(side.fen_letter(color));
                }
            }
        }
        if options.is_empty() {
            options.push('-');
        }
        options
    }
}

impl Default for CastlingRights {
    /// Nothing has moved yet
    fn default() -> Self {
        Self::empty()
    }
}

impl Game {
    /// Check whether the king can castle from `source` onto `target` right now
    ///
    /// The king must already be known to be moving two files along its rank.
    pub(crate) fn detail_castle(
        &self,
        king: Piece,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<DetailedMove, IllegalMove> {
        let color = king.color;
        if source != king_home(color) {
            return Err(IllegalMove::MoveNeverLegal);
        }
        let side = CastleSide::from_king_target(target).ok_or(IllegalMove::MoveNeverLegal)?;
        if self.castling.contains(CastlingRights::king_moved(color)) {
            return Err(IllegalMove::CastleKingMoved);
        }
        if self.castling.contains(CastlingRights::rook_moved(color, side)) {
            return Err(IllegalMove::CastleRookMoved);
        }
        let rook_square = side.rook_source(color);
        if self.board.get(rook_square) != Some(Piece::new(PieceKind::Rook, color)) {
            return Err(IllegalMove::CastleRookMissing);
        }
        if !attacks::path_clear(&self.board, source, rook_square) {
            return Err(IllegalMove::CastleBlocked);
        }
        let opponent = color.other();
        if attacks::is_attacked(&self.board, source, opponent) {
            return Err(IllegalMove::CastleInCheck);
        }
        let step = source.offset_to(target).unit();
        let mut square = source;
        while square != target {
            square = step.offset(square);
            if attacks::is_attacked(&self.board, square, opponent) {
                return Err(IllegalMove::CastleThroughCheck);
            }
        }
        Ok(DetailedMove {
            castle: Some(side),
            ..DetailedMove::quiet(king, source, target)
        })
    }
}
