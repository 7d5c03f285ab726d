use board::{Board, BoardSquare, Piece, PieceKind};

use crate::CastleSide;

/// All the details of a move figured out
///
/// A `DetailedMove` is only ever built by the legality check, so holding one means its
/// classification (capture, castle, en passant) matches the position it was checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetailedMove {
    pub piece: Piece,
    pub source: BoardSquare,
    pub target: BoardSquare,
    /// Where the captured piece stood
    ///
    /// This is the target square, except for en passant where it's the square next to the
    /// capturing pawn.
    pub captured: Option<BoardSquare>,
    pub castle: Option<CastleSide>,
    pub is_en_passant: bool,
}

impl DetailedMove {
    /// A move that captures nothing and has no side effects
    pub(crate) const fn quiet(piece: Piece, source: BoardSquare, target: BoardSquare) -> Self {
        Self {
            piece,
            source,
            target,
            captured: None,
            castle: None,
            is_en_passant: false,
        }
    }

    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// Whether this is a pawn reaching the far edge of the board
    pub const fn is_promotion(&self) -> bool {
        matches!(self.piece.kind, PieceKind::Pawn)
            && self.target.rank() == self.piece.color.promotion_rank()
    }

    /// Returns the square against which the opponent may respond with an en passant.
    ///
    /// This is the square passed over by a pawn advancing two squares, and `None` for every
    /// other move.
    pub(crate) fn en_passant_response(&self) -> Option<BoardSquare> {
        if self.piece.kind != PieceKind::Pawn {
            return None;
        }
        let rank_delta = self.source.offset_to(self.target).rank();
        (rank_delta.abs() == 2).then(|| self.source.offset(rank_delta / 2, 0))
    }

    /// Carry the move out on `board`
    ///
    /// A promoting pawn becomes `promotion` if given, and otherwise stays a pawn on the far rank
    /// until the promotion is settled.
    pub(crate) fn play_on(&self, board: &mut Board, promotion: Option<PieceKind>) {
        if let Some(captured) = self.captured {
            board.take(captured);
        }
        board.take(self.source);
        let kind = match promotion {
            Some(kind) if self.is_promotion() => kind,
            _ => self.piece.kind,
        };
        board.set(self.target, Some(Piece::new(kind, self.piece.color)));
        if let Some(side) = self.castle {
            let color = self.piece.color;
            let rook = board.take(side.rook_source(color));
            board.set(side.rook_target(color), rook);
        }
    }
}
