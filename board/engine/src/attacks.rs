//! Raw geometric reachability
//!
//! Nothing here asks whether the attacking side's own king would be left in check. Keeping that
//! question out is what lets the legality check call into these functions without recursing
//! through the kings looking at each other.

use board::{Board, BoardSquare, BoardSquareOffset, Color, Piece, PieceKind};

/// Whether `offset` is a shape `piece` can attack along, ignoring anything in the way
///
/// For pawns this is the diagonal capture, never the forward push.
pub(crate) fn fits_geometry(piece: Piece, offset: BoardSquareOffset) -> bool {
    match piece.kind {
        PieceKind::Pawn => {
            offset.rank() == piece.color.pawn_direction() && offset.file().unsigned_abs() == 1
        }
        PieceKind::Knight => BoardSquareOffset::KNIGHT_MOVES.contains(&offset),
        PieceKind::Bishop => offset.is_diagonal(),
        PieceKind::Rook => offset.is_straight(),
        PieceKind::Queen => offset.is_diagonal() || offset.is_straight(),
        PieceKind::King => BoardSquareOffset::KING_MOVES.contains(&offset),
    }
}

/// Whether every square strictly between `source` and `target` is empty
///
/// Only meaningful when the two squares share a rank, file or diagonal.
pub(crate) fn path_clear(board: &Board, source: BoardSquare, target: BoardSquare) -> bool {
    let step = source.offset_to(target).unit();
    let mut square = step.offset(source);
    while square.is_valid() && square != target {
        if board.is_occupied(square) {
            return false;
        }
        square = step.offset(square);
    }
    true
}

/// Whether `piece`, standing on `source`, attacks `target`
pub(crate) fn attacks(
    board: &Board,
    piece: Piece,
    source: BoardSquare,
    target: BoardSquare,
) -> bool {
    if source == target || !source.is_valid() || !target.is_valid() {
        return false;
    }
    fits_geometry(piece, source.offset_to(target))
        && (!piece.kind.is_slider() || path_clear(board, source, target))
}

/// Whether any piece of color `by` attacks `target`
pub fn is_attacked(board: &Board, target: BoardSquare, by: Color) -> bool {
    board
        .pieces_of(by)
        .any(|(source, piece)| attacks(board, piece, source, target))
}

/// Whether the king of `color` is attacked
///
/// A board without that king is never in check.
pub fn in_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_attacked(board, king, color.other()))
}
