//! The move log written as the game is played
//!
//! Entries look like `♘g1-f3` or `e4xd5`: the piece's glyph (left off for pawns), the source
//! square, `x` for a capture or `-` otherwise, then the target square. Castling is written
//! `O-O` or `O-O-O`. There is no disambiguation and no check or mate suffix.

use core::fmt;

use board::PieceKind;

use crate::DetailedMove;

impl fmt::Display for DetailedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(side) = self.castle {
            return f.write_str(side.token());
        }
        if self.piece.kind != PieceKind::Pawn {
            write!(f, "{}", self.piece.glyph())?;
        }
        let separator = if self.is_capture() { 'x' } else { '-' };
        write!(f, "{}{}{}", self.source, separator, self.target)
    }
}
