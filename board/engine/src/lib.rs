//! The authoritative state of a two-player chess game and the rules that move it along

use board::{Board, BoardSquare, Color, FenError, GameStatus, Piece, PieceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod attacks;
mod castling;
mod detailed_move;
mod notation;
mod snapshot;

pub use crate::castling::{CastleSide, CastlingRights};
pub use crate::detailed_move::DetailedMove;
pub use crate::snapshot::{GameState, SnapshotError};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Why a move was refused
///
/// A refused move never changes the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    #[error("the game is already over")]
    GameOver,
    #[error("a pawn is waiting to be promoted")]
    PromotionPending,
    #[error("square is off the board")]
    InvalidSquare,
    #[error("no piece at move source")]
    NoPieceAtSource,
    #[error("piece at move source belongs to the side not on move")]
    NotYourTurn,
    #[error("moving side already occupies the target square")]
    OwnPieceAtTarget,
    #[error("given move never legal for this piece")]
    MoveNeverLegal,
    #[error("given move is blocked by another piece")]
    MoveBlocked,
    #[error("not attempted to capture, but a piece is there")]
    NonCaptureTargetTaken,
    #[error("attempted to capture, but no piece there to be captured")]
    CaptureTargetMissing,
    #[error("attempted en passant not allowed in current board state")]
    IllegalEnPassant,
    #[error("attempted castle after the king has moved")]
    CastleKingMoved,
    #[error("attempted castle with a rook that has moved")]
    CastleRookMoved,
    #[error("castling rook is not on its starting square")]
    CastleRookMissing,
    #[error("pieces stand between the king and the castling rook")]
    CastleBlocked,
    #[error("cannot castle out of check")]
    CastleInCheck,
    #[error("king would cross or land on an attacked square")]
    CastleThroughCheck,
    #[error("attempted move puts moving side's king in check")]
    MovingIntoCheck,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),
    #[error("no promotion pending at {0}")]
    NoPendingPromotion(BoardSquare),
    #[error("pawns cannot promote into a {0}")]
    InvalidPromotion(PieceKind),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenError),
}

/// A pawn that has reached the far rank and is waiting for its new kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPromotion {
    pub square: BoardSquare,
    pub color: Color,
}

/// What came of asking for a move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move wasn't legal and nothing changed
    Rejected,
    Applied,
    /// The move was made, but the pawn must be promoted with [`Game::promote`] before the game
    /// can go on
    AppliedPendingPromotion(PendingPromotion),
}

impl MoveOutcome {
    pub const fn is_applied(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// One game of chess
///
/// Each game owns all of its state; separate games never share anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    /// Which castling pieces have moved
    ///
    /// These castles aren't necessarily legal right now, as they may be blocked by intervening
    /// pieces and/or checks.
    castling: CastlingRights,
    /// The square a pawn just passed over by advancing two squares, for one reply only
    en_passant: Option<BoardSquare>,
    status: GameStatus,
    /// One entry per half-move
    history: Vec<String>,
    /// The fullmove number the history starts from
    first_move_number: u32,
    pending_promotion: Option<PendingPromotion>,
}

impl Game {
    /// A game at the standard starting position
    pub fn new() -> Self {
        Self {
            board: Board::initial(),
            turn: Color::White,
            castling: CastlingRights::empty(),
            en_passant: None,
            status: GameStatus::InProgress,
            history: Vec::new(),
            first_move_number: 1,
            pending_promotion: None,
        }
    }

    /// Set up a position from FEN
    ///
    /// The halfmove clock is accepted but not kept, and both counters may be left off. The game
    /// starts with an empty history, and is already over if the side to move has no legal move.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let mut fields = fen.split_whitespace();
        let mut next_field = |name| fields.next().ok_or(FenError::MissingField(name));
        let board = Board::from_fen_placement(next_field("piece placement")?)?;
        let turn = match next_field("side to move")? {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidField {
                    field: "side to move",
                    value: other.to_owned(),
                }
                .into())
            }
        };
        let castling = CastlingRights::from_fen(next_field("castling")?)?;
        let en_passant = match next_field("en passant")? {
            "-" => None,
            square => Some(square.parse::<BoardSquare>().map_err(|_| FenError::InvalidField {
                field: "en passant",
                value: square.to_owned(),
            })?),
        };
        let first_move_number = match fields.nth(1) {
            None => 1,
            Some(number) => number
                .parse::<u32>()
                .ok()
                .filter(|&number| number > 0)
                .ok_or_else(|| FenError::InvalidField {
                    field: "fullmove number",
                    value: number.to_owned(),
                })?,
        };
        let mut game = Self {
            board,
            turn,
            castling,
            en_passant,
            status: GameStatus::InProgress,
            history: Vec::new(),
            first_move_number,
            pending_promotion: None,
        };
        game.status = game.evaluate_status();
        game.snapshot().validate()?;
        Ok(game)
    }

    /// Write the position as FEN
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} 0 {}",
            self.board.to_fen_placement(),
            match self.turn {
                Color::White => 'w',
                Color::Black => 'b',
            },
            self.castling.to_fen(),
            self.en_passant.map_or("-", BoardSquare::as_str),
            self.fullmove_number(),
        )
    }

    /// The FEN fullmove number: starts at 1 and goes up after each of black's moves
    pub fn fullmove_number(&self) -> u32 {
        let plies = self.history.len() as u32;
        let started_with_black = (self.turn == Color::Black) != (plies % 2 == 1);
        self.first_move_number + (plies + u32::from(started_with_black)) / 2
    }

    /// Go back to the starting position, forgetting everything that happened
    pub fn reset(&mut self) {
        *self = Self::new();
        info!("game reset");
    }

    pub fn piece_at(&self, square: BoardSquare) -> Option<Piece> {
        self.board.get(square)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The side to move
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The notation of every half-move so far
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn en_passant_target(&self) -> Option<BoardSquare> {
        self.en_passant
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub fn pending_promotion(&self) -> Option<PendingPromotion> {
        self.pending_promotion
    }

    /// Whether any piece of color `by` attacks the square
    pub fn is_attacked(&self, square: BoardSquare, by: Color) -> bool {
        attacks::is_attacked(&self.board, square, by)
    }

    /// Whether the side to move is in check
    pub fn is_in_check(&self) -> bool {
        attacks::in_check(&self.board, self.turn)
    }

    /// Work out what moving the piece on `source` to `target` would do, ignoring whether it
    /// leaves the mover in check
    fn detail_move(
        &self,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<DetailedMove, IllegalMove> {
        if !source.is_valid() || !target.is_valid() {
            return Err(IllegalMove::InvalidSquare);
        }
        let piece = self.board.get(source).ok_or(IllegalMove::NoPieceAtSource)?;
        if piece.color != self.turn {
            return Err(IllegalMove::NotYourTurn);
        }
        let occupant = self.board.get(target);
        if occupant.is_some_and(|occupant| occupant.color == piece.color) {
            return Err(IllegalMove::OwnPieceAtTarget);
        }
        let offset = source.offset_to(target);
        match piece.kind {
            PieceKind::Pawn => self.detail_pawn_move(piece, source, target),
            PieceKind::King if offset.rank() == 0 && offset.file().abs() == 2 => {
                self.detail_castle(piece, source, target)
            }
            _ => {
                if !attacks::fits_geometry(piece, offset) {
                    return Err(IllegalMove::MoveNeverLegal);
                }
                if piece.kind.is_slider() && !attacks::path_clear(&self.board, source, target) {
                    return Err(IllegalMove::MoveBlocked);
                }
                Ok(DetailedMove {
                    captured: occupant.map(|_| target),
                    ..DetailedMove::quiet(piece, source, target)
                })
            }
        }
    }

    fn detail_pawn_move(
        &self,
        pawn: Piece,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<DetailedMove, IllegalMove> {
        let offset = source.offset_to(target);
        let forward = pawn.color.pawn_direction();
        let occupied = self.board.is_occupied(target);
        let mut mv = DetailedMove::quiet(pawn, source, target);
        if offset.file() == 0 && offset.rank() == forward {
            if occupied {
                return Err(IllegalMove::NonCaptureTargetTaken);
            }
        } else if offset.file() == 0 && offset.rank() == 2 * forward {
            if source.rank() != pawn.color.pawn_rank() {
                return Err(IllegalMove::MoveNeverLegal);
            }
            if self.board.is_occupied(source.offset(forward, 0)) {
                return Err(IllegalMove::MoveBlocked);
            }
            if occupied {
                return Err(IllegalMove::NonCaptureTargetTaken);
            }
        } else if attacks::fits_geometry(pawn, offset) {
            if occupied {
                mv.captured = Some(target);
            } else if self.en_passant == Some(target) {
                let passed = BoardSquare::from_rank_file(source.rank(), target.file());
                if self.board.get(passed) != Some(Piece::new(PieceKind::Pawn, pawn.color.other()))
                {
                    return Err(IllegalMove::IllegalEnPassant);
                }
                mv.captured = Some(passed);
                mv.is_en_passant = true;
            } else {
                return Err(IllegalMove::CaptureTargetMissing);
            }
        } else {
            return Err(IllegalMove::MoveNeverLegal);
        }
        Ok(mv)
    }

    /// Check a move against the position alone, including that it doesn't leave the mover's
    /// king in check
    fn check_position_move(
        &self,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<DetailedMove, IllegalMove> {
        let mv = self.detail_move(source, target)?;
        let mut scratch = self.board;
        mv.play_on(&mut scratch, None);
        if attacks::in_check(&scratch, mv.piece.color) {
            return Err(IllegalMove::MovingIntoCheck);
        }
        Ok(mv)
    }

    /// Check if this move is legal to do right now.
    ///
    /// Returns the details of the move if it is legal, otherwise `Err(..)` containing the reason
    /// why the move is illegal.
    pub fn check_move_legality(
        &self,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<DetailedMove, IllegalMove> {
        if self.status.is_over() {
            return Err(IllegalMove::GameOver);
        }
        if self.pending_promotion.is_some() {
            return Err(IllegalMove::PromotionPending);
        }
        self.check_position_move(source, target)
    }

    pub fn is_legal(&self, source: BoardSquare, target: BoardSquare) -> bool {
        self.check_move_legality(source, target).is_ok()
    }

    /// Every square the piece on `square` can legally move to
    ///
    /// Empty for an empty square, for a piece of the side not on move, and once the game is over.
    pub fn legal_moves(&self, square: BoardSquare) -> Vec<BoardSquare> {
        BoardSquare::all_squares()
            .filter(|&target| self.is_legal(square, target))
            .collect()
    }

    /// Every legal move for the side to move, as `(source, target)` pairs
    pub fn all_legal_moves(&self) -> Vec<(BoardSquare, BoardSquare)> {
        self.board
            .pieces_of(self.turn)
            .flat_map(|(source, _)| {
                self.legal_moves(source)
                    .into_iter()
                    .map(move |target| (source, target))
            })
            .collect()
    }

    fn has_any_legal_move(&self) -> bool {
        self.board.pieces_of(self.turn).any(|(source, _)| {
            BoardSquare::all_squares()
                .any(|target| self.check_position_move(source, target).is_ok())
        })
    }

    /// Whether the side now to move is checkmated, stalemated, or can play on
    pub(crate) fn evaluate_status(&self) -> GameStatus {
        if self.has_any_legal_move() {
            GameStatus::InProgress
        } else if self.is_in_check() {
            GameStatus::Checkmate {
                winner: self.turn.other(),
            }
        } else {
            GameStatus::Stalemate
        }
    }

    fn update_status(&mut self) {
        self.status = self.evaluate_status();
        if self.status.is_over() {
            info!(status = %self.status, "game over");
        }
    }

    /// Make an already-checked move
    fn apply(&mut self, mv: DetailedMove, promotion: Option<PieceKind>) -> MoveOutcome {
        let notation = mv.to_string();
        mv.play_on(&mut self.board, promotion);
        self.castling = self.castling.after_move(&mv);
        self.en_passant = mv.en_passant_response();
        self.turn = self.turn.other();
        debug!(%notation, "move applied");
        self.history.push(notation);
        if mv.is_promotion() && promotion.is_none() {
            let pending = PendingPromotion {
                square: mv.target,
                color: mv.piece.color,
            };
            self.pending_promotion = Some(pending);
            return MoveOutcome::AppliedPendingPromotion(pending);
        }
        self.update_status();
        MoveOutcome::Applied
    }

    /// Make the move if it is legal, reporting why not otherwise
    ///
    /// A pawn reaching the far rank is left waiting for [`Game::promote`].
    pub fn try_make_move(
        &mut self,
        source: BoardSquare,
        target: BoardSquare,
    ) -> Result<MoveOutcome> {
        let mv = self.check_move_legality(source, target)?;
        Ok(self.apply(mv, None))
    }

    /// Make the move if it is legal
    ///
    /// A pawn reaching the far rank is left waiting for [`Game::promote`].
    pub fn make_move(&mut self, source: BoardSquare, target: BoardSquare) -> MoveOutcome {
        match self.try_make_move(source, target) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(%source, %target, reason = %e, "move rejected");
                MoveOutcome::Rejected
            }
        }
    }

    /// Make a move whose promotion, if any, is already decided
    ///
    /// This is how a move arriving from elsewhere is replayed. A pawn reaching the far rank
    /// becomes `promotion`, and a queen when no choice came with the move. The promotion is
    /// ignored for any other move.
    pub fn replay_move(
        &mut self,
        source: BoardSquare,
        target: BoardSquare,
        promotion: Option<PieceKind>,
    ) -> Result<()> {
        if let Some(kind) = promotion.filter(|kind| !kind.is_promotable()) {
            return Err(Error::InvalidPromotion(kind));
        }
        let mv = self.check_move_legality(source, target)?;
        let promotion = mv
            .is_promotion()
            .then(|| promotion.unwrap_or(PieceKind::Queen));
        self.apply(mv, promotion);
        Ok(())
    }

    /// Settle a pending promotion, reporting why it couldn't be done otherwise
    pub fn try_promote(&mut self, square: BoardSquare, kind: PieceKind) -> Result<()> {
        let pending = self
            .pending_promotion
            .filter(|pending| pending.square == square)
            .ok_or(Error::NoPendingPromotion(square))?;
        if !kind.is_promotable() {
            return Err(Error::InvalidPromotion(kind));
        }
        self.board.set(square, Some(Piece::new(kind, pending.color)));
        self.pending_promotion = None;
        debug!(%square, %kind, "pawn promoted");
        self.update_status();
        Ok(())
    }

    /// Turn the pawn waiting on `square` into `kind`
    ///
    /// Returns `false`, changing nothing, if no promotion is waiting there or `kind` isn't
    /// something a pawn can become.
    pub fn promote(&mut self, square: BoardSquare, kind: PieceKind) -> bool {
        match self.try_promote(square, kind) {
            Ok(()) => true,
            Err(e) => {
                debug!(%square, %kind, reason = %e, "promotion rejected");
                false
            }
        }
    }

    /// End the game with `color` giving up
    ///
    /// A pawn still waiting to be promoted becomes a queen first.
    pub fn resign(&mut self, color: Color) -> Result<()> {
        if self.status.is_over() {
            return Err(IllegalMove::GameOver.into());
        }
        if let Some(pending) = self.pending_promotion.take() {
            self.board.set(
                pending.square,
                Some(Piece::new(PieceKind::Queen, pending.color)),
            );
        }
        self.status = GameStatus::Resigned {
            winner: color.other(),
        };
        info!(%color, "resigned");
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck::quickcheck;
    use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

    use BoardSquare as S;

    #[track_caller]
    fn play(game: &mut Game, moves: &[(BoardSquare, BoardSquare)]) {
        for &(source, target) in moves {
            if let Err(e) = game.try_make_move(source, target) {
                panic!("{source}-{target} rejected: {e}\n{}", game.board());
            }
        }
    }

    #[test]
    fn test_opening_moves() {
        let game = Game::new();
        assert_eq!(game.legal_moves(S::G1), [S::F3, S::H3]);
        assert_eq!(game.legal_moves(S::E2), [S::E3, S::E4]);
        assert!(game.legal_moves(S::E1).is_empty());
        assert!(game.legal_moves(S::E4).is_empty());
        assert!(game.legal_moves(S::E7).is_empty());
        assert_eq!(game.all_legal_moves().len(), 20);
    }

    #[test]
    fn test_rejection_reasons() {
        let game = Game::new();
        assert_eq!(
            game.check_move_legality(S::E4, S::E5),
            Err(IllegalMove::NoPieceAtSource)
        );
        assert_eq!(
            game.check_move_legality(S::E7, S::E5),
            Err(IllegalMove::NotYourTurn)
        );
        assert_eq!(
            game.check_move_legality(S::A1, S::A2),
            Err(IllegalMove::OwnPieceAtTarget)
        );
        assert_eq!(
            game.check_move_legality(S::A1, S::A1),
            Err(IllegalMove::OwnPieceAtTarget)
        );
        assert_eq!(
            game.check_move_legality(S::C1, S::E3),
            Err(IllegalMove::MoveBlocked)
        );
        assert_eq!(
            game.check_move_legality(S::B1, S::B3),
            Err(IllegalMove::MoveNeverLegal)
        );
        assert_eq!(
            game.check_move_legality(S::E2, S::D3),
            Err(IllegalMove::CaptureTargetMissing)
        );
        assert_eq!(
            game.check_move_legality(S::E2, S::E5),
            Err(IllegalMove::MoveNeverLegal)
        );
        assert_eq!(
            game.check_move_legality(S::INVALID, S::E5),
            Err(IllegalMove::InvalidSquare)
        );
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let mut game = Game::new();
        let before = game.clone();
        assert_eq!(game.make_move(S::E2, S::E5), MoveOutcome::Rejected);
        assert_eq!(game, before);
    }

    #[test]
    fn test_pawn_pushes_blocked() {
        let mut game = Game::from_fen("4k3/8/8/8/8/4p3/4P3/4K3 w - - 0 1").unwrap();
        assert!(game.legal_moves(S::E2).is_empty());
        assert_eq!(
            game.check_move_legality(S::E2, S::E3),
            Err(IllegalMove::NonCaptureTargetTaken)
        );
        assert_eq!(
            game.check_move_legality(S::E2, S::E4),
            Err(IllegalMove::MoveBlocked)
        );
        game = Game::from_fen("4k3/8/8/8/4p3/8/4P3/4K3 w - - 0 1").unwrap();
        assert_eq!(game.legal_moves(S::E2), [S::E3]);
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let game = Game::from_fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1").unwrap();
        assert_eq!(
            game.check_move_legality(S::E2, S::D3),
            Err(IllegalMove::MovingIntoCheck)
        );
        assert!(game.legal_moves(S::E2).is_empty());
        assert_eq!(game.legal_moves(S::E1), [S::D1, S::F1, S::D2, S::F2]);
    }

    #[test]
    fn test_must_answer_check() {
        let mut game = Game::new();
        play(
            &mut game,
            &[(S::E2, S::E4), (S::F7, S::F6), (S::D1, S::H5)],
        );
        assert!(game.is_in_check());
        assert_eq!(
            game.check_move_legality(S::A7, S::A6),
            Err(IllegalMove::MovingIntoCheck)
        );
        let mut answers = game.all_legal_moves();
        answers.sort_by_key(|&(source, target)| (source.0, target.0));
        assert_eq!(answers, [(S::G7, S::G6)]);
    }

    #[test]
    fn test_kings_cannot_touch() {
        let game = Game::from_fen("8/8/8/3k4/8/3K4/8/8 w - - 0 1").unwrap();
        for target in [S::C4, S::D4, S::E4] {
            assert_eq!(
                game.check_move_legality(S::D3, target),
                Err(IllegalMove::MovingIntoCheck)
            );
        }
        assert!(game.is_legal(S::D3, S::D2));
    }

    #[test]
    fn test_legal_moves_idempotent() {
        let mut game = Game::new();
        play(&mut game, &[(S::E2, S::E4), (S::E7, S::E5)]);
        for square in BoardSquare::all_squares() {
            assert_eq!(game.legal_moves(square), game.legal_moves(square));
        }
    }

    #[test]
    fn test_en_passant_capture() {
        let mut game = Game::new();
        play(
            &mut game,
            &[(S::E2, S::E4), (S::A7, S::A6), (S::E4, S::E5), (S::D7, S::D5)],
        );
        assert_eq!(game.en_passant_target(), Some(S::D6));
        assert!(game.is_legal(S::E5, S::D6));
        assert_eq!(game.make_move(S::E5, S::D6), MoveOutcome::Applied);
        assert_eq!(game.piece_at(S::D5), None);
        assert_eq!(
            game.piece_at(S::D6),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
        assert_eq!(game.en_passant_target(), None);
        assert_eq!(game.board().count(|p| p.color == Color::Black), 15);
        assert_eq!(game.history().last().map(String::as_str), Some("e5xd6"));
    }

    #[test]
    fn test_en_passant_expires_after_one_reply() {
        let mut game = Game::new();
        play(
            &mut game,
            &[
                (S::E2, S::E4),
                (S::A7, S::A6),
                (S::E4, S::E5),
                (S::D7, S::D5),
                (S::H2, S::H3),
                (S::H7, S::H6),
            ],
        );
        assert_eq!(game.en_passant_target(), None);
        assert_eq!(
            game.check_move_legality(S::E5, S::D6),
            Err(IllegalMove::CaptureTargetMissing)
        );
    }

    #[test]
    fn test_en_passant_cannot_expose_king() {
        // Taking en passant would clear the rank between the king and the rook
        let game = Game::from_fen("8/8/8/KPp4r/8/8/8/7k w - c6 0 1").unwrap();
        assert_eq!(
            game.check_move_legality(S::B5, S::C6),
            Err(IllegalMove::MovingIntoCheck)
        );
    }

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new();
        play(
            &mut game,
            &[(S::F2, S::F3), (S::E7, S::E5), (S::G2, S::G4), (S::D8, S::H4)],
        );
        assert_eq!(
            game.status(),
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );
        assert!(game.is_in_check());
        for (square, _) in game.board().pieces_of(Color::White) {
            assert!(game.legal_moves(square).is_empty());
        }
        assert_eq!(
            game.try_make_move(S::A2, S::A3).unwrap_err().to_string(),
            "illegal move: the game is already over"
        );
        assert_eq!(game.history(), ["f2-f3", "e7-e5", "g2-g4", "♛d8-h4"]);
    }

    #[test]
    fn test_back_rank_mate() {
        let mut game = Game::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        assert_eq!(game.make_move(S::A1, S::A8), MoveOutcome::Applied);
        assert_eq!(
            game.status(),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
        assert_eq!(game.make_move(S::G8, S::H8), MoveOutcome::Rejected);
    }

    #[test]
    fn test_stalemate() {
        let mut game = Game::from_fen("7k/8/6K1/8/8/8/8/5Q2 w - - 0 1").unwrap();
        assert_eq!(game.make_move(S::F1, S::F7), MoveOutcome::Applied);
        assert!(!game.is_in_check());
        assert_eq!(game.status(), GameStatus::Stalemate);
        assert_eq!(game.status().winner(), None);
    }

    #[test]
    fn test_position_already_over() {
        let game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game.status(), GameStatus::Stalemate);
    }

    #[test]
    fn test_deferred_promotion() {
        let mut game = Game::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let pieces_before = game.board().count(|_| true);
        let pending = PendingPromotion {
            square: S::A8,
            color: Color::White,
        };
        assert_eq!(
            game.make_move(S::A7, S::A8),
            MoveOutcome::AppliedPendingPromotion(pending)
        );
        assert_eq!(game.pending_promotion(), Some(pending));
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(
            game.check_move_legality(S::H7, S::H6),
            Err(IllegalMove::PromotionPending)
        );
        assert!(!game.promote(S::B8, PieceKind::Queen));
        assert!(!game.promote(S::A8, PieceKind::King));
        assert!(!game.promote(S::A8, PieceKind::Pawn));
        assert!(game.promote(S::A8, PieceKind::Queen));
        assert_eq!(
            game.piece_at(S::A8),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
        assert_eq!(game.board().count(|_| true), pieces_before);
        assert_eq!(game.pending_promotion(), None);
        assert!(matches!(
            game.try_promote(S::A8, PieceKind::Queen),
            Err(Error::NoPendingPromotion(S::A8))
        ));
        assert!(game.is_legal(S::H7, S::H6));
        assert_eq!(game.history(), ["a7-a8"]);
    }

    #[test]
    fn test_promotion_can_deliver_mate() {
        // The rook on b7 guards the seventh rank, so a new queen on a8 mates
        let mut game = Game::from_fen("6k1/PR6/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert!(game.make_move(S::A7, S::A8).is_applied());
        assert_eq!(game.status(), GameStatus::InProgress);
        assert!(game.promote(S::A8, PieceKind::Queen));
        assert_eq!(
            game.status(),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
    }

    #[test]
    fn test_replayed_promotion() {
        let mut game = Game::from_fen("1r5k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let mut knight = game.clone();
        game.replay_move(S::A7, S::B8, None).unwrap();
        assert_eq!(
            game.piece_at(S::B8),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
        assert_eq!(game.pending_promotion(), None);
        assert_eq!(game.history(), ["a7xb8"]);
        knight
            .replay_move(S::A7, S::B8, Some(PieceKind::Knight))
            .unwrap();
        assert_eq!(
            knight.piece_at(S::B8),
            Some(Piece::new(PieceKind::Knight, Color::White))
        );
        assert!(matches!(
            Game::new().replay_move(S::E2, S::E4, Some(PieceKind::King)),
            Err(Error::InvalidPromotion(PieceKind::King))
        ));
    }

    #[test]
    fn test_black_promotes_on_first_rank() {
        let mut game = Game::from_fen("k7/8/8/8/8/8/6p1/K7 b - - 0 1").unwrap();
        assert_eq!(
            game.make_move(S::G2, S::G1),
            MoveOutcome::AppliedPendingPromotion(PendingPromotion {
                square: S::G1,
                color: Color::Black
            })
        );
        assert!(game.promote(S::G1, PieceKind::Rook));
        assert!(game.is_in_check());
    }

    #[test]
    fn test_resign() {
        let mut game = Game::new();
        game.resign(Color::White).unwrap();
        assert_eq!(
            game.status(),
            GameStatus::Resigned {
                winner: Color::Black
            }
        );
        assert!(game.resign(Color::Black).is_err());
        assert!(!game.is_legal(S::E2, S::E4));
        game.reset();
        assert_eq!(game, Game::new());
    }

    #[test]
    fn test_fen_round_trip() {
        let mut game = Game::new();
        play(&mut game, &[(S::E2, S::E4), (S::C7, S::C5), (S::G1, S::F3)]);
        assert_eq!(
            game.to_fen(),
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 0 2"
        );
        let reloaded = Game::from_fen(&game.to_fen()).unwrap();
        assert_eq!(reloaded.board(), game.board());
        assert_eq!(reloaded.all_legal_moves(), game.all_legal_moves());
    }

    #[test]
    fn test_fullmove_number_continues_from_fen() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 12").unwrap();
        assert_eq!(game.to_fen(), "4k3/8/8/8/8/8/4P3/4K3 b - - 0 12");
        play(&mut game, &[(S::E8, S::D8)]);
        assert_eq!(game.to_fen(), "3k4/8/8/8/8/8/4P3/4K3 w - - 0 13");
        play(&mut game, &[(S::E2, S::E4)]);
        assert_eq!(game.to_fen(), "3k4/8/8/8/4P3/8/8/4K3 b - e3 0 13");
        assert_eq!(game.fullmove_number(), 13);
        let mut restored = Game::new();
        restored.restore(game.snapshot()).unwrap();
        assert_eq!(restored.to_fen(), game.to_fen());

        let short = Game::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - -").unwrap();
        assert_eq!(short.fullmove_number(), 1);
        assert!(matches!(
            Game::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 0"),
            Err(Error::Fen(FenError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_bad_fen() {
        assert!(matches!(
            Game::from_fen("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(Error::InvalidSnapshot(SnapshotError::KingCount { .. }))
        ));
        assert!(matches!(
            Game::from_fen("4k3/8/8/8/8/8/8/4K3 x - - 0 1"),
            Err(Error::Fen(FenError::InvalidField { .. }))
        ));
        assert!(matches!(
            Game::from_fen("4k3/8/8/8/8/8/8/4K3 w"),
            Err(Error::Fen(FenError::MissingField("castling")))
        ));
    }

    #[test]
    fn test_games_are_independent() {
        let mut first = Game::new();
        let second = Game::new();
        play(&mut first, &[(S::D2, S::D4)]);
        assert_eq!(second, Game::new());
        assert_ne!(first, second);
    }

    /// Play out a game, choosing each move (and promotion) from `choices`
    ///
    /// After every move, check the mover isn't left in check and that a snapshot restores to the
    /// same game.
    fn check_playout(choices: &[u8]) -> bool {
        const PROMOTIONS: [PieceKind; 4] = [
            PieceKind::Queen,
            PieceKind::Rook,
            PieceKind::Bishop,
            PieceKind::Knight,
        ];
        let mut game = Game::new();
        for &choice in choices {
            let moves = game.all_legal_moves();
            if moves.is_empty() {
                return game.status().is_over();
            }
            let mover = game.turn();
            let (source, target) = moves[choice as usize % moves.len()];
            match game.make_move(source, target) {
                MoveOutcome::Rejected => return false,
                MoveOutcome::Applied => {}
                MoveOutcome::AppliedPendingPromotion(pending) => {
                    let kind = PROMOTIONS[choice as usize % PROMOTIONS.len()];
                    if !game.promote(pending.square, kind) {
                        return false;
                    }
                }
            }
            if attacks::in_check(game.board(), mover) {
                return false;
            }
            let mut restored = Game::new();
            if restored.restore(game.snapshot()).is_err() || restored != game {
                return false;
            }
        }
        true
    }

    quickcheck! {
        fn test_random_playouts_stay_legal(choices: Vec<u8>) -> bool {
            check_playout(&choices[..choices.len().min(80)])
        }
    }

    /// Play whole random games to the end, the way a random-move player would
    #[test]
    fn test_random_games_keep_one_king_each() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        for _ in 0..8 {
            let mut game = Game::new();
            for _ in 0..300 {
                let Some(&(source, target)) = game.all_legal_moves().choose(&mut rng) else {
                    break;
                };
                let promotion = rng.gen_bool(0.5).then_some(PieceKind::Knight);
                game.replay_move(source, target, promotion).unwrap();
                for color in Color::COLORS {
                    assert_eq!(
                        game.board()
                            .count(|p| p == Piece::new(PieceKind::King, color)),
                        1
                    );
                }
            }
            assert_eq!(
                game.status().is_over(),
                game.all_legal_moves().is_empty(),
                "{}",
                game.to_fen()
            );
        }
    }
}
