//! Copying the whole game out, and loading it back in

use board::{Board, BoardSquare, Color, GameStatus, Piece, PieceKind};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{attacks, CastlingRights, Game, PendingPromotion, Result};

/// Everything there is to know about a game at one moment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub move_history: Vec<String>,
    pub status: GameStatus,
    /// Whether the side to move is in check
    ///
    /// This is derived from the board, so [`Game::restore`] doesn't read it.
    pub in_check: bool,
    pub en_passant_target: Option<BoardSquare>,
    pub castling_rights: CastlingRights,
    #[serde(default)]
    pub pending_promotion: Option<PendingPromotion>,
    /// The FEN fullmove number before the first move in `move_history`
    #[serde(default = "first_move")]
    pub first_move_number: u32,
}

fn first_move() -> u32 {
    1
}

/// Why a [`GameState`] can't be restored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("{color} has {count} kings")]
    KingCount { color: Color, count: usize },
    #[error("{color} has {count} pieces")]
    TooManyPieces { color: Color, count: usize },
    #[error("pawn standing on back rank square {0}")]
    PawnOnBackRank(BoardSquare),
    #[error("{0} can't be the en passant target")]
    BadEnPassantTarget(BoardSquare),
    #[error("{0} is in check but it isn't their move")]
    OpponentInCheck(Color),
    #[error("pending promotion doesn't match a pawn just moved onto the far rank")]
    PendingPromotionMismatch,
    #[error("promotion pending in a finished game")]
    PendingWhileOver,
    #[error("status says {recorded} but the position is {actual}")]
    StatusMismatch {
        recorded: GameStatus,
        actual: GameStatus,
    },
    #[error("fullmove numbers start at 1")]
    ZeroMoveNumber,
}

impl GameState {
    /// Check the state is one a game could really be in
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let board = &self.board;
        for color in Color::COLORS {
            let count = board.count(|piece| piece == Piece::new(PieceKind::King, color));
            if count != 1 {
                return Err(SnapshotError::KingCount { color, count });
            }
            let count = board.count(|piece| piece.color == color);
            if count > 16 {
                return Err(SnapshotError::TooManyPieces { color, count });
            }
        }
        for (square, piece) in board.pieces() {
            let on_edge = square.rank() == 0 || square.rank() == 7;
            let pending_here = self
                .pending_promotion
                .is_some_and(|pending| pending.square == square && pending.color == piece.color);
            if piece.kind == PieceKind::Pawn && on_edge && !pending_here {
                return Err(SnapshotError::PawnOnBackRank(square));
            }
        }
        if let Some(pending) = self.pending_promotion {
            if self.status.is_over() {
                return Err(SnapshotError::PendingWhileOver);
            }
            if pending.color != self.turn.other()
                || pending.square.rank() != pending.color.promotion_rank()
                || board.get(pending.square) != Some(Piece::new(PieceKind::Pawn, pending.color))
            {
                return Err(SnapshotError::PendingPromotionMismatch);
            }
        }
        if let Some(target) = self.en_passant_target {
            // The side that just moved pushed a pawn two squares over `target`
            let mover = self.turn.other();
            let passed_rank = (mover.pawn_rank() as i8 + mover.pawn_direction()) as u8;
            let pawn_square = target.offset(mover.pawn_direction(), 0);
            if !target.is_valid()
                || target.rank() != passed_rank
                || board.is_occupied(target)
                || board.get(pawn_square) != Some(Piece::new(PieceKind::Pawn, mover))
            {
                return Err(SnapshotError::BadEnPassantTarget(target));
            }
        }
        if attacks::in_check(board, self.turn.other()) {
            return Err(SnapshotError::OpponentInCheck(self.turn.other()));
        }
        if self.first_move_number == 0 {
            return Err(SnapshotError::ZeroMoveNumber);
        }
        // A resignation can end any position, and a pending promotion is evaluated once settled
        if self.pending_promotion.is_none() && !matches!(self.status, GameStatus::Resigned { .. }) {
            let actual = Game {
                board: self.board,
                turn: self.turn,
                castling: self.castling_rights,
                en_passant: self.en_passant_target,
                status: GameStatus::InProgress,
                history: Vec::new(),
                first_move_number: self.first_move_number,
                pending_promotion: None,
            }
            .evaluate_status();
            if actual != self.status {
                return Err(SnapshotError::StatusMismatch {
                    recorded: self.status,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl Game {
    /// Copy out the complete state of the game
    pub fn snapshot(&self) -> GameState {
        GameState {
            board: self.board,
            turn: self.turn,
            move_history: self.history.clone(),
            status: self.status,
            in_check: self.is_in_check(),
            en_passant_target: self.en_passant,
            castling_rights: self.castling,
            pending_promotion: self.pending_promotion,
            first_move_number: self.first_move_number,
        }
    }

    /// Replace the whole game with the given state
    ///
    /// The state is checked before anything is touched, so on error the game is unchanged.
    pub fn restore(&mut self, state: GameState) -> Result<()> {
        state.validate()?;
        let GameState {
            board,
            turn,
            move_history,
            status,
            in_check: _,
            en_passant_target,
            castling_rights,
            pending_promotion,
            first_move_number,
        } = state;
        *self = Self {
            board,
            turn,
            castling: castling_rights,
            en_passant: en_passant_target,
            status,
            history: move_history,
            first_move_number,
            pending_promotion,
        };
        info!(%turn, %status, moves = self.history.len(), "game state restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Error, MoveOutcome};

    fn played(moves: &[(BoardSquare, BoardSquare)]) -> Game {
        let mut game = Game::new();
        for &(source, target) in moves {
            assert!(game.make_move(source, target).is_applied());
        }
        game
    }

    #[test]
    fn test_restore_snapshot_round_trip() {
        let game = played(&[
            (BoardSquare::E2, BoardSquare::E4),
            (BoardSquare::C7, BoardSquare::C5),
            (BoardSquare::E4, BoardSquare::E5),
            (BoardSquare::D7, BoardSquare::D5),
        ]);
        let mut restored = Game::new();
        restored.restore(game.snapshot()).unwrap();
        assert_eq!(restored, game);
        for square in BoardSquare::all_squares() {
            assert_eq!(restored.legal_moves(square), game.legal_moves(square));
        }
        assert_eq!(restored.en_passant_target(), Some(BoardSquare::D6));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let game = played(&[
            (BoardSquare::E2, BoardSquare::E4),
            (BoardSquare::E7, BoardSquare::E5),
            (BoardSquare::G1, BoardSquare::F3),
        ]);
        let json = serde_json::to_string(&game.snapshot()).unwrap();
        let state: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, game.snapshot());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["turn"], "black");
        assert_eq!(value["moveHistory"][2], "♘g1-f3");
        assert_eq!(value["status"]["state"], "inProgress");
        assert_eq!(value["enPassantTarget"], serde_json::Value::Null);
    }

    #[test]
    fn test_snapshot_reports_check() {
        let game = played(&[
            (BoardSquare::E2, BoardSquare::E4),
            (BoardSquare::F7, BoardSquare::F6),
            (BoardSquare::D1, BoardSquare::H5),
        ]);
        let state = game.snapshot();
        assert!(state.in_check);
        assert_eq!(state.status, GameStatus::InProgress);
    }

    #[track_caller]
    fn assert_rejected(state: GameState, expected: SnapshotError) {
        let mut game = played(&[(BoardSquare::G1, BoardSquare::F3)]);
        let before = game.clone();
        match game.restore(state) {
            Err(Error::InvalidSnapshot(error)) => assert_eq!(error, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
        assert_eq!(game, before);
    }

    #[test]
    fn test_missing_king_rejected() {
        let mut state = Game::new().snapshot();
        state.board.take(BoardSquare::E8);
        assert_rejected(
            state,
            SnapshotError::KingCount {
                color: Color::Black,
                count: 0,
            },
        );
    }

    #[test]
    fn test_extra_pieces_rejected() {
        let mut state = Game::new().snapshot();
        state
            .board
            .set(BoardSquare::E4, Some(Piece::new(PieceKind::Knight, Color::White)));
        assert_rejected(
            state,
            SnapshotError::TooManyPieces {
                color: Color::White,
                count: 17,
            },
        );
    }

    #[test]
    fn test_pawn_on_back_rank_rejected() {
        let mut state = Game::new().snapshot();
        state
            .board
            .set(BoardSquare::B8, Some(Piece::new(PieceKind::Pawn, Color::White)));
        state.board.take(BoardSquare::A2);
        assert_rejected(state, SnapshotError::PawnOnBackRank(BoardSquare::B8));
    }

    #[test]
    fn test_bad_en_passant_rejected() {
        let mut state = Game::new().snapshot();
        state.en_passant_target = Some(BoardSquare::E3);
        assert_rejected(state, SnapshotError::BadEnPassantTarget(BoardSquare::E3));
    }

    #[test]
    fn test_side_not_to_move_in_check_rejected() {
        let mut state = Game::new().snapshot();
        state.board = Board::from_fen_placement("4k3/8/8/8/8/8/8/4R1K1").unwrap();
        assert_rejected(state, SnapshotError::OpponentInCheck(Color::Black));
    }

    #[test]
    fn test_status_must_match_position() {
        let mut state = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1")
            .unwrap()
            .snapshot();
        assert_eq!(state.status, GameStatus::Stalemate);
        state.status = GameStatus::InProgress;
        assert_rejected(
            state,
            SnapshotError::StatusMismatch {
                recorded: GameStatus::InProgress,
                actual: GameStatus::Stalemate,
            },
        );

        let mut state = Game::new().snapshot();
        state.status = GameStatus::Checkmate {
            winner: Color::White,
        };
        assert_rejected(
            state,
            SnapshotError::StatusMismatch {
                recorded: GameStatus::Checkmate {
                    winner: Color::White,
                },
                actual: GameStatus::InProgress,
            },
        );

        let mut state = Game::new().snapshot();
        state.status = GameStatus::Resigned {
            winner: Color::Black,
        };
        Game::new().restore(state).unwrap();
    }

    #[test]
    fn test_missing_move_number_defaults_to_first() {
        let mut value = serde_json::to_value(Game::new().snapshot()).unwrap();
        assert_eq!(value["firstMoveNumber"], 1);
        value.as_object_mut().unwrap().remove("firstMoveNumber");
        let state: GameState = serde_json::from_value(value).unwrap();
        assert_eq!(state, Game::new().snapshot());
    }

    #[test]
    fn test_pending_promotion_survives_round_trip() {
        let mut game = Game::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let outcome = game.make_move(BoardSquare::A7, BoardSquare::A8);
        assert!(matches!(outcome, MoveOutcome::AppliedPendingPromotion(_)));
        let mut restored = Game::new();
        restored.restore(game.snapshot()).unwrap();
        assert_eq!(restored.pending_promotion(), game.pending_promotion());
        assert!(restored.promote(BoardSquare::A8, PieceKind::Rook));

        let mut state = game.snapshot();
        state.pending_promotion = None;
        assert_rejected(state, SnapshotError::PawnOnBackRank(BoardSquare::A8));
    }
}
