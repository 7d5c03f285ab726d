//! Keeps a local game in step with a remote peer

use board::{BoardSquare, Color, GameStatus, PieceKind};
use engine::{Game, IllegalMove, MoveOutcome};
use peer::{PeerMessage, Transport};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] engine::Error),
    /// The remote peer sent something the local game can't apply
    ///
    /// The local game is left exactly as it was. From here on the two sides may disagree about
    /// the position.
    #[error("peer sent {message:?}, which doesn't fit the local game: {reason}")]
    Desync {
        message: PeerMessage,
        reason: engine::Error,
    },
    #[error("no local promotion is waiting")]
    NoPendingPromotion,
    #[error("failed to reach peer: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = SessionError> = core::result::Result<T, E>;

/// What a message from the peer did to the local game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteEvent {
    Moved {
        from: BoardSquare,
        to: BoardSquare,
        status: GameStatus,
    },
    NewGame,
    Resigned {
        winner: Color,
    },
}

/// One game played against a peer
///
/// Local moves are checked and made here, then sent on. Moves from the peer are replayed with
/// their promotion already decided.
#[derive(Debug)]
pub struct Session<T> {
    game: Game,
    /// The side played here, or `None` when both sides are
    local: Option<Color>,
    transport: T,
    /// A local move whose promotion hasn't been chosen yet, so it hasn't been sent
    unsent_move: Option<(BoardSquare, BoardSquare)>,
}

impl<T: Transport> Session<T> {
    /// Start a session at the standard starting position
    pub fn new(local: Option<Color>, transport: T) -> Self {
        Self::with_game(Game::new(), local, transport)
    }

    /// Start a session from an existing game
    pub fn with_game(game: Game, local: Option<Color>, transport: T) -> Self {
        info!(?local, "session started");
        Self {
            game,
            local,
            transport,
            unsent_move: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn local_color(&self) -> Option<Color> {
        self.local
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn send(&mut self, message: PeerMessage) -> Result<()> {
        self.transport
            .send(message)
            .map_err(|e| SessionError::Transport(Box::new(e)))
    }

    /// The color the peer plays
    ///
    /// When both sides are local, it's whoever is on move.
    fn remote_color(&self) -> Color {
        self.local.map_or(self.game.turn(), Color::other)
    }

    /// Make a local move
    ///
    /// The move is sent to the peer straight away, unless a pawn reached the far rank. Then it
    /// waits until [`Session::promote`] settles what the pawn becomes.
    pub fn play(&mut self, from: BoardSquare, to: BoardSquare) -> Result<MoveOutcome> {
        if self.game.pending_promotion().is_none()
            && self.local.is_some_and(|local| local != self.game.turn())
        {
            return Err(engine::Error::from(IllegalMove::NotYourTurn).into());
        }
        let outcome = self.game.try_make_move(from, to)?;
        match outcome {
            MoveOutcome::Applied => self.send(PeerMessage::Move {
                from,
                to,
                promotion: None,
            })?,
            MoveOutcome::AppliedPendingPromotion(_) => self.unsent_move = Some((from, to)),
            MoveOutcome::Rejected => {}
        }
        Ok(outcome)
    }

    /// Choose what the local pawn waiting on the far rank becomes, and send the move
    pub fn promote(&mut self, kind: PieceKind) -> Result<()> {
        let (Some((from, to)), Some(pending)) = (self.unsent_move, self.game.pending_promotion())
        else {
            return Err(SessionError::NoPendingPromotion);
        };
        self.game.try_promote(pending.square, kind)?;
        self.unsent_move = None;
        self.send(PeerMessage::Move {
            from,
            to,
            promotion: Some(kind),
        })
    }

    /// Give up the game for the local side
    ///
    /// When both sides are local, the side on move resigns. A promotion still being chosen
    /// becomes a queen, and the move is sent before the resignation.
    pub fn resign(&mut self) -> Result<()> {
        let color = match self.local {
            Some(local) => local,
            None => match self.game.pending_promotion() {
                Some(pending) => pending.color,
                None => self.game.turn(),
            },
        };
        self.game.resign(color)?;
        if let Some((from, to)) = self.unsent_move.take() {
            self.send(PeerMessage::Move {
                from,
                to,
                promotion: Some(PieceKind::Queen),
            })?;
        }
        self.send(PeerMessage::Resign)
    }

    /// Throw the game away and start again, telling the peer to do the same
    pub fn new_game(&mut self) -> Result<()> {
        self.game.reset();
        self.unsent_move = None;
        self.send(PeerMessage::NewGame)
    }

    /// Apply a message from the peer
    pub fn receive(&mut self, message: PeerMessage) -> Result<RemoteEvent> {
        let desync = |reason: engine::Error| {
            warn!(?message, %reason, "peer message doesn't fit the local game");
            SessionError::Desync { message, reason }
        };
        match message {
            PeerMessage::Move { from, to, promotion } => {
                if self.local == Some(self.game.turn()) {
                    return Err(desync(IllegalMove::NotYourTurn.into()));
                }
                let replayed = if matches!(self.game.status(), GameStatus::Resigned { .. }) {
                    self.replay_in_flight(from, to, promotion)
                } else {
                    self.game.replay_move(from, to, promotion)
                };
                replayed.map_err(desync)?;
                Ok(RemoteEvent::Moved {
                    from,
                    to,
                    status: self.game.status(),
                })
            }
            PeerMessage::NewGame => {
                self.game.reset();
                self.unsent_move = None;
                info!("peer started a new game");
                Ok(RemoteEvent::NewGame)
            }
            PeerMessage::Resign => {
                let color = self.remote_color();
                self.game.resign(color).map_err(desync)?;
                info!(%color, "peer resigned");
                // The peer never saw this move, and resigning made the pawn a queen here
                if let Some((from, to)) = self.unsent_move.take() {
                    self.send(PeerMessage::Move {
                        from,
                        to,
                        promotion: Some(PieceKind::Queen),
                    })?;
                }
                Ok(RemoteEvent::Resigned {
                    winner: color.other(),
                })
            }
        }
    }
}

impl<T> Session<T> {
    /// Replay a peer's move that crossed our resignation on the way
    ///
    /// The move still lands on the board, but the game stays resigned.
    fn replay_in_flight(
        &mut self,
        from: BoardSquare,
        to: BoardSquare,
        promotion: Option<PieceKind>,
    ) -> engine::Result<()> {
        let mut state = self.game.snapshot();
        let status = state.status;
        state.status = GameStatus::InProgress;
        let mut game = Game::new();
        game.restore(state)?;
        game.replay_move(from, to, promotion)?;
        let mut state = game.snapshot();
        state.status = status;
        self.game.restore(state)
    }
}
