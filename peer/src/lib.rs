//! Messages two peers exchange to keep their games in step
//!
//! Nothing here knows about the rules of chess. A message only describes what one side did, and
//! each side replays it against its own game.

use std::{
    convert::Infallible,
    io::{self, BufRead, Write},
};

use board::{BoardSquare, PieceKind};
use serde::{Deserialize, Serialize};

/// Something one peer tells the other
///
/// On the wire this is a JSON object tagged by `kind`, for example
/// `{"kind":"move","from":"e7","to":"e8","promotion":"knight"}` or `{"kind":"newGame"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PeerMessage {
    /// A move, complete with its promotion choice if it had one
    Move {
        from: BoardSquare,
        to: BoardSquare,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<PieceKind>,
    },
    NewGame,
    Resign,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transport failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Write a message as a single line of JSON
pub fn encode(message: &PeerMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(text: &str) -> Result<PeerMessage> {
    Ok(serde_json::from_str(text)?)
}

/// Read one message per line, skipping blank lines
pub fn read_messages(reader: impl BufRead) -> impl Iterator<Item = Result<PeerMessage>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(decode(&line)),
        Err(e) => Some(Err(e.into())),
    })
}

/// A connection to the other peer
///
/// Messages must arrive in the order they were sent. Nothing is resent if one goes missing.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Hand a message over for delivery
    fn send(&mut self, message: PeerMessage) -> Result<(), Self::Error>;
}

/// Collects sent messages, for when the other side runs in the same process
impl Transport for Vec<PeerMessage> {
    type Error = Infallible;

    fn send(&mut self, message: PeerMessage) -> Result<(), Self::Error> {
        self.push(message);
        Ok(())
    }
}

/// Sends each message as a line of JSON
#[derive(Debug)]
pub struct JsonLines<W> {
    writer: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for JsonLines<W> {
    type Error = Error;

    fn send(&mut self, message: PeerMessage) -> Result<(), Self::Error> {
        serde_json::to_writer(&mut self.writer, &message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
