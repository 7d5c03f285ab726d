//! Replay a log of peer messages and print where the game ended up
//!
//! The log is read one JSON message per line, for example:
//!
//! ```text
//! {"kind":"move","from":"e2","to":"e4"}
//! {"kind":"move","from":"e7","to":"e5"}
//! ```

use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

use anyhow::Context;
use backend::Session;
use clap::Parser;
use engine::Game;
use peer::PeerMessage;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay peer messages against a fresh game and print the final state as JSON")]
struct Args {
    /// File of messages, one per line; stdin if not given
    input: Option<PathBuf>,

    /// Start from this position instead of the standard one
    #[arg(long)]
    fen: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log filter, overriding `RUST_LOG`
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let game = match &args.fen {
        Some(fen) => Game::from_fen(fen).with_context(|| format!("bad starting position {fen:?}"))?,
        None => Game::new(),
    };
    // Both sides are replayed here, so nothing is ever sent
    let mut session = Session::with_game(game, None, Vec::<PeerMessage>::new());

    let messages: Box<dyn Iterator<Item = peer::Result<PeerMessage>>> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("couldn't open {}", path.display()))?;
            Box::new(peer::read_messages(BufReader::new(file)))
        }
        None => Box::new(peer::read_messages(io::stdin().lock())),
    };
    for (idx, message) in messages.enumerate() {
        let message = message.with_context(|| format!("reading message {}", idx + 1))?;
        let event = session
            .receive(message)
            .with_context(|| format!("replaying message {}", idx + 1))?;
        tracing::debug!(?event, "replayed");
    }

    let state = session.game().snapshot();
    let json = if args.pretty {
        serde_json::to_string_pretty(&state)?
    } else {
        serde_json::to_string(&state)?
    };
    println!("{json}");
    Ok(())
}
