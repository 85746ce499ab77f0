use carte_protocol::{MalformedCardError, WireError};

use crate::board::CardId;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("group {group:?} is missing a value for {missing:?}")]
    UnboundSelection { group: String, missing: String },
    #[error("no group named {0:?} in this layout")]
    UnknownGroup(String),
    #[error("deck {0} has not been put on the table")]
    DeckNotInstantiated(String),
    #[error("cannot draw from empty deck {0}")]
    EmptyDeck(String),
    #[error("deck count {count} cannot change by {delta}")]
    CountUnderflow { count: u32, delta: i64 },
    #[error("card {0} is not on the board")]
    UnknownCard(CardId),
}

/// Why a command handler gave up. The dispatcher logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{command}: missing argument {name}")]
    MissingArgument { command: String, name: &'static str },
    #[error("{command}: invalid {name} {value:?}")]
    InvalidArgument {
        command: String,
        name: &'static str,
        value: String,
    },
    #[error("malformed card: {0}")]
    Card(#[from] MalformedCardError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("no card matching {0} where one was expected")]
    NoMatchingCard(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed message: {0}")]
    Wire(#[from] WireError),
    #[error("no handler for command {0:?}")]
    UnknownCommand(String),
    #[error("handler failed: {0}")]
    Handler(#[from] CommandError),
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("cannot derive a websocket address from {0}")]
    Url(String),
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("no game named {0:?} (known: briscola, scopa)")]
    UnknownGame(String),
    #[error("cannot tell which game {0} serves")]
    NoGameInUrl(String),
    #[error("{game} does not handle {missing:?}")]
    IncompleteCommandTable { game: String, missing: Vec<String> },
}
