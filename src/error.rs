use std::io;

use thiserror::Error;

/// Errors surfaced by the session and the TSL driver.
///
/// None of these are retried internally. An [`Argument`](TslError::Argument)
/// error leaves the session closed; the others leave it as it was.
#[derive(Error, Debug)]
pub enum TslError {
    /// The socket could not be opened, a read or write failed, the peer hung
    /// up, or the session was already closed.
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// A setter was handed a value it cannot put on the wire.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A reply could not be decoded or parsed.
    #[error("Unable to parse reply {reply:?} as {expected}")]
    Parse {
        reply: String,
        expected: &'static str,
    },

    #[error("Config error: {0}")]
    Config(String),
}

pub type TslResult<T> = Result<T, TslError>;

impl TslError {
    pub(crate) fn closed() -> Self {
        TslError::Connection(io::Error::new(io::ErrorKind::NotConnected, "Session is closed"))
    }

    pub(crate) fn parse(reply: &str, expected: &'static str) -> Self {
        TslError::Parse { reply: reply.to_owned(), expected }
    }

    /// True for errors that came from the transport rather than the caller or the reply.
    pub fn is_connection(&self) -> bool {
        matches!(self, TslError::Connection(_))
    }
}
