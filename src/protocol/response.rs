//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

/// A response line sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    // -------------------------------------------------------------------------
    // Success
    // -------------------------------------------------------------------------
    /// Value read, or value removed by `DELETE`
    Value(String),

    /// `WRITE` bound a key that was absent
    Inserted,

    /// `WRITE` replaced the given previous value
    Updated(String),

    Pong,

    /// Session closed at the client's request
    Bye,

    /// Shutdown has begun; also the refusal for mutations issued after it
    ShuttingDown,

    // -------------------------------------------------------------------------
    // Failure
    // -------------------------------------------------------------------------
    NotFound,

    /// Another session holds the key; retry later
    KeyLocked,

    UnknownCommand,

    /// Request reached a session that is already closed
    UnknownClient,

    BadRequest,

    /// The log append failed; the mutation was not applied
    StorageError,
}

impl Response {
    /// Whether the command it answers took effect
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Response::Value(_)
                | Response::Inserted
                | Response::Updated(_)
                | Response::Pong
                | Response::Bye
                | Response::ShuttingDown
        )
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Value(value) => f.write_str(value),
            Response::Inserted => f.write_str("Inserted"),
            Response::Updated(previous) => write!(f, "Updated {}", previous),
            Response::Pong => f.write_str("PONG"),
            Response::Bye => f.write_str("Bye"),
            Response::ShuttingDown => f.write_str("ShuttingDown"),
            Response::NotFound => f.write_str("NotFound"),
            Response::KeyLocked => f.write_str("KeyLocked"),
            Response::UnknownCommand => f.write_str("UnknownCommand"),
            Response::UnknownClient => f.write_str("UnknownClient"),
            Response::BadRequest => f.write_str("BadRequest"),
            Response::StorageError => f.write_str("StorageError"),
        }
    }
}
