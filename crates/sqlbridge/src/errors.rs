//! Error types for handle operations and for command channels.
//!
//! [`ChannelError`] is what a [`crate::CommandChannel`] reports: either the
//! engine answered with a rejection, or the channel itself failed. The handle
//! layer classifies those into [`SqlError`] according to which operation was
//! in flight. Nothing here is retried; every error belongs to the single
//! operation that produced it.

use serde::{ser::Serializer, Serialize};
use thiserror::Error;

use crate::ConnectionId;

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

/// Failure reported by a command channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The engine received the command and rejected it. The message is the
    /// engine's own text.
    #[error("{0}")]
    Engine(String),

    /// The command never produced an engine answer (serialization failure,
    /// channel closed, peer unreachable).
    #[error("transport failure: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Handle errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`crate::Database`] operations.
#[derive(Debug, Error)]
pub enum SqlError {
    /// The engine rejected the identifier on `load`, or could not be reached
    /// while resolving a handle.
    #[error("cannot connect to '{db}': {message}")]
    Connection {
        /// The identifier that was being resolved.
        db: String,
        /// Engine or transport message.
        message: String,
    },

    /// The engine reported a failure while running a statement (syntax error,
    /// constraint violation, type mismatch, closed connection reused).
    ///
    /// The handle stays usable for later calls.
    #[error("{message}")]
    Execution {
        /// Engine message, verbatim.
        message: String,
    },

    /// A row set came back but could not be decoded into the caller's type.
    #[error("row set does not match {expected}: {message}")]
    SchemaMismatch {
        /// Name of the type the caller asked for.
        expected: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The command channel failed before the engine answered.
    #[error("transport failure: {message}")]
    Transport {
        /// Channel message.
        message: String,
    },

    /// The engine answered with a value of the wrong shape for the command.
    #[error("malformed '{command}' response: {message}")]
    Protocol {
        /// Command whose response could not be decoded.
        command: &'static str,
        /// What was wrong with the response.
        message: String,
    },
}

impl SqlError {
    /// Builds the error for a failed resolution of `db`.
    pub(crate) fn connection(db: &ConnectionId, source: ChannelError) -> Self {
        let message = match source {
            ChannelError::Engine(message) => message,
            ChannelError::Transport(message) => format!("transport failure: {message}"),
        };
        Self::Connection {
            db: db.to_string(),
            message,
        }
    }

    /// Returns `true` for every failure of a running statement.
    ///
    /// Transport failures count as execution failures at this layer because
    /// the root cause cannot be told apart beyond what the channel reports.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. }
                | Self::SchemaMismatch { .. }
                | Self::Transport { .. }
                | Self::Protocol { .. }
        )
    }

    /// Returns `true` if the error came from resolving the identifier.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl From<ChannelError> for SqlError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Engine(message) => Self::Execution { message },
            ChannelError::Transport(message) => Self::Transport { message },
        }
    }
}

// Hosts forwarding errors across a process boundary receive the display text.
impl Serialize for SqlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

/// Result alias used by handle operations.
pub type Result<T> = std::result::Result<T, SqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_rejection_maps_to_execution() {
        let err = SqlError::from(ChannelError::Engine("no such table: todos".into()));
        assert!(matches!(&err, SqlError::Execution { message } if message == "no such table: todos"));
        assert_eq!(err.to_string(), "no such table: todos");
    }

    #[test]
    fn transport_failure_surfaces_like_execution() {
        let err = SqlError::from(ChannelError::Transport("channel closed".into()));
        assert!(matches!(err, SqlError::Transport { .. }));
        assert!(err.is_execution_failure());
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn connection_error_keeps_identifier() {
        let db = ConnectionId::new("oracle:nope").unwrap();
        let err = SqlError::connection(&db, ChannelError::Engine("unsupported engine".into()));
        assert!(err.is_connection_failure());
        assert_eq!(err.to_string(), "cannot connect to 'oracle:nope': unsupported engine");
    }

    #[test]
    fn serializes_as_display_string() {
        let err = SqlError::Execution {
            message: "UNIQUE constraint failed: todos.id".into(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!("UNIQUE constraint failed: todos.id")
        );
    }
}
