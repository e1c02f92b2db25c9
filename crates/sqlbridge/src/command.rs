//! The closed command set and the channel trait that carries it.
//!
//! A [`Command`] is one of four tagged variants with typed payload fields. A
//! [`CommandChannel`] ships a command to an engine and returns the engine's
//! raw JSON answer. Channels never see an unknown command name.
//!
//! ## Wire shape
//!
//! | Command   | Payload fields                 | Response                        |
//! |-----------|--------------------------------|---------------------------------|
//! | `load`    | `db`                           | confirmed identifier string     |
//! | `execute` | `db`, `query`, `values`        | `[rowsAffected, lastInsertId]`  |
//! | `select`  | `db`, `query`, `values`        | engine-defined row-set value    |
//! | `close`   | `db` (string or `null`)        | boolean                         |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{BindValues, ChannelError, ConnectionId};

/// One request to the engine.
///
/// Serializes as an internally tagged object, e.g.
/// `{"cmd":"execute","db":"sqlite:test.db","query":"...","values":[]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Open (or confirm) the connection named by `db`.
    Load {
        /// Identifier to open.
        db: ConnectionId,
    },
    /// Run a non-selecting statement.
    Execute {
        /// Target identifier.
        db: ConnectionId,
        /// SQL text, passed through unchanged.
        query: String,
        /// Positional bind parameters.
        values: BindValues,
    },
    /// Run a selecting statement.
    Select {
        /// Target identifier.
        db: ConnectionId,
        /// SQL text, passed through unchanged.
        query: String,
        /// Positional bind parameters.
        values: BindValues,
    },
    /// Release the connection for `db`, or every connection when `None`.
    Close {
        /// Target identifier, or `None` for all.
        db: Option<ConnectionId>,
    },
}

impl Command {
    /// Bare command name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Execute { .. } => "execute",
            Self::Select { .. } => "select",
            Self::Close { .. } => "close",
        }
    }

    /// Plugin-style qualified name, e.g. `plugin:sql|execute`.
    ///
    /// For channel adapters that dispatch on a command string.
    pub fn qualified_name(&self, namespace: &str) -> String {
        format!("plugin:{namespace}|{}", self.name())
    }

    /// Identifier the command targets; `None` only for a close-all.
    pub fn db(&self) -> Option<&ConnectionId> {
        match self {
            Self::Load { db } | Self::Execute { db, .. } | Self::Select { db, .. } => Some(db),
            Self::Close { db } => db.as_ref(),
        }
    }

    /// The payload record without the `cmd` tag.
    pub fn payload(&self) -> Result<JsonValue, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let JsonValue::Object(fields) = &mut value {
            fields.shift_remove("cmd");
        }
        Ok(value)
    }
}

/// Request/response transport to an SQL engine.
///
/// Implementations decide framing, timeouts and concurrency. They must return
/// [`ChannelError::Engine`] when the engine itself rejected the command and
/// [`ChannelError::Transport`] when no engine answer was obtained.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Sends `command` and waits for the engine's answer.
    async fn invoke(&self, command: Command) -> Result<JsonValue, ChannelError>;
}
