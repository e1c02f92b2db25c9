//! Newtype identifiers.
//!
//! A connection identifier and a per-dispatch correlation id are both plain
//! strings or UUIDs underneath; wrapping them keeps an SQL text from ever being
//! passed where an identifier is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Names a logical database connection target, e.g. `"sqlite:test.db"` or
    /// `"postgres://user:pw@localhost/app"`.
    ///
    /// The string is opaque to this crate. The engine behind the channel
    /// decides whether it is acceptable and may hand back a canonical form on
    /// `load`.
    ConnectionId
}

impl ConnectionId {
    /// Returns the engine marker in front of the first `:`, if any.
    ///
    /// Informational only: used for log fields, never for validation.
    pub fn scheme(&self) -> Option<&str> {
        self.0
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one command dispatch (one round trip over the channel).
///
/// Generated fresh for every dispatch and recorded on the tracing span so the
/// request and its outcome can be correlated in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Generates a new random command identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_rejects_empty() {
        assert!(ConnectionId::new("").is_none());
        assert_eq!(
            ConnectionId::new("sqlite:test.db").map(|id| id.to_string()),
            Some("sqlite:test.db".to_string())
        );
    }

    #[test]
    fn scheme_is_prefix_before_first_colon() {
        let id = ConnectionId::new("mysql://root:pw@localhost:3306/app").unwrap();
        assert_eq!(id.scheme(), Some("mysql"));

        let id = ConnectionId::new("sqlite:data/app.db").unwrap();
        assert_eq!(id.scheme(), Some("sqlite"));

        assert_eq!(ConnectionId::new("no-scheme").unwrap().scheme(), None);
        assert_eq!(ConnectionId::new(":memory").unwrap().scheme(), None);
    }

    #[test]
    fn connection_id_serializes_as_plain_string() {
        let id = ConnectionId::new("sqlite:test.db").unwrap();
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            serde_json::json!("sqlite:test.db")
        );
    }

    #[test]
    fn command_ids_are_unique() {
        assert_ne!(CommandId::new_random(), CommandId::new_random());
    }
}
