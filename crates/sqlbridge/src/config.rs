//! Host configuration: identifiers to connect eagerly at startup.

use std::sync::Arc;

use serde::Deserialize;

use crate::{CommandChannel, ConnectionId, Database, Result, SqlError};

/// Client configuration, usually read from the host's JSON config.
///
/// ```json
/// { "preload": ["sqlite:app.db", "postgres://app@localhost/app"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identifiers to load eagerly, in order.
    pub preload: Vec<String>,
}

impl ClientConfig {
    /// Parses a configuration document. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parses an already-decoded JSON value; `null` yields the default.
    pub fn from_json_value(
        value: serde_json::Value,
    ) -> std::result::Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }
}

/// Eagerly loads every identifier in `config.preload`, in order.
///
/// Stops at the first failure, which is reported as
/// [`SqlError::Connection`] for that identifier. Handles already loaded are
/// dropped; their engine-side connections stay open until closed.
pub async fn preload_all<C>(channel: Arc<C>, config: &ClientConfig) -> Result<Vec<Database<C>>>
where
    C: CommandChannel + ?Sized,
{
    let mut handles = Vec::with_capacity(config.preload.len());
    for raw in &config.preload {
        let db = ConnectionId::new(raw.as_str()).ok_or_else(|| SqlError::Connection {
            db: raw.clone(),
            message: "identifier is empty".into(),
        })?;
        tracing::info!(db = %db, "preloading database");
        handles.push(Database::load(Arc::clone(&channel), db).await?);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_preload_defaults_to_empty() {
        assert_eq!(ClientConfig::from_json_str("{}").unwrap(), ClientConfig::default());
        assert_eq!(
            ClientConfig::from_json_value(serde_json::Value::Null).unwrap(),
            ClientConfig::default()
        );
    }

    #[test]
    fn parses_preload_list() {
        let config =
            ClientConfig::from_json_str(r#"{ "preload": ["sqlite:a.db", "sqlite:b.db"] }"#).unwrap();
        assert_eq!(config.preload, ["sqlite:a.db", "sqlite:b.db"]);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ClientConfig::from_json_str(r#"{ "preload": "sqlite:a.db" }"#).is_err());
    }
}
