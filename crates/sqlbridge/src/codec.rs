//! Builds outbound [`Command`]s and decodes the engine's answers.
//!
//! Decoding is strict about shape and loose about content: an `execute`
//! answer must be a two-element integer array, but whatever integers the
//! engine put there are returned as-is.

use serde_json::Value as JsonValue;

use crate::{BindValues, Command, ConnectionId, LastInsertId, MutationResult, SqlError};

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// `load` for `db`.
pub fn load(db: &ConnectionId) -> Command {
    Command::Load { db: db.clone() }
}

/// `execute` for `db`. `None` parameters encode as an empty list.
pub fn execute(db: &ConnectionId, query: &str, values: Option<BindValues>) -> Command {
    Command::Execute {
        db: db.clone(),
        query: query.to_owned(),
        values: values.unwrap_or_default(),
    }
}

/// `select` for `db`. `None` parameters encode as an empty list.
pub fn select(db: &ConnectionId, query: &str, values: Option<BindValues>) -> Command {
    Command::Select {
        db: db.clone(),
        query: query.to_owned(),
        values: values.unwrap_or_default(),
    }
}

/// `close` for one identifier, or for all when `db` is `None`.
pub fn close(db: Option<&ConnectionId>) -> Command {
    Command::Close { db: db.cloned() }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes a `load` answer into the engine-confirmed identifier.
///
/// Anything but a non-empty string means the identifier was not confirmed,
/// which is a connection failure for `requested`.
pub fn decode_load(requested: &ConnectionId, response: JsonValue) -> Result<ConnectionId, SqlError> {
    let rejected = |message: String| SqlError::Connection {
        db: requested.to_string(),
        message,
    };
    match response {
        JsonValue::String(confirmed) => ConnectionId::new(confirmed)
            .ok_or_else(|| rejected("engine confirmed an empty identifier".into())),
        other => Err(rejected(format!(
            "malformed 'load' response: expected an identifier string, got {other}"
        ))),
    }
}

/// Decodes an `execute` answer `[rowsAffected, lastInsertId]`.
pub fn decode_execute(response: JsonValue) -> Result<MutationResult, SqlError> {
    let malformed = |detail: String| SqlError::Protocol {
        command: "execute",
        message: detail,
    };

    let pair = match response {
        JsonValue::Array(pair) => pair,
        other => {
            return Err(malformed(format!(
                "expected [rowsAffected, lastInsertId], got {other}"
            )))
        }
    };
    let [rows_affected, last_insert_id] = pair.as_slice() else {
        return Err(malformed(format!("expected 2 elements, got {}", pair.len())));
    };

    let rows_affected = rows_affected
        .as_u64()
        .ok_or_else(|| malformed(format!("rowsAffected is not a non-negative integer: {rows_affected}")))?;
    let last_insert_id = match (last_insert_id.as_i64(), last_insert_id.as_u64()) {
        (Some(id), _) => LastInsertId::Signed(id),
        (None, Some(id)) => LastInsertId::Unsigned(id),
        (None, None) => {
            return Err(malformed(format!(
                "lastInsertId is not an integer: {last_insert_id}"
            )))
        }
    };

    Ok(MutationResult {
        rows_affected,
        last_insert_id,
    })
}

/// Decodes a `select` answer. The value is forwarded unchanged.
pub fn decode_select(response: JsonValue) -> JsonValue {
    response
}

/// Decodes a `close` answer.
pub fn decode_close(response: JsonValue) -> Result<bool, SqlError> {
    response.as_bool().ok_or_else(|| SqlError::Protocol {
        command: "close",
        message: format!("expected a boolean, got {response}"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn db() -> ConnectionId {
        ConnectionId::new("sqlite:test.db").unwrap()
    }

    #[test]
    fn omitted_values_encode_as_empty_list() {
        assert_eq!(
            execute(&db(), "DELETE FROM todos", None),
            execute(&db(), "DELETE FROM todos", Some(BindValues::new()))
        );
        assert_eq!(
            select(&db(), "SELECT 1", None).payload().unwrap()["values"],
            json!([])
        );
    }

    #[test]
    fn execute_pair_decodes_in_order() {
        assert_eq!(
            decode_execute(json!([3, 7])).unwrap(),
            MutationResult {
                rows_affected: 3,
                last_insert_id: LastInsertId::Signed(7)
            }
        );
    }

    #[test]
    fn execute_keeps_full_last_insert_id_range() {
        assert_eq!(
            decode_execute(json!([0, -1])).unwrap().last_insert_id,
            LastInsertId::Signed(-1)
        );
        assert_eq!(
            decode_execute(json!([1, 9_223_372_036_854_775_808u64])).unwrap(),
            MutationResult {
                rows_affected: 1,
                last_insert_id: LastInsertId::Unsigned(9_223_372_036_854_775_808)
            }
        );
        assert_eq!(
            decode_execute(json!([1, u64::MAX])).unwrap().last_insert_id.as_u64(),
            Some(u64::MAX)
        );
    }

    #[test]
    fn malformed_execute_is_protocol_error() {
        for bad in [
            json!({"rowsAffected": 1}),
            json!([1]),
            json!([1, 2, 3]),
            json!([-1, 0]),
            json!(["1", 0]),
            json!([1, null]),
            json!([1, 1.5]),
        ] {
            let err = decode_execute(bad).unwrap_err();
            assert!(matches!(err, SqlError::Protocol { command: "execute", .. }));
        }
    }

    #[test]
    fn load_returns_confirmed_identifier() {
        let confirmed = decode_load(&db(), json!("sqlite:/app/config/test.db")).unwrap();
        assert_eq!(confirmed.as_str(), "sqlite:/app/config/test.db");

        assert!(decode_load(&db(), json!("")).unwrap_err().is_connection_failure());
    }

    #[test]
    fn malformed_load_answer_is_connection_failure() {
        for bad in [json!(42), json!(null), json!(["sqlite:test.db"])] {
            let err = decode_load(&db(), bad).unwrap_err();
            assert!(
                matches!(&err, SqlError::Connection { db, .. } if db == "sqlite:test.db"),
                "{err:?}"
            );
        }
    }

    #[test]
    fn select_is_passthrough() {
        let rows = json!([{ "id": 5, "title": "walk the dog", "completed": false }]);
        assert_eq!(decode_select(rows.clone()), rows);
    }

    #[test]
    fn close_requires_boolean() {
        assert!(decode_close(json!(true)).unwrap());
        assert!(!decode_close(json!(false)).unwrap());
        assert!(decode_close(json!("yes")).is_err());
    }
}
