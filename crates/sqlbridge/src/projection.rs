//! Projects the engine's generic row-set value into the caller's type.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{Row, SqlError};

/// Decodes `rows` into `T`.
///
/// Any `T: DeserializeOwned` works, from `Vec<Row>` to a caller's own record
/// struct. A value that does not fit is reported as
/// [`SqlError::SchemaMismatch`], never coerced.
pub fn project<T: DeserializeOwned>(rows: JsonValue) -> Result<T, SqlError> {
    serde_json::from_value(rows).map_err(|err| SqlError::SchemaMismatch {
        expected: std::any::type_name::<T>(),
        message: err.to_string(),
    })
}

/// Decodes `rows` into the default shape: a list of column-ordered maps.
pub fn project_rows(rows: JsonValue) -> Result<Vec<Row>, SqlError> {
    project(rows)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Todo {
        id: i64,
        title: String,
        completed: bool,
    }

    #[test]
    fn projects_into_caller_struct() {
        let todos: Vec<Todo> =
            project(json!([{ "id": 5, "title": "walk the dog", "completed": false }])).unwrap();
        assert_eq!(
            todos,
            vec![Todo {
                id: 5,
                title: "walk the dog".into(),
                completed: false
            }]
        );
    }

    #[test]
    fn rows_keep_column_order() {
        let rows = project_rows(json!([{ "z": 1, "a": 2, "m": null }])).unwrap();
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(columns, ["z", "a", "m"]);
    }

    #[test]
    fn mismatch_is_typed_error() {
        let err = project::<Vec<Todo>>(json!([{ "id": "five" }])).unwrap_err();
        assert!(matches!(err, SqlError::SchemaMismatch { .. }));
        assert!(err.is_execution_failure());
    }
}
