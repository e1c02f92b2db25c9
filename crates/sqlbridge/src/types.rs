//! Shared value types: bind parameters, mutation results and rows.
//!
//! None of these types interpret SQL values. Parameters and cells are
//! [`serde_json::Value`]s that travel to and from the engine untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// Bind parameters
// ---------------------------------------------------------------------------

/// Ordered positional bind parameters for one statement.
///
/// Defaults to the empty sequence. Serializes as a JSON array in every case,
/// so the engine always receives a well-formed (possibly empty) list and never
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindValues(Vec<JsonValue>);

impl BindValues {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value, converting it into JSON.
    #[must_use]
    pub fn with(mut self, value: impl Into<JsonValue>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the parameters in positional order.
    pub fn as_slice(&self) -> &[JsonValue] {
        &self.0
    }

    /// Consumes the list, returning the raw values.
    pub fn into_inner(self) -> Vec<JsonValue> {
        self.0
    }
}

impl From<Vec<JsonValue>> for BindValues {
    fn from(values: Vec<JsonValue>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[JsonValue; N]> for BindValues {
    fn from(values: [JsonValue; N]) -> Self {
        Self(values.into())
    }
}

impl FromIterator<JsonValue> for BindValues {
    fn from_iter<I: IntoIterator<Item = JsonValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Query outcomes
// ---------------------------------------------------------------------------

/// Outcome of a non-selecting statement.
///
/// `last_insert_id` is exactly what the engine reported. Engines without an
/// implicit identity return (Postgres, MSSQL) report `0`; callers that need a
/// generated key there should use a `RETURNING` clause through `select`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// Number of rows changed by the statement.
    pub rows_affected: u64,
    /// Last generated row identifier, or `0` when the engine has none.
    pub last_insert_id: LastInsertId,
}

/// Last generated row identifier as the engine reported it.
///
/// SQLite row ids are signed; MySQL `BIGINT UNSIGNED` auto-increment keys
/// can exceed `i64::MAX`. Values that fit in `i64` are always `Signed`, so
/// equal numbers compare equal regardless of which engine sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastInsertId {
    /// Any value in `i64` range.
    Signed(i64),
    /// A value above `i64::MAX`.
    Unsigned(u64),
}

impl LastInsertId {
    /// Returns the id as `i64`, if it fits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Signed(id) => Some(id),
            Self::Unsigned(id) => i64::try_from(id).ok(),
        }
    }

    /// Returns the id as `u64`, if it is non-negative.
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Self::Signed(id) => u64::try_from(id).ok(),
            Self::Unsigned(id) => Some(id),
        }
    }
}

impl Default for LastInsertId {
    fn default() -> Self {
        Self::Signed(0)
    }
}

impl From<i64> for LastInsertId {
    fn from(id: i64) -> Self {
        Self::Signed(id)
    }
}

impl From<u64> for LastInsertId {
    fn from(id: u64) -> Self {
        i64::try_from(id).map_or(Self::Unsigned(id), Self::Signed)
    }
}

impl std::fmt::Display for LastInsertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signed(id) => write!(f, "{id}"),
            Self::Unsigned(id) => write!(f, "{id}"),
        }
    }
}

/// One row of a row set, keyed by column name in engine column order.
pub type Row = IndexMap<String, JsonValue>;
