//! # Row Values
//!
//! Dynamically typed cells returned by the SQL execution endpoint.
//!
//! The endpoint answers with JSON objects whose columns are only known at
//! runtime. Instead of passing `serde_json::Value` around, every cell is
//! lifted into [`RowValue`], a small tagged union that the result
//! post-processor can match exhaustively when filtering and sorting.
//!
//! ## Usage
//!
//! ```rust
//! use querybench::value::{Row, RowValue};
//!
//! let row = Row::from_json(serde_json::json!({"id": 1, "name": "alpha"})).unwrap();
//! assert_eq!(row.get("name"), Some(&RowValue::String("alpha".into())));
//! assert!(row.get("missing").is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Arrays and objects (json/jsonb columns, arrays, composite types)
    Json(serde_json::Value),
}

impl RowValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RowValue::Null)
    }

    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RowValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// String form used for substring filtering and mixed-type comparison.
    /// Returns `None` for nulls so callers can treat them separately.
    pub fn display_text(&self) -> Option<String> {
        match self {
            RowValue::Null => None,
            RowValue::Bool(b) => Some(b.to_string()),
            RowValue::Number(n) => Some(n.to_string()),
            RowValue::String(s) => Some(s.clone()),
            RowValue::Json(v) => Some(v.to_string()),
        }
    }
}

impl From<serde_json::Value> for RowValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RowValue::Null,
            serde_json::Value::Bool(b) => RowValue::Bool(b),
            serde_json::Value::Number(n) => RowValue::Number(n),
            serde_json::Value::String(s) => RowValue::String(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                RowValue::Json(other)
            }
        }
    }
}

impl From<&str> for RowValue {
    fn from(s: &str) -> Self {
        RowValue::String(s.to_string())
    }
}

impl From<i64> for RowValue {
    fn from(n: i64) -> Self {
        RowValue::Number(n.into())
    }
}

impl From<i32> for RowValue {
    fn from(n: i32) -> Self {
        RowValue::Number(n.into())
    }
}

impl From<bool> for RowValue {
    fn from(b: bool) -> Self {
        RowValue::Bool(b)
    }
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_text() {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "NULL"),
        }
    }
}

/// One record of a rowset: an ordered mapping from column name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, RowValue)>,
}

impl Row {
    pub fn new() -> Self {
        Row { fields: Vec::new() }
    }

    /// Build a row from a JSON object, keeping the column order of the payload.
    /// Returns `None` if the value is not an object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Row {
                fields: map.into_iter().map(|(k, v)| (k, RowValue::from(v))).collect(),
            }),
            _ => None,
        }
    }

    /// Builder-style column append
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RowValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing an existing value in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RowValue>) {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == column) {
            slot.1 = value;
        } else {
            self.fields.push((column, value));
        }
    }

    pub fn get(&self, column: &str) -> Option<&RowValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Row {
            fields: map.into_iter().map(|(k, v)| (k, RowValue::from(v))).collect(),
        })
    }
}

/// Ordered sequence of records returned by a successful execution
pub type Rowset = Vec<Row>;
