//! Value and field-map types shared by every operation.
//!
//! Callers never hand this layer a schema: writes supply an ordered map of
//! column names to [`DbValue`]s, reads supply an ordered map of column names
//! to [`FieldSlot`] destinations. Iteration order is insertion order, so a
//! column and its positional placeholder are always generated together.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::DbError;

/// A value written to or read from a database column.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value (stored as 0/1)
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value (stored as text)
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let DbValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Bool(value) => Some(*value),
            DbValue::Int(0) => Some(false),
            DbValue::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            DbValue::Timestamp(value) => Some(*value),
            DbValue::Text(s) => {
                // Try "YYYY-MM-DD HH:MM:SS"
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                    return Some(dt);
                }
                // Try "YYYY-MM-DD HH:MM:SS.SSS"
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DbValue::Float(value) => Some(*value),
            DbValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DbValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            DbValue::Int(_) => "integer",
            DbValue::Float(_) => "float",
            DbValue::Text(_) => "text",
            DbValue::Bool(_) => "boolean",
            DbValue::Timestamp(_) => "timestamp",
            DbValue::Null => "null",
            DbValue::Json(_) => "json",
            DbValue::Blob(_) => "blob",
        }
    }

    /// Bind this value as a SQLite parameter.
    pub(crate) fn to_sql(&self) -> rusqlite::types::Value {
        match self {
            DbValue::Int(i) => rusqlite::types::Value::Integer(*i),
            DbValue::Float(f) => rusqlite::types::Value::Real(*f),
            DbValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
            DbValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            DbValue::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                rusqlite::types::Value::Text(formatted)
            }
            DbValue::Null => rusqlite::types::Value::Null,
            DbValue::Json(value) => rusqlite::types::Value::Text(value.to_string()),
            DbValue::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
        }
    }

    pub(crate) fn from_sql(value: rusqlite::types::ValueRef<'_>) -> DbValue {
        match value {
            rusqlite::types::ValueRef::Null => DbValue::Null,
            rusqlite::types::ValueRef::Integer(i) => DbValue::Int(i),
            rusqlite::types::ValueRef::Real(f) => DbValue::Float(f),
            rusqlite::types::ValueRef::Text(t) => {
                DbValue::Text(String::from_utf8_lossy(t).into_owned())
            }
            rusqlite::types::ValueRef::Blob(b) => DbValue::Blob(b.to_vec()),
        }
    }
}

pub(crate) fn to_sql_vec(params: &[DbValue]) -> Vec<rusqlite::types::Value> {
    params.iter().map(DbValue::to_sql).collect()
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Int(i64::from(value))
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        DbValue::Timestamp(value)
    }
}

impl From<JsonValue> for DbValue {
    fn from(value: JsonValue) -> Self {
        DbValue::Json(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Blob(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DbValue::Null,
        }
    }
}

/// An ordered column-name-to-value map for insert/update operations.
///
/// Keys are unique; setting a column twice replaces the earlier value while
/// keeping its original position.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    entries: Vec<(String, DbValue)>,
}

impl FieldValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column value, chainable.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        let column = column.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = value;
        } else {
            self.entries.push((column, value));
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// A typed destination for one column of a fetched row.
///
/// The set of destination kinds is closed: a read either lands in one of
/// these slots or fails with a binding error before the caller sees the row.
#[derive(Debug)]
pub enum FieldSlot<'a> {
    Int(&'a mut i64),
    OptInt(&'a mut Option<i64>),
    Float(&'a mut f64),
    Bool(&'a mut bool),
    Text(&'a mut String),
    OptText(&'a mut Option<String>),
    Timestamp(&'a mut NaiveDateTime),
    Json(&'a mut JsonValue),
    Blob(&'a mut Vec<u8>),
}

impl FieldSlot<'_> {
    fn expected(&self) -> &'static str {
        match self {
            FieldSlot::Int(_) => "integer",
            FieldSlot::OptInt(_) => "optional integer",
            FieldSlot::Float(_) => "float",
            FieldSlot::Bool(_) => "boolean",
            FieldSlot::Text(_) => "text",
            FieldSlot::OptText(_) => "optional text",
            FieldSlot::Timestamp(_) => "timestamp",
            FieldSlot::Json(_) => "json",
            FieldSlot::Blob(_) => "blob",
        }
    }

    fn assign(&mut self, column: &str, value: DbValue) -> Result<(), DbError> {
        let expected = self.expected();
        let mismatch = |found: &DbValue| DbError::Binding {
            column: column.to_string(),
            expected,
            found: found.kind_name(),
        };

        match self {
            FieldSlot::Int(dest) => match value.as_int() {
                Some(i) => **dest = i,
                None => return Err(mismatch(&value)),
            },
            FieldSlot::OptInt(dest) => match &value {
                DbValue::Null => **dest = None,
                _ => match value.as_int() {
                    Some(i) => **dest = Some(i),
                    None => return Err(mismatch(&value)),
                },
            },
            FieldSlot::Float(dest) => match value.as_float() {
                Some(f) => **dest = f,
                None => return Err(mismatch(&value)),
            },
            FieldSlot::Bool(dest) => match value.as_bool() {
                Some(b) => **dest = b,
                None => return Err(mismatch(&value)),
            },
            FieldSlot::Text(dest) => match value {
                DbValue::Text(s) => **dest = s,
                other => return Err(mismatch(&other)),
            },
            FieldSlot::OptText(dest) => match value {
                DbValue::Null => **dest = None,
                DbValue::Text(s) => **dest = Some(s),
                other => return Err(mismatch(&other)),
            },
            FieldSlot::Timestamp(dest) => match value.as_timestamp() {
                Some(dt) => **dest = dt,
                None => return Err(mismatch(&value)),
            },
            FieldSlot::Json(dest) => match &value {
                DbValue::Json(j) => **dest = j.clone(),
                DbValue::Text(s) => match serde_json::from_str(s) {
                    Ok(j) => **dest = j,
                    Err(_) => return Err(mismatch(&value)),
                },
                _ => return Err(mismatch(&value)),
            },
            FieldSlot::Blob(dest) => match value {
                DbValue::Blob(b) => **dest = b,
                other => return Err(mismatch(&other)),
            },
        }
        Ok(())
    }
}

/// An ordered column-name-to-destination map for row fetches.
///
/// Destinations are assigned positionally in insertion order, mirroring how
/// the projection and placeholders were generated.
#[derive(Debug, Default)]
pub struct FieldBindings<'a> {
    entries: Vec<(String, FieldSlot<'a>)>,
}

impl<'a> FieldBindings<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add or replace a destination for a column.
    pub fn bind(&mut self, column: impl Into<String>, slot: FieldSlot<'a>) -> &mut Self {
        let column = column.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = slot;
        } else {
            self.entries.push((column, slot));
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn columns(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Assign fetched values into the destinations, positionally.
    pub(crate) fn assign(mut self, values: Vec<DbValue>) -> Result<(), DbError> {
        if values.len() != self.entries.len() {
            return Err(DbError::Unhandled(format!(
                "fetched {} values for {} destinations",
                values.len(),
                self.entries.len()
            )));
        }
        for ((column, slot), value) in self.entries.iter_mut().zip(values) {
            slot.assign(column, value)?;
        }
        Ok(())
    }
}
