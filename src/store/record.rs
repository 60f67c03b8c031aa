//! Records and field values
//!
//! A record is an ordered tuple of values matching the schema's canonical
//! field order. The same value travels positionally to the relational store
//! and, zipped with the field names, to the document store.

use chrono::{SecondsFormat, Utc};
use mongodb::bson::Bson;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// A single field value for either backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Real(f64),
    Integer(i64),
}

impl FieldValue {
    /// Current UTC time as an RFC 3339 text value, for `insert_timestamp`.
    pub fn now() -> Self {
        FieldValue::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Real(f)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(f) => FieldValue::Real(f),
            None => FieldValue::Null,
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            FieldValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
        })
    }
}

impl From<&FieldValue> for Bson {
    fn from(value: &FieldValue) -> Bson {
        match value {
            FieldValue::Null => Bson::Null,
            FieldValue::Text(s) => Bson::String(s.clone()),
            FieldValue::Real(f) => Bson::Double(*f),
            FieldValue::Integer(i) => Bson::Int64(*i),
        }
    }
}

/// An ordered tuple of field values; the unit of a single write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record(Vec<FieldValue>);

impl Record {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Record(values)
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FieldValue>> for Record {
    fn from(values: Vec<FieldValue>) -> Self {
        Record(values)
    }
}

/// Normalized row shape returned by `find`, identical for both backends.
pub type RecordMap = serde_json::Map<String, serde_json::Value>;

/// Outcome of a single insert against one backend. Errors are captured here
/// instead of propagating, so callers can assert on outcomes.
#[derive(Debug)]
pub enum WriteOutcome {
    Inserted,
    DuplicateKey,
    Error(StoreError),
}

impl WriteOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, WriteOutcome::Inserted)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, WriteOutcome::DuplicateKey)
    }
}

/// Per-backend outcomes of one fanned-out insert. The two sides are
/// independent; no cross-backend transaction exists.
#[derive(Debug)]
pub struct WriteReport {
    pub relational: WriteOutcome,
    /// `None` when the document backend is not active.
    pub document: Option<WriteOutcome>,
}

/// Outcome of a batch insert against one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub success: bool,
}

/// Per-backend outcomes of one fanned-out batch insert. The relational side
/// is all-or-nothing; the document side is an unordered bulk write.
#[derive(Debug)]
pub struct BatchReport {
    pub relational: BatchOutcome,
    pub document: Option<BatchOutcome>,
}
