use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Wire format for every timestamp that leaves this crate (`YYYY-MM-DD HH:MM:SS`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// One scalar cell as returned by either store.
///
/// Timestamps are naive: the analytics warehouse and the LMS database are
/// compared wall-clock to wall-clock, and the gateway normalizes any
/// timezone-aware column to UTC before it gets here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

/// Textual form. This is what the canonicalizer keys on and what the
/// exporter writes, so `Int(42)` and `Text("42")` must render identically.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Why a record could not be read the way a stage expected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordError {
    MissingField {
        column: String,
    },
    NullField {
        column: String,
    },
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { column } => write!(f, "record has no column '{column}'"),
            Self::NullField { column } => write!(f, "record column '{column}' is null"),
            Self::TypeMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "record column '{column}' expected {expected}, found {found}"
            ),
        }
    }
}

impl std::error::Error for RecordError {}

/// One row from either store: column name -> scalar.
///
/// Built once by the gateway (or a fixture) and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: returns the record with `column` set.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Present and non-null.
    pub fn require(&self, column: &str) -> Result<&Value, RecordError> {
        match self.fields.get(column) {
            None => Err(RecordError::MissingField {
                column: column.to_string(),
            }),
            Some(Value::Null) => Err(RecordError::NullField {
                column: column.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }

    /// Textual form of a present column; null renders as the empty string.
    pub fn display(&self, column: &str) -> Result<String, RecordError> {
        self.fields
            .get(column)
            .map(|v| v.to_string())
            .ok_or_else(|| RecordError::MissingField {
                column: column.to_string(),
            })
    }

    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime, RecordError> {
        match self.require(column)? {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(RecordError::TypeMismatch {
                column: column.to_string(),
                expected: "timestamp",
                found: other.kind(),
            }),
        }
    }

    /// Tri-state flag: null is `None`; MySQL `TINYINT` 0/1 is accepted as a bool.
    pub fn flag(&self, column: &str) -> Result<Option<bool>, RecordError> {
        match self.fields.get(column) {
            None => Err(RecordError::MissingField {
                column: column.to_string(),
            }),
            Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::Int(n)) => Ok(Some(*n != 0)),
            Some(other) => Err(RecordError::TypeMismatch {
                column: column.to_string(),
                expected: "bool",
                found: other.kind(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys, groups, populations
// ---------------------------------------------------------------------------

/// Canonical cross-store learner identifier. Only [`crate::canonicalize`] mints these.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub(crate) fn new(raw: String) -> Self {
        Self(raw)
    }

    /// Convenience for callers holding a native id: `UserKey::from_raw(7)`.
    pub fn from_raw(raw: impl Into<Value>) -> Self {
        crate::canonicalize(&raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records grouped by learner. Order within a group is source query order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LearnerGroup {
    groups: BTreeMap<UserKey, Vec<Record>>,
}

impl LearnerGroup {
    pub(crate) fn from_map(groups: BTreeMap<UserKey, Vec<Record>>) -> Self {
        Self { groups }
    }

    pub fn get(&self, key: &UserKey) -> Option<&[Record]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn first(&self, key: &UserKey) -> Option<&Record> {
        self.groups.get(key).and_then(|records| records.first())
    }

    pub fn contains(&self, key: &UserKey) -> bool {
        self.groups.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &UserKey> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserKey, &[Record])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of learners.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records across all learners.
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn population(&self, name: &'static str) -> Population {
        Population::new(name, self.groups.keys().cloned())
    }

    /// New group holding only learners that are members of `population`.
    pub fn restrict_to(&self, population: &Population) -> LearnerGroup {
        Self {
            groups: self
                .groups
                .iter()
                .filter(|(k, _)| population.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// A named set of learners still under investigation at some stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Population {
    name: &'static str,
    keys: BTreeSet<UserKey>,
}

impl Population {
    pub fn new(name: &'static str, keys: impl IntoIterator<Item = UserKey>) -> Self {
        Self {
            name,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn empty(name: &'static str) -> Self {
        Self::new(name, std::iter::empty())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn keys(&self) -> &BTreeSet<UserKey> {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &UserKey) -> bool {
        self.keys.contains(key)
    }

    /// Ascending key order.
    pub fn to_vec(&self) -> Vec<UserKey> {
        self.keys.iter().cloned().collect()
    }

    pub fn difference(&self, other: &Population, name: &'static str) -> Population {
        Self::new(name, self.keys.difference(&other.keys).cloned())
    }

    pub fn intersection(&self, other: &Population, name: &'static str) -> Population {
        Self::new(name, self.keys.intersection(&other.keys).cloned())
    }

    pub fn is_subset(&self, other: &Population) -> bool {
        self.keys.is_subset(&other.keys)
    }

    pub fn is_disjoint(&self, other: &Population) -> bool {
        self.keys.is_disjoint(&other.keys)
    }
}
