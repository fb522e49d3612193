//! Source records
//!
//! This module defines:
//! - Record: an immutable mapping from field name to value, representing one
//!   fetched aggregate row
//!
//! Records are handed in by the persistence collaborator, one per result row.
//! The engine never mutates a record; every projection reads from it and
//! snapshots what it needs. A field whose value is an `Object` is a nested
//! source record (e.g. an address embedded in a person).

use crate::path::{FieldPath, PathSegment};
use crate::value::Value;
use crate::{ProjectionError, ProjectionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fetched aggregate row: an immutable field-name-to-value mapping
///
/// Fields are stored in a `BTreeMap` so iteration order is deterministic,
/// which keeps plan resolution referentially transparent: the same record
/// resolved against the same shape always yields an identical plan.
///
/// A record may carry a *pruned* marker, set by the persistence layer when it
/// honored a closed-projection fetch hint and retrieved only a subset of the
/// aggregate's fields. The marker is purely informational; resolution
/// semantics do not change for pruned records.
///
/// # Examples
///
/// ```
/// use prism_core::{Record, Value};
///
/// let record = Record::new()
///     .with("firstname", "Oliver")
///     .with("lastname", "Matthews");
///
/// assert_eq!(record.get("firstname"), Some(&Value::String("Oliver".into())));
/// assert!(record.contains("lastname"));
/// assert_eq!(record.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
    pruned: bool,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Record {
            fields: BTreeMap::new(),
            pruned: false,
        }
    }

    /// Create a record from an iterator of field name/value pairs
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Record {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            pruned: false,
        }
    }

    /// Create a record marked as fetched under a field-subsetting hint
    ///
    /// The persistence layer uses this constructor when a closed projection's
    /// fetch hint was honored and only the named fields were retrieved.
    pub fn pruned<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Record {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            pruned: true,
        }
    }

    /// Add a field (builder pattern)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Whether this record was fetched under a field-subsetting hint
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    /// Get a top-level field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether the record declares a top-level field with this name
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The record's declared field names, in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over the record's fields in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Walk a field path into the record
    ///
    /// Descends segment by segment: field segments enter objects, index
    /// segments enter arrays. Returns `None` as soon as any segment fails to
    /// resolve (missing field, out-of-range index, or a scalar where a
    /// container was expected).
    ///
    /// # Examples
    ///
    /// ```
    /// use prism_core::{FieldPath, Record, Value};
    /// use std::collections::BTreeMap;
    ///
    /// let record = Record::new().with(
    ///     "address",
    ///     Value::Object(BTreeMap::from([(
    ///         "city".to_string(),
    ///         Value::String("Berlin".into()),
    ///     )])),
    /// );
    ///
    /// let path: FieldPath = "address.city".parse().unwrap();
    /// assert_eq!(record.at(&path), Some(&Value::String("Berlin".into())));
    /// ```
    pub fn at(&self, path: &FieldPath) -> Option<&Value> {
        let mut segments = path.segments().iter();

        // A path roots at a record field, never at an index
        let mut current = match segments.next()? {
            PathSegment::Field(name) => self.fields.get(name)?,
            PathSegment::Index(_) => return None,
        };

        for segment in segments {
            current = match (segment, current) {
                (PathSegment::Field(name), Value::Object(obj)) => obj.get(name)?,
                (PathSegment::Index(i), Value::Array(arr)) => arr.get(*i)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Snapshot the record as an `Object` value
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Record {
            fields,
            pruned: false,
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = ProjectionError;

    /// Convert an `Object` value into a record
    ///
    /// Used at nesting boundaries: a field holding an `Object` is the source
    /// record of a nested shape. Any other variant is a type mismatch.
    fn try_from(value: Value) -> ProjectionResult<Self> {
        let type_name = value.type_name();
        match value {
            Value::Object(fields) => Ok(Record {
                fields,
                pruned: false,
            }),
            _ => Err(ProjectionError::wrong_type("Object", type_name)),
        }
    }
}
