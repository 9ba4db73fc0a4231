//! Base implementation of records for logging.
use crate::error::ReinforceError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics like loss or return.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

}

/// A container for storing key-value pairs of various data types.
///
/// ```rust
/// use reinforce_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("loss", 0.5);
/// record.insert("datetime", RecordValue::DateTime(chrono::Local::now()));
///
/// assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
/// assert!(record.get_scalar("datetime").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from `record` wins.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    fn get_with<T>(
        &self,
        k: &str,
        type_name: &str,
        f: impl FnOnce(&RecordValue) -> Option<T>,
    ) -> Result<T, ReinforceError> {
        let v = self
            .0
            .get(k)
            .ok_or_else(|| ReinforceError::RecordKeyError(k.to_string()))?;
        f(v).ok_or_else(|| ReinforceError::RecordValueTypeError(type_name.to_string()))
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, ReinforceError> {
        self.get_with(k, "Scalar", |v| match v {
            RecordValue::Scalar(v) => Some(*v),
            _ => None,
        })
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the scalar value of a record holding exactly one scalar.
    pub fn get_scalar_without_key(&self) -> Option<f32> {
        if self.0.len() != 1 {
            return None;
        }
        match self.0.values().next() {
            Some(RecordValue::Scalar(value)) => Some(*value),
            _ => None,
        }
    }
}
