//! Record storage and aggregation.
use super::{Record, RecordValue};
use log::warn;
use std::collections::HashSet;
use xxhash_rust::xxh3::Xxh3Builder;

/// Stores records and aggregates them.
///
/// Scalars stored more than once under the same key are summarized with
/// `_min`, `_max`, `_mean` and `_median` suffixed keys. For other value types,
/// the most recent value is kept.
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn min(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().copied().fold(f32::INFINITY, f32::min))
}

fn max(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().copied().fold(f32::NEG_INFINITY, f32::max))
}

fn mean(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().sum::<f32>() / vs.len() as f32)
}

fn median(mut vs: Vec<f32>) -> RecordValue {
    vs.sort_by(|x, y| x.total_cmp(y));
    RecordValue::Scalar(vs[vs.len() / 2])
}

impl RecordStorage {
    /// Creates a new empty record storage.
    pub fn new() -> Self {
        Self { data: vec![] }
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// The number of stored records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn get_keys(&self) -> HashSet<String, Xxh3Builder> {
        let mut keys = HashSet::<String, Xxh3Builder>::default();
        for record in self.data.iter() {
            keys.extend(record.keys().cloned());
        }
        keys
    }

    fn latest(&self, key: &str) -> Option<&RecordValue> {
        self.data.iter().rev().find_map(|record| record.get(key))
    }

    fn scalar(&self, key: &str) -> Record {
        let vs: Vec<f32> = self
            .data
            .iter()
            .filter_map(|record| match record.get(key) {
                Some(RecordValue::Scalar(v)) => Some(*v),
                Some(v) => {
                    warn!("Skip non-scalar value {:?} for {}", v, key);
                    None
                }
                None => None,
            })
            .collect();

        if vs.len() == 1 {
            Record::from_scalar(key, vs[0])
        } else {
            Record::from_slice(&[
                (format!("{}_min", key), min(&vs)),
                (format!("{}_max", key), max(&vs)),
                (format!("{}_mean", key), mean(&vs)),
                (format!("{}_median", key), median(vs)),
            ])
        }
    }

    /// Aggregates all stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.get_keys().iter() {
            match self.latest(key) {
                Some(RecordValue::Scalar(..)) => record.merge_inplace(self.scalar(key)),
                Some(value) => record.insert(key.clone(), value.clone()),
                None => {}
            }
        }

        self.data.clear();

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    #[test]
    fn test_aggregate_scalars() {
        let mut storage = RecordStorage::new();
        let now = Local::now();
        for (i, v) in [4.0f32, 1.0, 3.0].iter().enumerate() {
            let mut record = Record::from_scalar("episode_return", *v);
            record.insert(
                "datetime",
                RecordValue::DateTime(now + Duration::seconds(i as i64)),
            );
            storage.store(record);
        }
        storage.store(Record::from_scalar("eval_return", 10.0));

        let record = storage.aggregate();
        assert!(storage.is_empty());
        assert_eq!(record.get_scalar("episode_return_min").unwrap(), 1.0);
        assert_eq!(record.get_scalar("episode_return_max").unwrap(), 4.0);
        assert!((record.get_scalar("episode_return_mean").unwrap() - 8.0 / 3.0).abs() < 1e-6);
        assert_eq!(record.get_scalar("episode_return_median").unwrap(), 3.0);
        assert_eq!(record.get_scalar("eval_return").unwrap(), 10.0);
        assert_eq!(
            record.get("datetime"),
            Some(&RecordValue::DateTime(now + Duration::seconds(2)))
        );
    }

    #[test]
    fn test_aggregate_empty() {
        let mut storage = RecordStorage::new();
        assert!(storage.aggregate().is_empty());
    }
}
