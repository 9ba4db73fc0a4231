//! Types and traits for recording training metrics.
//!
//! * [`Record`] - A container of key-value pairs of various data types
//! * [`RecordValue`] - Values that can be stored in a [`Record`]
//! * [`Recorder`] and [`AggregateRecorder`] - Destinations of records
//! * [`RecordStorage`] - Aggregates scalars stored between two flushes
//! * [`BufferedRecorder`] - Keeps records in memory
//! * [`NullRecorder`] - Discards all records
//!
//! ```rust
//! use reinforce_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("episode_return", 21.0);
//! record.insert("episode_length", RecordValue::Scalar(21.0));
//! assert_eq!(record.get_scalar("episode_return").unwrap(), 21.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
