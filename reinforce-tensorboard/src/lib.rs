//! Recorder writing training metrics as TFRecord for Tensorboard.
use log::warn;
use reinforce_core::record::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    storage: RecordStorage,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`. The step of each record is taken
    /// from its `"episode"` value.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: "episode".to_string(),
            storage: RecordStorage::new(),
        }
    }

    /// Sets the key of the step value in records.
    pub fn step_key(mut self, v: impl Into<String>) -> Self {
        self.step_key = v.into();
        self
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    ///
    /// Only [`RecordValue::Scalar`] values are written, timestamps are
    /// discarded. Records without the step value are skipped.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Skip a record without scalar {:?}", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::DateTime(_) => {}
            }
        }
    }
}

impl AggregateRecorder for TensorboardRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        if record.is_empty() {
            return;
        }
        record.insert(self.step_key.clone(), RecordValue::Scalar(step as _));
        self.write(record);
        self.writer.flush();
    }
}
