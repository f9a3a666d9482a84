//! Destinations for records that survive the filter chain.

use super::record::LogRecord;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Receives finished records
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn emit(&self, record: &LogRecord) {
        (**self).emit(record)
    }
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn emit(&self, record: &LogRecord) {
        (**self).emit(record)
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&self, record: &LogRecord) {
        let mut writer = self.writer.lock();
        // A failing log destination must not take the caller down with it.
        let _ = writeln!(writer, "{}", record.to_json());
        let _ = writer.flush();
    }
}

/// Writes human-readable lines
pub struct TextSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> RecordSink for TextSink<W> {
    fn emit(&self, record: &LogRecord) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", record);
        let _ = writer.flush();
    }
}
