//! Record filter chain.

use super::record::LogRecord;
use tracing::Level;

/// One stage of the record filter chain
///
/// Returns `false` to drop the record; later filters then never see it.
/// Filters may annotate the record in place.
pub trait RecordFilter: Send + Sync {
    fn filter(&self, record: &mut LogRecord) -> bool;
}

impl<F> RecordFilter for F
where
    F: Fn(&mut LogRecord) -> bool + Send + Sync,
{
    fn filter(&self, record: &mut LogRecord) -> bool {
        self(record)
    }
}

/// Drops records less severe than a threshold
#[derive(Debug, Clone, Copy)]
pub struct LevelThreshold {
    max: Level,
}

impl LevelThreshold {
    /// Keep records at `max` or more severe (`Level::WARN` keeps WARN and ERROR)
    pub fn new(max: Level) -> Self {
        Self { max }
    }
}

impl RecordFilter for LevelThreshold {
    fn filter(&self, record: &mut LogRecord) -> bool {
        record.level <= self.max
    }
}
