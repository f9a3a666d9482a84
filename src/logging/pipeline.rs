//! Tracing layer that runs events through the record filter chain.

use super::adapter::LogContextAdapter;
use super::filter::RecordFilter;
use super::record::LogRecord;
use super::sink::RecordSink;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Layer turning tracing events into [`LogRecord`]s
///
/// Every event that reaches the layer becomes a record, passes through the
/// filters in insertion order, and is emitted to the sink if no filter
/// rejected it. A rejecting filter short-circuits the chain, so adapters
/// placed after it never annotate suppressed records.
pub struct ContextLayer {
    filters: Vec<Box<dyn RecordFilter>>,
    sink: Box<dyn RecordSink>,
}

impl ContextLayer {
    pub fn new(sink: impl RecordSink + 'static) -> Self {
        Self {
            filters: Vec::new(),
            sink: Box::new(sink),
        }
    }

    /// Append a filter to the chain
    pub fn with_filter(mut self, filter: impl RecordFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Append a context adapter to the chain
    pub fn with_adapter(self, adapter: LogContextAdapter) -> Self {
        self.with_filter(adapter)
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Run one record through the chain and emit it if it survives
    pub fn process(&self, mut record: LogRecord) -> bool {
        for filter in &self.filters {
            if !filter.filter(&mut record) {
                return false;
            }
        }
        self.sink.emit(&record);
        true
    }
}

impl<S> Layer<S> for ContextLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.process(LogRecord::from_event(event));
    }
}
