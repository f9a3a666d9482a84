//! Attaches context snapshots to log records.

use super::filter::RecordFilter;
use super::record::LogRecord;
use crate::handle::ContextHandle;
use serde_json::Value;

/// Attribute name used when none is configured
pub const DEFAULT_ATTRIBUTE_NAME: &str = "Context";

/// Record filter that annotates each record with a handle's current context
///
/// Never drops a record. An empty context is attached only when
/// `include_empty` is set; otherwise the attribute is left out. With a
/// target prefix, only records from that target or its submodules are
/// annotated.
#[derive(Debug, Clone)]
pub struct LogContextAdapter {
    handle: ContextHandle,
    attribute_name: String,
    include_empty: bool,
    target_prefix: Option<String>,
}

impl LogContextAdapter {
    pub fn new(handle: ContextHandle) -> Self {
        Self {
            handle,
            attribute_name: DEFAULT_ATTRIBUTE_NAME.to_string(),
            include_empty: false,
            target_prefix: None,
        }
    }

    pub fn attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_name = name.into();
        self
    }

    pub fn include_empty(mut self, include_empty: bool) -> Self {
        self.include_empty = include_empty;
        self
    }

    /// Restrict annotation to `prefix` and targets below it (`prefix::...`)
    ///
    /// An empty prefix matches every target.
    pub fn target_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.target_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.attribute_name
    }

    /// Whether records from `target` are annotated
    pub fn matches_target(&self, target: &str) -> bool {
        match &self.target_prefix {
            None => true,
            Some(prefix) => target
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::")),
        }
    }

    /// Attach the current context to `record` if it qualifies
    pub fn annotate(&self, record: &mut LogRecord) {
        if !self.matches_target(&record.target) {
            return;
        }
        let context = self.handle.get_current_context();
        if !context.is_empty() || self.include_empty {
            record.set_attribute(self.attribute_name.clone(), Value::Object(context));
        }
    }
}

impl RecordFilter for LogContextAdapter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        self.annotate(record);
        true
    }
}
