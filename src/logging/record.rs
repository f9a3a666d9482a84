//! Log records flowing through the context pipeline.

use crate::frame::ContextMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level};

/// One log record, built from a tracing event
///
/// `fields` holds the event's own key/values; `attributes` holds whatever
/// the filter chain attached (context snapshots, under their attribute names).
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: ContextMap,
    pub attributes: ContextMap,
}

impl LogRecord {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: target.into(),
            message: message.into(),
            fields: ContextMap::new(),
            attributes: ContextMap::new(),
        }
    }

    /// Capture a tracing event
    pub fn from_event(event: &Event<'_>) -> Self {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = Self::new(
            *metadata.level(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        record.fields = visitor.fields;
        record
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Flat JSON object: timestamp, level, target, message, then fields and attributes
    pub fn to_json(&self) -> Value {
        let mut object = json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "level": self.level.as_str(),
            "target": self.target,
            "message": self.message,
        });
        if let Value::Object(map) = &mut object {
            for (key, value) in self.fields.iter().chain(self.attributes.iter()) {
                map.insert(key.clone(), value.clone());
            }
        }
        object
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.target,
            self.message
        )?;
        for (key, value) in self.fields.iter().chain(self.attributes.iter()) {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: ContextMap,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }
}
