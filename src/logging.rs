//! Logging System
//!
//! Context-aware structured logging on top of `tracing`. Events pass through
//! [`ContextLayer`], which runs a filter chain of [`LogContextAdapter`]s (one
//! per configured scope) so every record carries the context that was current
//! where it was emitted, then writes the record to the configured sink.

pub mod adapter;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod sink;

pub use adapter::{LogContextAdapter, DEFAULT_ATTRIBUTE_NAME};
pub use filter::{LevelThreshold, RecordFilter};
pub use pipeline::ContextLayer;
pub use record::LogRecord;
pub use sink::{JsonLinesSink, MemorySink, RecordSink, TextSink};

use crate::error::ContextError;
use crate::handle::ContextScope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,

    /// Context adapters attached to every record, in order
    #[serde(default = "default_adapters")]
    pub adapters: Vec<AdapterConfig>,
}

/// One context adapter in the logging pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Which process-wide handle to read
    pub scope: ContextScope,

    /// Record attribute the snapshot is stored under
    #[serde(default = "default_attribute_name")]
    pub attribute_name: String,

    /// Attach the snapshot even when no context is active
    #[serde(default)]
    pub include_empty: bool,

    /// Only annotate records from this target and its submodules (empty: all)
    #[serde(default)]
    pub target_prefix: String,
}

impl AdapterConfig {
    pub fn new(scope: ContextScope, attribute_name: impl Into<String>) -> Self {
        Self {
            scope,
            attribute_name: attribute_name.into(),
            include_empty: false,
            target_prefix: String::new(),
        }
    }

    /// Build the adapter over the scope's process-wide handle
    pub fn build(&self) -> LogContextAdapter {
        LogContextAdapter::new(self.scope.handle().clone())
            .attribute_name(self.attribute_name.clone())
            .include_empty(self.include_empty)
            .target_prefix(self.target_prefix.clone())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("contextdata.log")
}

fn default_attribute_name() -> String {
    DEFAULT_ATTRIBUTE_NAME.to_string()
}

fn default_adapters() -> Vec<AdapterConfig> {
    vec![
        AdapterConfig::new(ContextScope::Global, "global_context"),
        AdapterConfig::new(ContextScope::WorkerLocal, "worker_context"),
        AdapterConfig::new(ContextScope::TaskLocal, "task_context"),
    ]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            modules: HashMap::new(),
            adapters: default_adapters(),
        }
    }
}

impl LoggingConfig {
    /// Reject settings that `init_logging` could not honor
    pub fn validate(&self) -> Result<(), ContextError> {
        parse_format(&self.format)?;
        parse_output(&self.output)?;

        let mut seen = HashMap::new();
        for adapter in &self.adapters {
            if adapter.attribute_name.trim().is_empty() {
                return Err(ContextError::InvalidAdapter(format!(
                    "Adapter for scope '{}' has an empty attribute name",
                    adapter.scope
                )));
            }
            if let Some(other) = seen.insert(adapter.attribute_name.as_str(), adapter.scope) {
                return Err(ContextError::InvalidAdapter(format!(
                    "Attribute name '{}' is used by both '{}' and '{}'",
                    adapter.attribute_name, other, adapter.scope
                )));
            }
        }
        Ok(())
    }
}

/// Record format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Record destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. Environment variables (CONTEXTDATA_LOG, CONTEXTDATA_LOG_FORMAT, etc.)
/// 2. Configuration
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ContextError> {
    let filter = build_env_filter(config)?;
    let layer = build_layer(config)?;

    Registry::default().with(filter).with(layer).try_init()?;
    Ok(())
}

/// Build the context layer described by `config`, without installing it
///
/// Useful for composing with other layers or for scoped subscribers.
pub fn build_layer(config: Option<&LoggingConfig>) -> Result<ContextLayer, ContextError> {
    if let Some(config) = config {
        config.validate()?;
    }

    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let sink = build_sink(config, format, output)?;

    let adapters = config
        .map(|c| c.adapters.clone())
        .unwrap_or_else(default_adapters);
    let layer = adapters
        .iter()
        .fold(ContextLayer::new(sink), |layer, adapter| {
            layer.with_adapter(adapter.build())
        });
    Ok(layer)
}

fn build_sink(
    config: Option<&LoggingConfig>,
    format: LogFormat,
    output: LogOutput,
) -> Result<Box<dyn RecordSink>, ContextError> {
    let sink: Box<dyn RecordSink> = match (format, output) {
        (LogFormat::Json, LogOutput::Stdout) => Box::new(JsonLinesSink::new(std::io::stdout())),
        (LogFormat::Json, LogOutput::Stderr) => Box::new(JsonLinesSink::new(std::io::stderr())),
        (LogFormat::Json, LogOutput::File) => Box::new(JsonLinesSink::new(open_log_file(config)?)),
        (LogFormat::Text, LogOutput::Stdout) => Box::new(TextSink::new(std::io::stdout())),
        (LogFormat::Text, LogOutput::Stderr) => Box::new(TextSink::new(std::io::stderr())),
        (LogFormat::Text, LogOutput::File) => Box::new(TextSink::new(open_log_file(config)?)),
    };
    Ok(sink)
}

fn open_log_file(config: Option<&LoggingConfig>) -> Result<std::fs::File, ContextError> {
    let log_file = config
        .map(|c| c.file.clone())
        .unwrap_or_else(default_log_file);

    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;
    Ok(file)
}

/// Build environment filter from config or environment variables
///
/// `CONTEXTDATA_LOG` replaces the configured filter outright;
/// `CONTEXTDATA_LOG_MODULES` (`module=level,...`) adds to it.
pub fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ContextError> {
    if let Ok(filter) = EnvFilter::try_from_env("CONTEXTDATA_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");

    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(directive.parse()?);
        }
    }

    if let Ok(modules_str) = std::env::var("CONTEXTDATA_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            let parts: Vec<&str> = module_spec.split('=').collect();
            if parts.len() == 2 {
                let directive = format!("{}={}", parts[0].trim(), parts[1].trim());
                filter = filter.add_directive(directive.parse()?);
            }
        }
    }

    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<LogFormat, ContextError> {
    if let Ok(format) = std::env::var("CONTEXTDATA_LOG_FORMAT") {
        if let Ok(format) = parse_format(&format) {
            return Ok(format);
        }
    }

    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text"))
}

/// Determine output destination from config or environment
fn determine_output(config: Option<&LoggingConfig>) -> Result<LogOutput, ContextError> {
    if let Ok(output) = std::env::var("CONTEXTDATA_LOG_OUTPUT") {
        return parse_output(&output);
    }

    parse_output(config.map(|c| c.output.as_str()).unwrap_or("stdout"))
}

fn parse_format(format: &str) -> Result<LogFormat, ContextError> {
    match format {
        "json" => Ok(LogFormat::Json),
        "text" => Ok(LogFormat::Text),
        _ => Err(ContextError::InvalidLogging(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        ))),
    }
}

fn parse_output(output: &str) -> Result<LogOutput, ContextError> {
    match output {
        "stdout" => Ok(LogOutput::Stdout),
        "stderr" => Ok(LogOutput::Stderr),
        "file" => Ok(LogOutput::File),
        _ => Err(ContextError::InvalidLogging(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            output
        ))),
    }
}
