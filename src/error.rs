//! Error types for the context propagation system.
//!
//! Reads and scoped pushes never fail; errors only come from the ambient
//! surface: loading configuration and installing the logging pipeline.

use thiserror::Error;

/// Errors surfaced by configuration loading and logging setup
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid adapter configuration: {0}")]
    InvalidAdapter(String),

    #[error("Log sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install log subscriber: {0}")]
    Subscriber(String),
}

impl From<tracing_subscriber::filter::ParseError> for ContextError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ContextError::InvalidLogging(format!("Invalid log directive: {}", err))
    }
}

impl From<tracing_subscriber::util::TryInitError> for ContextError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        ContextError::Subscriber(err.to_string())
    }
}
