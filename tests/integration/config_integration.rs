//! Integration tests for configuration loading and logging setup

use contextdata::config::ConfigLoader;
use contextdata::logging::{build_env_filter, build_layer, init_logging, LoggingConfig};
use contextdata::{global, worker_local, ContextError, ContextLayer, ContextScope};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::integration::{lock_env, lock_global, with_env_var};

fn file_config(dir: &TempDir, format: &str) -> LoggingConfig {
    LoggingConfig {
        format: format.to_string(),
        output: "file".to_string(),
        file: dir.path().join("contextdata.log"),
        ..LoggingConfig::default()
    }
}

fn emit_through(layer: ContextLayer, message: &str) {
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "config_integration", order = 7, "{}", message);
    });
}

/// The JSON line in `path` whose message is `message`
fn find_json_line(path: &Path, message: &str) -> Value {
    let contents = fs::read_to_string(path).unwrap();
    contents
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .find(|line| line["message"] == json!(message))
        .unwrap_or_else(|| panic!("no record with message {message:?} in {contents:?}"))
}

#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contextdata.toml");
    fs::write(&path, "[logging]\noutput = \"stdout\"\n").unwrap();

    let config = with_env_var("CONTEXTDATA_LOGGING__OUTPUT", "stderr", || {
        ConfigLoader::load(Some(&path)).unwrap()
    });
    assert_eq!(config.logging.output, "stderr");
}

#[test]
fn test_file_adapters_build_a_layer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contextdata.toml");
    fs::write(
        &path,
        r#"
[logging]
format = "json"
output = "file"
file = "LOG_PATH"

[[logging.adapters]]
scope = "global"
attribute_name = "g"

[[logging.adapters]]
scope = "worker-local"
attribute_name = "w"
include_empty = true
"#
        .replace("LOG_PATH", &dir.path().join("out.log").display().to_string()),
    )
    .unwrap();

    let config = {
        let _env = lock_env();
        ConfigLoader::load(Some(&path)).unwrap()
    };
    assert_eq!(config.logging.adapters[1].scope, ContextScope::WorkerLocal);

    let layer = {
        let _env = lock_env();
        build_layer(Some(&config.logging)).unwrap()
    };
    assert_eq!(layer.filter_count(), 2);
    assert!(dir.path().join("out.log").exists());
}

#[test]
fn test_invalid_adapter_config_is_rejected() {
    let config = LoggingConfig {
        adapters: vec![contextdata::logging::AdapterConfig::new(
            ContextScope::Global,
            " ",
        )],
        ..LoggingConfig::default()
    };
    assert!(matches!(
        build_layer(Some(&config)),
        Err(ContextError::InvalidAdapter(_))
    ));
}

#[test]
fn test_invalid_output_from_environment_is_rejected() {
    let result = with_env_var("CONTEXTDATA_LOG_OUTPUT", "bogus", || build_layer(None));
    assert!(matches!(result, Err(ContextError::InvalidLogging(_))));
}

#[test]
fn test_format_from_environment_overrides_config() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir, "text");

    let layer = with_env_var("CONTEXTDATA_LOG_FORMAT", "json", || {
        build_layer(Some(&config)).unwrap()
    });
    let _request = worker_local().start_context([("request", "r-5")]);
    emit_through(layer, "format override");

    let line = find_json_line(&config.file, "format override");
    assert_eq!(line["level"], json!("INFO"));
    assert_eq!(line["order"], json!(7));
    assert_eq!(line["worker_context"]["request"], json!("r-5"));
}

#[test]
fn test_file_sink_receives_annotated_record() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir, "json");
    let layer = {
        let _env = lock_env();
        build_layer(Some(&config)).unwrap()
    };

    let _global = lock_global();
    let ctx = global();
    ctx.reset();
    let _order = ctx.start_context([("order", "o-1")]);
    emit_through(layer, "order placed");

    let line = find_json_line(&config.file, "order placed");
    assert_eq!(line["target"], json!("config_integration"));
    assert_eq!(line["global_context"]["order"], json!("o-1"));
    assert_eq!(
        line["global_context"]["context_id"],
        json!(ctx.context_id().unwrap())
    );
    assert!(line.get("worker_context").is_none());
    assert!(line.get("task_context").is_none());
}

#[test]
fn test_env_filter_level_sources() {
    let config = LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    };

    let from_config = {
        let _env = lock_env();
        build_env_filter(Some(&config)).unwrap()
    };
    assert_eq!(from_config.max_level_hint(), Some(LevelFilter::WARN));

    let from_env = with_env_var("CONTEXTDATA_LOG", "trace", || {
        build_env_filter(Some(&config)).unwrap()
    });
    assert_eq!(from_env.max_level_hint(), Some(LevelFilter::TRACE));

    let with_modules = with_env_var("CONTEXTDATA_LOG_MODULES", "my_app::db=debug", || {
        build_env_filter(Some(&config)).unwrap()
    });
    assert_eq!(with_modules.max_level_hint(), Some(LevelFilter::DEBUG));

    let off = LoggingConfig {
        level: "off".to_string(),
        ..LoggingConfig::default()
    };
    let silenced = {
        let _env = lock_env();
        build_env_filter(Some(&off)).unwrap()
    };
    assert_eq!(silenced.max_level_hint(), Some(LevelFilter::OFF));
}

#[test]
fn test_init_logging_installs_global_subscriber_once() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        level: "warn".to_string(),
        ..file_config(&dir, "json")
    };

    let _env = lock_env();
    init_logging(Some(&config)).unwrap();
    tracing::warn!(target: "config_integration", "installed globally");
    assert!(matches!(
        init_logging(Some(&config)),
        Err(ContextError::Subscriber(_))
    ));

    let line = find_json_line(&config.file, "installed globally");
    assert_eq!(line["level"], json!("WARN"));
}
