//! Shared test utilities for integration tests

use contextdata::logging::{ContextLayer, LogRecord, MemorySink};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Serializes environment variable access across tests running in parallel
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Serializes tests that push onto the process-wide `global()` handle
static GLOBAL_MUTEX: Mutex<()> = Mutex::new(());

/// Hold while a test pushes onto or resets `global()`
pub fn lock_global() -> MutexGuard<'static, ()> {
    GLOBAL_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

/// Hold while reading configuration that environment overrides could change
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run `f` with `key` set to `value`, restoring the previous value afterwards
pub fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = lock_env();
    let previous = std::env::var(key).ok();
    std::env::set_var(key, value);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    match previous {
        Some(orig) => std::env::set_var(key, orig),
        None => std::env::remove_var(key),
    }

    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Install `layer` as this thread's subscriber while `f` runs and return
/// every record that reached `sink`
pub fn capture_records<F>(layer: ContextLayer, sink: &MemorySink, f: F) -> Vec<LogRecord>
where
    F: FnOnce(),
{
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    sink.records()
}
