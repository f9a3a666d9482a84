//! Integration tests for context propagation and log annotation

mod config_integration;
mod context_api;
mod test_utils;

pub use test_utils::{capture_records, lock_env, lock_global, with_env_var};
