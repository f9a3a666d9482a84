//! Context id generation.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Current time as nanoseconds since Unix epoch.
fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Generate a new context id.
///
/// Format: 16 hex chars of randomness followed by the current time in
/// nanoseconds, also in hex. The random half keeps ids from different
/// threads apart when they are minted in the same nanosecond.
pub fn new_context_id() -> String {
    let random = Uuid::new_v4();
    let bytes = random.as_bytes();
    format!("{}{:x}", hex::encode(&bytes[..8]), now_nanos())
}
