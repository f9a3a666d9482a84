//! Context Frames
//!
//! Immutable mappings of context values. Every pushed frame carries three
//! lineage keys next to the caller's values: its own id, the id of the frame
//! it was pushed on top of, and the id of the first frame of the chain.
//! A nested push never edits a frame; it derives a new one.

use crate::identity::new_context_id;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Snapshot of a frame's values, as handed to callers and log records
pub type ContextMap = Map<String, Value>;

/// Key holding the frame's own id
pub const CONTEXT_ID_KEY: &str = "context_id";

/// Key holding the id of the frame below this one (`null` for a root frame)
pub const PARENT_CONTEXT_ID_KEY: &str = "parent_context_id";

/// Key holding the id of the first frame in this lineage
pub const ROOT_CONTEXT_ID_KEY: &str = "root_context_id";

/// Keys maintained by the frame itself; callers cannot set them.
pub const RESERVED_KEYS: [&str; 3] = [CONTEXT_ID_KEY, PARENT_CONTEXT_ID_KEY, ROOT_CONTEXT_ID_KEY];

/// Returns true if `key` is one of the lineage keys
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Context frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame {
    values: ContextMap,
}

impl Frame {
    /// The canonical empty frame, returned whenever a stack has nothing on it
    pub fn empty() -> Arc<Frame> {
        static EMPTY: OnceLock<Arc<Frame>> = OnceLock::new();
        EMPTY.get_or_init(|| Arc::new(Frame::default())).clone()
    }

    /// Derive the frame to push on top of `self`
    ///
    /// Copies this frame, overlays `values` (existing keys are replaced, new
    /// keys added), then stamps fresh lineage:
    /// - `context_id` = a newly generated id
    /// - `parent_context_id` = this frame's `context_id`, or `null`
    /// - `root_context_id` = this frame's root, or the new id when there is none
    ///
    /// Reserved keys in `values` are dropped with a warning.
    pub fn derive<I, K, V>(&self, values: I) -> Frame
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut next = self.values.clone();
        for (key, value) in values {
            let key = key.into();
            if is_reserved_key(&key) {
                warn!(key = %key, "Ignoring reserved context key supplied by caller");
                continue;
            }
            next.insert(key, value.into());
        }

        let context_id = new_context_id();
        let parent = self
            .context_id()
            .map(|id| Value::String(id.to_string()))
            .unwrap_or(Value::Null);
        let root = self
            .root_context_id()
            .map(str::to_string)
            .unwrap_or_else(|| context_id.clone());

        next.insert(CONTEXT_ID_KEY.to_string(), Value::String(context_id));
        next.insert(PARENT_CONTEXT_ID_KEY.to_string(), parent);
        next.insert(ROOT_CONTEXT_ID_KEY.to_string(), Value::String(root));

        Frame { values: next }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn context_id(&self) -> Option<&str> {
        self.get_str(CONTEXT_ID_KEY)
    }

    pub fn parent_context_id(&self) -> Option<&str> {
        self.get_str(PARENT_CONTEXT_ID_KEY)
    }

    pub fn root_context_id(&self) -> Option<&str> {
        self.get_str(ROOT_CONTEXT_ID_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Borrow the underlying values
    pub fn as_map(&self) -> &ContextMap {
        &self.values
    }

    /// Copy the values out; later changes to the copy never reach the frame
    pub fn to_map(&self) -> ContextMap {
        self.values.clone()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }
}
