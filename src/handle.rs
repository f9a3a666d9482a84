//! Context Handles
//!
//! The public face of the context system. A [`ContextHandle`] is bound to one
//! [`ContextStore`] and is the only way to push frames: [`ContextHandle::start_context`]
//! returns a guard whose drop pops the frame again, so pushes and pops always pair
//! up, whether the nested code returns early, bails out with `?` or panics.

use crate::frame::{ContextMap, Frame, CONTEXT_ID_KEY};
use crate::store::{ContextStore, SharedStore, StackToken, TaskLocalStore, WorkerLocalStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Isolation scope of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextScope {
    /// One stack for the whole process
    Global,
    /// One stack per thread
    WorkerLocal,
    /// One stack per tokio task
    TaskLocal,
}

impl ContextScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextScope::Global => "global",
            ContextScope::WorkerLocal => "worker-local",
            ContextScope::TaskLocal => "task-local",
        }
    }

    /// The process-wide handle for this scope
    pub fn handle(&self) -> &'static ContextHandle {
        match self {
            ContextScope::Global => global(),
            ContextScope::WorkerLocal => worker_local(),
            ContextScope::TaskLocal => task_local(),
        }
    }
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(ContextScope::Global),
            "worker-local" => Ok(ContextScope::WorkerLocal),
            "task-local" => Ok(ContextScope::TaskLocal),
            other => Err(format!(
                "Unknown context scope: {} (must be 'global', 'worker-local' or 'task-local')",
                other
            )),
        }
    }
}

/// Handle over one context store
#[derive(Clone)]
pub struct ContextHandle {
    name: String,
    store: Arc<dyn ContextStore>,
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("name", &self.name)
            .field("depth", &self.store.depth())
            .finish()
    }
}

impl ContextHandle {
    /// Bind a handle to any store
    pub fn new(name: impl Into<String>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// A fresh handle over its own [`SharedStore`]
    pub fn shared() -> Self {
        Self::new(ContextScope::Global.as_str(), Arc::new(SharedStore::new()))
    }

    /// A fresh handle over its own [`WorkerLocalStore`]
    pub fn worker() -> Self {
        Self::new(
            ContextScope::WorkerLocal.as_str(),
            Arc::new(WorkerLocalStore::new()),
        )
    }

    /// A fresh handle over its own [`TaskLocalStore`]
    pub fn task() -> Self {
        Self::new(ContextScope::TaskLocal.as_str(), Arc::new(TaskLocalStore::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Look up `key` in the current context
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.read_current().get(key).cloned()
    }

    /// Look up `key`, falling back to `default` when it is absent
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Id of the current frame
    pub fn context_id(&self) -> Option<String> {
        self.store.read_current().context_id().map(str::to_string)
    }

    /// Id of the frame the current one was pushed on
    pub fn parent_context_id(&self) -> Option<String> {
        self.store
            .read_current()
            .parent_context_id()
            .map(str::to_string)
    }

    /// Id of the first frame in the current lineage
    pub fn root_context_id(&self) -> Option<String> {
        self.store.read_current().root_context_id().map(str::to_string)
    }

    /// Copy of the whole current context
    pub fn get_current_context(&self) -> ContextMap {
        self.store.read_current().to_map()
    }

    /// Number of frames on the caller's stack
    pub fn depth(&self) -> usize {
        self.store.depth()
    }

    /// Start a nested context
    ///
    /// The new frame holds everything from the current one plus `values`
    /// (replacing keys that already exist), with fresh lineage ids. It stays
    /// current until the returned guard is dropped.
    pub fn start_context<I, K, V>(&self, values: I) -> ContextGuard<'_>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let current = self.store.read_current();
        let frame = Arc::new(current.derive(values));
        let token = self.store.push(frame);
        debug!(
            scope = %self.name,
            context_id = token.frame().context_id().unwrap_or_default(),
            depth = token.depth() + 1,
            "Started context"
        );
        ContextGuard {
            handle: self,
            token: Some(token),
        }
    }

    /// Run `f` inside a nested context
    pub fn with_context<I, K, V, F, R>(&self, values: I, f: F) -> R
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
        F: FnOnce(&ContextHandle) -> R,
    {
        let guard = self.start_context(values);
        f(&guard)
    }

    /// Drop every frame visible to the caller; outstanding guards become no-ops
    pub fn reset(&self) {
        self.store.reset();
    }
}

/// Keeps a pushed frame current; dropping it restores the previous frame
#[must_use = "the context ends as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    handle: &'a ContextHandle,
    token: Option<StackToken>,
}

impl ContextGuard<'_> {
    /// The frame this guard pushed
    pub fn frame(&self) -> Option<&Arc<Frame>> {
        self.token.as_ref().map(StackToken::frame)
    }
}

impl Deref for ContextGuard<'_> {
    type Target = ContextHandle;

    fn deref(&self) -> &ContextHandle {
        self.handle
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            // Log only after the store has released its lock.
            let frame = token.frame().clone();
            if self.handle.store.pop(token) {
                debug!(
                    scope = %self.handle.name,
                    context_id = frame.context_id().unwrap_or_default(),
                    "Ended context"
                );
            } else {
                warn!(
                    scope = %self.handle.name,
                    context_id = frame.context_id().unwrap_or_default(),
                    "Context frame was already gone when its guard ended"
                );
            }
        }
    }
}

impl fmt::Debug for ContextGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("handle", &self.handle.name)
            .field(
                "context_id",
                &self
                    .frame()
                    .and_then(|frame| frame.get(CONTEXT_ID_KEY).cloned()),
            )
            .finish()
    }
}

static GLOBAL: OnceLock<ContextHandle> = OnceLock::new();
static WORKER_LOCAL: OnceLock<ContextHandle> = OnceLock::new();
static TASK_LOCAL: OnceLock<ContextHandle> = OnceLock::new();

/// Process-wide shared context. Created on first use, never torn down.
pub fn global() -> &'static ContextHandle {
    GLOBAL.get_or_init(ContextHandle::shared)
}

/// Process-wide per-thread context
pub fn worker_local() -> &'static ContextHandle {
    WORKER_LOCAL.get_or_init(ContextHandle::worker)
}

/// Process-wide per-task context; spawn with [`crate::task::spawn`] to propagate it
pub fn task_local() -> &'static ContextHandle {
    TASK_LOCAL.get_or_init(ContextHandle::task)
}
