//! ContextData: Contextual Data Propagation
//!
//! Carries key/value context down a call tree, so code deep in an execution
//! path (and every log record it emits) sees what its callers set, without
//! threading parameters through. Three isolation scopes are available:
//!
//! - [`global`]: one stack shared by the whole process
//! - [`worker_local`]: one stack per thread
//! - [`task_local`]: one stack per tokio task; children spawned through
//!   [`task::spawn`] start from a snapshot of their parent's context
//!
//! ```no_run
//! use contextdata::worker_local;
//!
//! let ctx = worker_local();
//! let _request = ctx.start_context([("request_id", "r-42")]);
//! assert_eq!(ctx.get("request_id"), Some("r-42".into()));
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod handle;
pub mod identity;
pub mod logging;
pub mod store;

pub use store::task;

pub use error::ContextError;
pub use frame::{
    ContextMap, Frame, CONTEXT_ID_KEY, PARENT_CONTEXT_ID_KEY, RESERVED_KEYS, ROOT_CONTEXT_ID_KEY,
};
pub use handle::{global, task_local, worker_local, ContextGuard, ContextHandle, ContextScope};
pub use identity::new_context_id;
pub use logging::{ContextLayer, LogContextAdapter, LogRecord, RecordFilter, RecordSink};
pub use store::{ContextStore, FrameStack, StackToken};
