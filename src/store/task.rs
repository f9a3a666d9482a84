//! Per-task stacks for tokio tasks.
//!
//! Each task scope owns its own copy of every task-local stack. Entering a
//! scope (through [`spawn`] or [`scope`]) snapshots the caller's stacks, so a
//! child starts with whatever its parent had pushed at that moment and the
//! two diverge from there.
//!
//! A tokio task started without a scope (plain `tokio::spawn`) gets its own
//! empty stacks, keyed by its task id, that follow it across worker threads.
//! Code that runs outside any tokio task (plain threads, a runtime's
//! `block_on` root) uses a per-thread stack that acts as that thread's root
//! task.

use super::{next_store_id, ContextStore, FrameStack, StackToken};
use crate::frame::Frame;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::task::{Id, JoinHandle};
use tracing::trace;

type TaskStacks = HashMap<u64, FrameStack>;

tokio::task_local! {
    static TASK_STACKS: RefCell<TaskStacks>;
}

thread_local! {
    static ROOT_TASK_STACKS: RefCell<TaskStacks> = RefCell::new(HashMap::new());
}

/// Stacks of tokio tasks that never entered a scope, by task id
fn unscoped_task_stacks() -> &'static Mutex<HashMap<Id, TaskStacks>> {
    static STACKS: OnceLock<Mutex<HashMap<Id, TaskStacks>>> = OnceLock::new();
    STACKS.get_or_init(Default::default)
}

/// Run `f` against the stacks owned by the caller: its task scope, else its
/// tokio task, else the thread's root stacks
///
/// Returns `None` only when the thread's root stacks are already torn down.
fn with_stacks<R>(f: impl FnOnce(&mut TaskStacks) -> R) -> Option<R> {
    if TASK_STACKS.try_with(|_| ()).is_ok() {
        return TASK_STACKS
            .try_with(|stacks| f(&mut *stacks.borrow_mut()))
            .ok();
    }

    if let Some(task_id) = tokio::task::try_id() {
        let mut tasks = unscoped_task_stacks().lock();
        let stacks = tasks.entry(task_id).or_default();
        let result = f(stacks);
        if stacks.is_empty() {
            tasks.remove(&task_id);
        }
        return Some(result);
    }

    ROOT_TASK_STACKS
        .try_with(|stacks| f(&mut *stacks.borrow_mut()))
        .ok()
}

/// Value copy of every task-local stack visible right now
fn snapshot() -> TaskStacks {
    with_stacks(|stacks| stacks.clone()).unwrap_or_default()
}

/// Wrap `future` in a new task scope seeded from the caller's stacks
///
/// The snapshot is taken when `scope` is called, not when the future is
/// first polled. Use this for futures driven by `join!`, `select!` or
/// spawners other than [`spawn`].
pub fn scope<F>(future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let stacks = snapshot();
    trace!(stores = stacks.len(), "Entering task context scope");
    TASK_STACKS.scope(RefCell::new(stacks), future)
}

/// Spawn a tokio task that inherits the caller's task-local context
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(scope(future))
}

/// One stack per task
#[derive(Debug)]
pub struct TaskLocalStore {
    id: u64,
}

impl TaskLocalStore {
    pub fn new() -> Self {
        Self {
            id: next_store_id(),
        }
    }
}

impl Default for TaskLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore for TaskLocalStore {
    fn read_current(&self) -> Arc<Frame> {
        with_stacks(|stacks| stacks.get(&self.id).map(FrameStack::current))
            .flatten()
            .unwrap_or_else(Frame::empty)
    }

    fn push(&self, frame: Arc<Frame>) -> StackToken {
        let detached = frame.clone();
        // After teardown the frame is never stored, so its token pops nothing.
        with_stacks(|stacks| stacks.entry(self.id).or_default().push(frame)).unwrap_or(
            StackToken {
                frame: detached,
                depth: 0,
            },
        )
    }

    fn pop(&self, token: StackToken) -> bool {
        with_stacks(|stacks| {
            let Some(stack) = stacks.get_mut(&self.id) else {
                return false;
            };
            let popped = stack.pop(token);
            if stack.is_empty() {
                stacks.remove(&self.id);
            }
            popped
        })
        .unwrap_or(false)
    }

    fn depth(&self) -> usize {
        with_stacks(|stacks| stacks.get(&self.id).map_or(0, FrameStack::len)).unwrap_or(0)
    }

    fn reset(&self) {
        with_stacks(|stacks| {
            stacks.remove(&self.id);
        });
    }
}
