//! Per-thread stacks.

use super::{next_store_id, ContextStore, FrameStack, StackToken};
use crate::frame::Frame;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

thread_local! {
    // Keyed by store instance so independent stores on one thread stay apart.
    static WORKER_STACKS: RefCell<HashMap<u64, FrameStack>> = RefCell::new(HashMap::new());
}

/// One stack per thread
///
/// A thread's stack is created the first time it pushes and is dropped with
/// the thread. Newly spawned threads always start empty, regardless of what
/// the spawning thread has pushed.
#[derive(Debug)]
pub struct WorkerLocalStore {
    id: u64,
}

impl WorkerLocalStore {
    pub fn new() -> Self {
        Self {
            id: next_store_id(),
        }
    }
}

impl Default for WorkerLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore for WorkerLocalStore {
    fn read_current(&self) -> Arc<Frame> {
        WORKER_STACKS
            .try_with(|stacks| {
                stacks
                    .borrow()
                    .get(&self.id)
                    .map(FrameStack::current)
                    .unwrap_or_else(Frame::empty)
            })
            .unwrap_or_else(|_| Frame::empty())
    }

    fn push(&self, frame: Arc<Frame>) -> StackToken {
        WORKER_STACKS.with(|stacks| stacks.borrow_mut().entry(self.id).or_default().push(frame))
    }

    fn pop(&self, token: StackToken) -> bool {
        // The slot may already be gone if a guard outlives thread-local teardown.
        WORKER_STACKS
            .try_with(|stacks| {
                let mut stacks = stacks.borrow_mut();
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
        WORKER_STACKS
            .try_with(|stacks| stacks.borrow().get(&self.id).map_or(0, FrameStack::len))
            .unwrap_or(0)
    }

    fn reset(&self) {
        let _ = WORKER_STACKS.try_with(|stacks| stacks.borrow_mut().remove(&self.id));
    }
}
