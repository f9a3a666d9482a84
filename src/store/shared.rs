//! Process-wide stack shared by every thread and task.

use super::{ContextStore, FrameStack, StackToken};
use crate::frame::Frame;
use parking_lot::Mutex;
use std::sync::Arc;

/// One stack for everyone
///
/// Pushes from any thread are visible to all readers immediately. Unrelated
/// threads pushing concurrently will see each other's frames.
#[derive(Debug, Default)]
pub struct SharedStore {
    stack: Mutex<FrameStack>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for SharedStore {
    fn read_current(&self) -> Arc<Frame> {
        self.stack.lock().current()
    }

    fn push(&self, frame: Arc<Frame>) -> StackToken {
        self.stack.lock().push(frame)
    }

    fn pop(&self, token: StackToken) -> bool {
        self.stack.lock().pop(token)
    }

    fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    fn reset(&self) {
        self.stack.lock().clear();
    }
}
