//! Context Stores
//!
//! Backing stacks for context frames. All stores share one contract
//! ([`ContextStore`]) and differ only in *where* the stack lives:
//!
//! - [`SharedStore`]: one stack for the whole process
//! - [`WorkerLocalStore`]: one stack per thread
//! - [`TaskLocalStore`]: one stack per tokio task, seeded from the spawning task

pub mod shared;
pub mod task;
pub mod worker;

pub use shared::SharedStore;
pub use task::TaskLocalStore;
pub use worker::WorkerLocalStore;

use crate::frame::Frame;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate an id keying one store instance inside per-thread/per-task maps
pub(crate) fn next_store_id() -> u64 {
    NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Storage for a stack of context frames
///
/// `push` and `pop` must be paired LIFO on the caller's execution unit;
/// [`crate::ContextHandle::start_context`] is the only place that does it.
pub trait ContextStore: Send + Sync + fmt::Debug {
    /// Top of the caller's stack, or [`Frame::empty`]
    fn read_current(&self) -> Arc<Frame>;

    /// Append a frame; the token undoes exactly this push
    fn push(&self, frame: Arc<Frame>) -> StackToken;

    /// Remove the frame pushed with `token`; false if it was not found
    fn pop(&self, token: StackToken) -> bool;

    /// Number of frames on the caller's stack
    fn depth(&self) -> usize;

    /// Drop every frame visible to the caller
    fn reset(&self);
}

/// Receipt for one push
#[derive(Debug)]
#[must_use = "dropping a token leaves its frame on the stack"]
pub struct StackToken {
    frame: Arc<Frame>,
    depth: usize,
}

impl StackToken {
    /// The frame this token will remove
    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Stack length before the push
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// An ordered stack of frames; the building block of every store
///
/// Public so hosts can back a custom [`ContextStore`] with it. Never logs:
/// stores call it under their lock, and a log event may re-enter the store
/// through a context adapter.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Arc<Frame>>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Frame> {
        self.frames.last().cloned().unwrap_or_else(Frame::empty)
    }

    pub fn push(&mut self, frame: Arc<Frame>) -> StackToken {
        let depth = self.frames.len();
        self.frames.push(frame.clone());
        StackToken { frame, depth }
    }

    /// Remove the token's frame. Returns false for a stale or foreign token.
    pub fn pop(&mut self, token: StackToken) -> bool {
        let index = if self
            .frames
            .get(token.depth)
            .is_some_and(|f| Arc::ptr_eq(f, &token.frame))
        {
            Some(token.depth)
        } else {
            // Out-of-order release, e.g. interleaved threads on a shared stack.
            self.frames
                .iter()
                .rposition(|f| Arc::ptr_eq(f, &token.frame))
        };

        match index {
            Some(index) => {
                self.frames.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }
}
