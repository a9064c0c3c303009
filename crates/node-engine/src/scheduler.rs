//! Continuation scheduling
//!
//! The host runs node work as scheduled continuations rather than on
//! threads owned by the nodes. [`Scheduler`] is that primitive: a node hands
//! it a boxed closure and the host decides when and where it runs.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::error::{NodeError, Result};

/// A unit of deferred node work
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Host primitive for running a continuation later
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run asynchronously
    fn exec_async(&self, task: Continuation);
}

/// Runs continuations on tokio's blocking pool
///
/// Mailbox drains call blocking file and codec APIs, so they must not
/// occupy the async worker threads.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| NodeError::Config(format!("no tokio runtime available: {}", e)))
    }
}

impl Scheduler for TokioScheduler {
    fn exec_async(&self, task: Continuation) {
        // Detached: completion is observed through the node's emissions
        drop(self.handle.spawn_blocking(task));
    }
}

/// Runs each continuation immediately on the calling thread
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn exec_async(&self, task: Continuation) {
        task();
    }
}

/// Holds continuations until the caller explicitly runs them
///
/// Lets tests step through the idle/active transitions of a mailbox.
pub struct ManualScheduler {
    pending: Mutex<VecDeque<Continuation>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of continuations waiting to run
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run the oldest pending continuation, returning false if none
    pub fn run_one(&self) -> bool {
        // Release the lock before running so the task may schedule more work
        let task = self.pending.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run continuations until none are left, including ones scheduled
    /// while running. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn exec_async(&self, task: Continuation) {
        self.pending.lock().push_back(task);
    }
}
