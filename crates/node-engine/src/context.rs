//! Per-node execution context
//!
//! An [`ExecutionContext`] is what a node instance sees of the host: where
//! its outputs go and how it schedules deferred work. It is cheap to clone
//! so a scheduled drain can carry its own copy.

use std::fmt;
use std::sync::Arc;

use crate::error::NodeError;
use crate::events::{Emission, EventSink};
use crate::scheduler::{Continuation, Scheduler};
use crate::value::Value;

/// Output port every node uses to report recoverable errors
pub const ERROR_PORT: &str = "error";

/// Host-provided handle for one node instance
#[derive(Clone)]
pub struct ExecutionContext {
    node_id: Arc<str>,
    sink: Arc<dyn EventSink>,
    scheduler: Arc<dyn Scheduler>,
}

impl ExecutionContext {
    pub fn new(
        node_id: impl Into<String>,
        sink: Arc<dyn EventSink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            node_id: Arc::from(node_id.into()),
            sink,
            scheduler,
        }
    }

    /// Identifier of the node this context belongs to
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Emit a value on an output port
    ///
    /// Delivery is synchronous. A sink failure is logged; it is not the
    /// node's concern whether the host is still listening.
    pub fn emit(&self, port: &str, value: Value) {
        let emission = Emission::new(self.node_id.as_ref(), port, value);
        if let Err(e) = self.sink.send(emission) {
            log::warn!("{}: dropped emission on '{}': {}", self.node_id, port, e);
        }
    }

    /// Emit a valueless completion signal
    pub fn emit_pulse(&self, port: &str) {
        self.emit(port, Value::Pulse);
    }

    /// Report an error on the `error` port as its message string
    pub fn emit_error(&self, err: &NodeError) {
        log::warn!("{}: {}", self.node_id, err);
        self.emit(ERROR_PORT, Value::string(err.to_string()));
    }

    /// Schedule a continuation through the host
    pub fn exec_async(&self, task: Continuation) {
        self.scheduler.exec_async(task);
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}
