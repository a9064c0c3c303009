//! Node Engine - primitives for stateful stream nodes
//!
//! This crate provides what every node in a dataflow host needs to handle
//! asynchronous messages safely:
//!
//! - A dynamically typed [`Value`] with strict, lossless numeric coercion
//! - A per-instance [`Mailbox`] that serializes concurrently arriving
//!   commands into one ordered, non-overlapping stream
//! - [`Actor`] / [`CommandMachine`]: the command-driven state machine pattern
//!   built on the mailbox, with errors reported on the node's `error` port
//! - An explicit [`NodeRegistry`] of node factories and descriptors
//!
//! # Architecture
//!
//! The host delivers `(port, value)` messages to a [`NodeInstance`]. The
//! instance translates each message into a command, pushes it into its
//! mailbox, and (if the mailbox was idle) schedules a drain through the
//! [`Scheduler`] in its [`ExecutionContext`]. The drain feeds commands to
//! the state machine one at a time; outputs go to the context's
//! [`EventSink`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use node_engine::{ExecutionContext, NodeRegistry, TokioScheduler, VecEventSink, Value};
//!
//! let sink = Arc::new(VecEventSink::new());
//! let ctx = ExecutionContext::new("inflate-1", sink, Arc::new(TokioScheduler::current()?));
//! let node = registry.spawn("zlib-inflate", ctx)?;
//! node.send("in", &Value::vector(compressed));
//! ```

pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod mailbox;
pub mod node;
pub mod numeric;
pub mod registry;
pub mod scheduler;
pub mod value;

// Re-export key types
pub use config::EngineConfig;
pub use context::{ExecutionContext, ERROR_PORT};
pub use descriptor::{NodeDescriptor, PortDescriptor};
pub use error::{NodeError, Result};
pub use events::{ChannelEventSink, Emission, EventError, EventSink, NullEventSink, VecEventSink};
pub use mailbox::{Actor, CommandMachine, Mailbox};
pub use node::{ActorNode, Message, NodeFactory, NodeHandle, NodeInstance, Translate};
pub use numeric::Numeric;
pub use registry::NodeRegistry;
pub use scheduler::{Continuation, InlineScheduler, ManualScheduler, Scheduler, TokioScheduler};
pub use value::{Tuple, Value, ValueType};
