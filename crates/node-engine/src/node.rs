//! Node instance boundary
//!
//! The host creates one instance per graph node through a [`NodeFactory`]
//! (init), delivers messages with [`NodeInstance::on_message`], and tears
//! the instance down by dropping it (deinit). Any native resource an
//! instance owns is released by that drop.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::descriptor::NodeDescriptor;
use crate::error::Result;
use crate::mailbox::{Actor, CommandMachine};
use crate::value::Value;

/// A named value delivered to one input port
///
/// The value is borrowed from the host and only valid during dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    pub port: &'a str,
    pub value: &'a Value,
}

impl<'a> Message<'a> {
    pub fn new(port: &'a str, value: &'a Value) -> Self {
        Self { port, value }
    }
}

/// Per-node-instance state as seen by the host
pub trait NodeInstance: Send + Sync {
    /// Handle one inbound message
    ///
    /// Never fails: problems are reported on the node's `error` port.
    fn on_message(&self, ctx: &ExecutionContext, message: Message<'_>);
}

/// Creates instances of one node type
pub trait NodeFactory: Send + Sync {
    fn descriptor(&self) -> NodeDescriptor;

    fn create(&self) -> Box<dyn NodeInstance>;
}

/// Converts a message into a command, `None` for ports the node ignores
pub type Translate<C> = fn(Message<'_>) -> Result<Option<C>>;

/// A node whose messages become commands for a [`CommandMachine`]
///
/// Translation runs eagerly on the delivering thread, so anything the
/// command needs from the borrowed value is copied out before it is
/// queued. Translation failures are reported immediately; everything else
/// is reported in mailbox order.
pub struct ActorNode<M: CommandMachine> {
    actor: Arc<Actor<M>>,
    translate: Translate<M::Command>,
}

impl<M: CommandMachine> ActorNode<M> {
    pub fn new(machine: M, translate: Translate<M::Command>) -> Self {
        Self {
            actor: Actor::new(machine),
            translate,
        }
    }

    pub fn actor(&self) -> &Arc<Actor<M>> {
        &self.actor
    }
}

impl<M: CommandMachine> NodeInstance for ActorNode<M> {
    fn on_message(&self, ctx: &ExecutionContext, message: Message<'_>) {
        match (self.translate)(message) {
            Ok(Some(command)) => self.actor.push(ctx, command),
            Ok(None) => {
                log::debug!(
                    "{}: ignoring message on unknown port '{}'",
                    ctx.node_id(),
                    message.port
                );
            }
            Err(e) => ctx.emit_error(&e),
        }
    }
}

/// A live node: its instance bound to the context the host created for it
pub struct NodeHandle {
    descriptor: NodeDescriptor,
    instance: Box<dyn NodeInstance>,
    ctx: ExecutionContext,
}

impl NodeHandle {
    pub fn new(
        descriptor: NodeDescriptor,
        instance: Box<dyn NodeInstance>,
        ctx: ExecutionContext,
    ) -> Self {
        Self {
            descriptor,
            instance,
            ctx,
        }
    }

    /// Deliver `value` to input `port`
    pub fn send(&self, port: &str, value: &Value) {
        self.instance.on_message(&self.ctx, Message::new(port, value));
    }

    pub fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn node_id(&self) -> &str {
        self.ctx.node_id()
    }
}
