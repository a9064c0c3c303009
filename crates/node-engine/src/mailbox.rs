//! Per-instance command mailbox
//!
//! Messages for one node instance may arrive from any number of host
//! threads, but the instance's state machine must see them as a single
//! ordered stream. [`Mailbox`] is a lock-protected FIFO with an *active*
//! flag; [`Actor`] pairs it with a [`CommandMachine`] and schedules at most
//! one drain at a time through the host.
//!
//! # Wake-up protocol
//!
//! - `push` appends and returns the previous active flag, setting it.
//! - `pop` returns the head, or clears the flag and returns `None` when the
//!   queue is empty. The emptiness check and the clear share one critical
//!   section, so a push racing with the end of a drain either lands before
//!   the check (and is popped by that drain) or sees the flag cleared (and
//!   schedules a new drain). Nothing is ever left behind.
//! - Only the push that flips the flag from false to true schedules a drain.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::error::{NodeError, Result};

struct MailboxState<T> {
    queue: VecDeque<T>,
    active: bool,
}

/// Multi-producer FIFO with a single logical consumer
pub struct Mailbox<T> {
    state: Mutex<MailboxState<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: VecDeque::new(),
                active: false,
            }),
        }
    }

    /// Append a command and mark the mailbox active
    ///
    /// Returns whether a drain was already scheduled or running.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        state.queue.push_back(item);
        std::mem::replace(&mut state.active, true)
    }

    /// Pop the oldest command, or go idle if there is none
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.queue.pop_front();
        if item.is_none() {
            state.active = false;
        }
        item
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Whether a drain is scheduled or running
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// State machine driven by a node's commands
///
/// `handle` is never called concurrently for one instance. An `Err` is
/// reported on the node's `error` port and does not stop later commands.
pub trait CommandMachine: Send + 'static {
    type Command: Send + 'static;

    fn handle(&mut self, ctx: &ExecutionContext, command: Self::Command) -> Result<()>;
}

/// A state machine behind a mailbox
///
/// Held in an `Arc` so that a scheduled drain keeps the instance alive
/// until it has finished; the machine (and any native resource it owns) is
/// dropped once the node and all drains have let go of it.
pub struct Actor<M: CommandMachine> {
    mailbox: Mailbox<M::Command>,
    // Uncontended: only the single in-flight drain locks it
    machine: Mutex<M>,
}

impl<M: CommandMachine> Actor<M> {
    pub fn new(machine: M) -> Arc<Self> {
        Arc::new(Self {
            mailbox: Mailbox::new(),
            machine: Mutex::new(machine),
        })
    }

    /// Enqueue a command, scheduling a drain if the mailbox was idle
    pub fn push(self: &Arc<Self>, ctx: &ExecutionContext, command: M::Command) {
        if self.mailbox.push(command) {
            return;
        }
        let actor = Arc::clone(self);
        let drain_ctx = ctx.clone();
        ctx.exec_async(Box::new(move || actor.drain(&drain_ctx)));
    }

    /// Process queued commands until the mailbox goes idle
    ///
    /// A panicking handler is reported like an `Err`; the drain keeps going
    /// so the active flag is always cleared by the final `pop`.
    fn drain(&self, ctx: &ExecutionContext) {
        while let Some(command) = self.mailbox.pop() {
            let mut machine = self.machine.lock();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| machine.handle(ctx, command)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => ctx.emit_error(&e),
                Err(payload) => {
                    ctx.emit_error(&NodeError::HandlerPanicked(panic_message(payload.as_ref())))
                }
            }
        }
    }

    pub fn mailbox(&self) -> &Mailbox<M::Command> {
        &self.mailbox
    }

    /// Inspect the machine between drains
    pub fn with_machine<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.machine.lock())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::scheduler::{InlineScheduler, ManualScheduler};
    use crate::value::Value;

    #[test]
    fn test_push_reports_previous_active_flag() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.push(1));
        assert!(mailbox.push(2));
        assert!(mailbox.is_active());

        assert_eq!(mailbox.pop(), Some(1));
        assert_eq!(mailbox.pop(), Some(2));
        assert!(mailbox.is_active());

        // Empty pop clears the flag
        assert_eq!(mailbox.pop(), None);
        assert!(!mailbox.is_active());
        assert!(!mailbox.push(3));
    }

    #[test]
    fn test_fifo_order() {
        let mailbox = Mailbox::new();
        for i in 0..100 {
            mailbox.push(i);
        }
        assert_eq!(mailbox.len(), 100);
        let drained: Vec<_> = std::iter::from_fn(|| mailbox.pop()).collect();
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert!(mailbox.is_empty());
    }

    /// Echoes each command on `out`, fails on negative ones, panics on zero
    struct Echo {
        handled: Vec<i64>,
    }

    impl CommandMachine for Echo {
        type Command = i64;

        fn handle(&mut self, ctx: &ExecutionContext, command: i64) -> Result<()> {
            if command < 0 {
                return Err(NodeError::validation(format!("negative: {}", command)));
            }
            if command == 0 {
                panic!("zero is not a command");
            }
            self.handled.push(command);
            ctx.emit("out", Value::from(command));
            Ok(())
        }
    }

    fn setup() -> (Arc<ManualScheduler>, Arc<VecEventSink>, ExecutionContext) {
        let scheduler = Arc::new(ManualScheduler::new());
        let sink = Arc::new(VecEventSink::new());
        let ctx = ExecutionContext::new("echo", sink.clone(), scheduler.clone());
        (scheduler, sink, ctx)
    }

    #[test]
    fn test_single_drain_scheduled_while_active() {
        let (scheduler, sink, ctx) = setup();
        let actor = Actor::new(Echo { handled: Vec::new() });

        actor.push(&ctx, 1);
        actor.push(&ctx, 2);
        actor.push(&ctx, 3);
        assert_eq!(scheduler.pending(), 1);
        assert!(sink.is_empty());

        scheduler.run_pending();
        assert_eq!(
            sink.values_on("out"),
            vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]
        );
        assert!(!actor.mailbox().is_active());

        // Idle again: the next push schedules a fresh drain
        actor.push(&ctx, 4);
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_pending();
        actor.with_machine(|m| assert_eq!(m.handled, vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_error_does_not_stop_drain() {
        let (scheduler, sink, ctx) = setup();
        let actor = Actor::new(Echo { handled: Vec::new() });

        actor.push(&ctx, 1);
        actor.push(&ctx, -5);
        actor.push(&ctx, 2);
        scheduler.run_pending();

        let ports: Vec<_> = sink.emissions().into_iter().map(|e| e.port).collect();
        assert_eq!(ports, vec!["out", "error", "out"]);
        assert_eq!(
            sink.values_on("error")[0].as_str().unwrap(),
            "negative: -5"
        );
    }

    #[test]
    fn test_panicking_handler_does_not_wedge_node() {
        let (scheduler, sink, ctx) = setup();
        let actor = Actor::new(Echo { handled: Vec::new() });

        actor.push(&ctx, 0);
        actor.push(&ctx, 1);
        scheduler.run_pending();

        assert_eq!(
            sink.values_on("error"),
            vec![Value::from("command handler panicked: zero is not a command")]
        );
        assert_eq!(sink.values_on("out"), vec![Value::from(1i64)]);
        assert!(!actor.mailbox().is_active());

        // Still schedulable after the panic
        actor.push(&ctx, 2);
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_pending();
        actor.with_machine(|m| assert_eq!(m.handled, vec![1, 2]));
    }

    #[test]
    fn test_inline_scheduler_drains_on_push() {
        let sink = Arc::new(VecEventSink::new());
        let ctx = ExecutionContext::new("echo", sink.clone(), Arc::new(InlineScheduler));
        let actor = Actor::new(Echo { handled: Vec::new() });

        actor.push(&ctx, 7);
        assert_eq!(sink.values_on("out"), vec![Value::from(7i64)]);
        assert!(!actor.mailbox().is_active());
    }

    #[test]
    fn test_pending_drain_keeps_actor_alive() {
        let (scheduler, sink, ctx) = setup();
        let actor = Actor::new(Echo { handled: Vec::new() });
        actor.push(&ctx, 9);
        drop(actor);

        scheduler.run_pending();
        assert_eq!(sink.values_on("out"), vec![Value::from(9i64)]);
    }
}
