//! Output emissions from node instances
//!
//! Nodes never talk to the host directly; every output goes through an
//! [`EventSink`] carried by the node's execution context. This keeps the
//! nodes independent of how the host routes values to downstream ports.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::value::Value;

/// Trait for delivering node outputs to the host
pub trait EventSink: Send + Sync {
    /// Deliver one emission
    ///
    /// Returns an error if the emission could not be delivered (e.g., channel closed)
    fn send(&self, emission: Emission) -> Result<(), EventError>;
}

/// Error when delivering an emission fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// A value emitted on one output port of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emission {
    pub node_id: String,
    pub port: String,
    pub value: Value,
}

impl Emission {
    pub fn new(node_id: impl Into<String>, port: impl Into<String>, value: Value) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.into(),
            value,
        }
    }
}

/// A no-op event sink that discards all emissions
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _emission: Emission) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects emissions
///
/// Useful for testing to verify what a node emitted and in which order.
pub struct VecEventSink {
    emissions: parking_lot::Mutex<Vec<Emission>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            emissions: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected emissions
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().clone()
    }

    /// Get the values emitted on one port, in order
    pub fn values_on(&self, port: &str) -> Vec<Value> {
        self.emissions
            .lock()
            .iter()
            .filter(|e| e.port == port)
            .map(|e| e.value.clone())
            .collect()
    }

    /// Number of emissions collected so far
    pub fn len(&self) -> usize {
        self.emissions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.lock().is_empty()
    }

    /// Take all collected emissions, leaving the sink empty
    pub fn take(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.emissions.lock())
    }

    /// Clear all collected emissions
    pub fn clear(&self) {
        self.emissions.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, emission: Emission) -> Result<(), EventError> {
        self.emissions.lock().push(emission);
        Ok(())
    }
}

/// Event sink that forwards emissions over a tokio channel
///
/// The receiving half is typically owned by the host's routing loop.
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<Emission>,
}

impl ChannelEventSink {
    /// Create a sink together with its receiving half
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Emission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, emission: Emission) -> Result<(), EventError> {
        self.tx
            .send(emission)
            .map_err(|_| EventError::channel_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(Emission::new("reader", "data", Value::from("abc")))
            .unwrap();
        sink.send(Emission::new("reader", "done", Value::Pulse))
            .unwrap();

        let emissions = sink.emissions();
        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[0].port, "data");
        assert_eq!(sink.values_on("done"), vec![Value::Pulse]);

        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(Emission::new("n", "out", Value::Pulse)).unwrap();
    }

    #[test]
    fn test_channel_event_sink() {
        let (sink, mut rx) = ChannelEventSink::new();
        sink.send(Emission::new("n", "out", Value::from(1i64))).unwrap();

        let received = rx.try_recv().unwrap();
        assert_eq!(received.port, "out");

        drop(rx);
        assert!(sink.send(Emission::new("n", "out", Value::Pulse)).is_err());
    }

    #[test]
    fn test_emission_serialization() {
        let emission = Emission::new("inflate-1", "out", Value::vector(vec![1]));
        let json = serde_json::to_string(&emission).unwrap();
        assert!(json.contains("nodeId")); // camelCase
    }
}
