//! Owned byte payloads carried by queued commands

use std::fmt;

use node_engine::{Result, Value};

/// Bytes copied out of a vector or string value at message time
///
/// The host's value is only borrowed for the duration of dispatch, so any
/// command that waits in a mailbox owns its bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Copy the bytes of a vector or string value
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self(value.vector_or_string()?.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Commands are logged; keep the bytes out of it
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
