//! Node descriptors
//!
//! A [`NodeDescriptor`] is what the host needs to place a node in a graph:
//! its type name, a description, and the fixed vocabulary of input and
//! output ports. Each node family builds its descriptor next to its
//! implementation so the two cannot drift apart.

use serde::{Deserialize, Serialize};

/// Metadata for one input or output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescriptor {
    /// Port name, as used in messages and emissions
    pub name: String,
    /// What the port carries or triggers
    pub description: String,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Complete metadata for a node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Unique type identifier (e.g., "zlib-inflate")
    pub node_type: String,
    /// Description of what the node does
    pub description: String,
    /// Input ports, in declaration order
    pub inputs: Vec<PortDescriptor>,
    /// Output ports, in declaration order
    pub outputs: Vec<PortDescriptor>,
}

impl NodeDescriptor {
    /// Start a descriptor with no ports
    pub fn new(node_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            description: description.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input port
    pub fn input(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.inputs.push(PortDescriptor::new(name, description));
        self
    }

    /// Add an output port
    pub fn output(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.outputs.push(PortDescriptor::new(name, description));
        self
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|p| p.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|p| p.name == name)
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|p| p.name.as_str()).collect()
    }
}
