//! Node type registry
//!
//! Maps node type strings to factories and their descriptors. The registry
//! is an ordinary value built at startup and passed to whatever assembles
//! the graph; there is no process-wide registration table.
//!
//! # Usage
//!
//! ```ignore
//! use node_engine::NodeRegistry;
//!
//! let mut registry = NodeRegistry::new();
//! stream_nodes::register_builtins(&mut registry, &config);
//!
//! let reader = registry.spawn("nfile-read", ctx)?;
//! reader.send("open", &Value::from("input.bin"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::descriptor::NodeDescriptor;
use crate::error::{NodeError, Result};
use crate::node::{NodeFactory, NodeHandle, NodeInstance};

/// A registration entry combining a descriptor with its factory
struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: Arc<dyn NodeFactory>,
}

/// Registry of node types with their descriptors and factories
///
/// # Composability
///
/// Registries can be composed by merging:
/// ```ignore
/// let mut registry = NodeRegistry::new();
/// // Register built-in nodes...
/// registry.merge(external_registry); // Add plugin nodes
/// ```
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a node factory under the type name from its descriptor
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let descriptor = factory.descriptor();
        log::debug!("registering node type '{}'", descriptor.node_type);
        self.entries.insert(
            descriptor.node_type.clone(),
            RegistryEntry {
                descriptor,
                factory,
            },
        );
    }

    /// Get the descriptor for a node type
    pub fn get_descriptor(&self, node_type: &str) -> Option<&NodeDescriptor> {
        self.entries.get(node_type).map(|e| &e.descriptor)
    }

    /// Get all registered descriptors, ordered by node type
    pub fn all_descriptors(&self) -> Vec<&NodeDescriptor> {
        let mut all: Vec<_> = self.entries.values().map(|e| &e.descriptor).collect();
        all.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        all
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered node type strings
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Create a fresh instance of a node type
    pub fn create(&self, node_type: &str) -> Result<Box<dyn NodeInstance>> {
        self.entries
            .get(node_type)
            .map(|e| e.factory.create())
            .ok_or_else(|| NodeError::UnknownNodeType(node_type.to_string()))
    }

    /// Create an instance and bind it to its execution context
    pub fn spawn(&self, node_type: &str, ctx: ExecutionContext) -> Result<NodeHandle> {
        let entry = self
            .entries
            .get(node_type)
            .ok_or_else(|| NodeError::UnknownNodeType(node_type.to_string()))?;
        log::debug!("spawning '{}' as node '{}'", node_type, ctx.node_id());
        Ok(NodeHandle::new(
            entry.descriptor.clone(),
            entry.factory.create(),
            ctx,
        ))
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same node_type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
