//! Stream Nodes
//!
//! Built-in stateful stream nodes for the node engine.
//!
//! # Families
//!
//! - **Codec**: `zlib-inflate` and `zlib-deflate`, incremental zlib
//!   streams with chunked output
//! - **I/O**: `nfile-read` and `nfile-write`, sequential access to native
//!   files
//!
//! Nothing is registered implicitly; hosts call [`register_builtins`] on the
//! registry they build at startup.

pub mod codec;
pub mod io;
pub mod payload;

use std::sync::Arc;

use node_engine::{EngineConfig, NodeRegistry};

pub use codec::{ZlibDeflateFactory, ZlibInflateFactory};
pub use io::{NativeFileReadFactory, NativeFileWriteFactory};
pub use payload::Payload;

/// Register every built-in node type, configured by `config`
pub fn register_builtins(registry: &mut NodeRegistry, config: &EngineConfig) {
    registry.register(Arc::new(ZlibInflateFactory::new(config.clone())));
    registry.register(Arc::new(ZlibDeflateFactory::new(config.clone())));
    registry.register(Arc::new(NativeFileReadFactory::new(config.clone())));
    registry.register(Arc::new(NativeFileWriteFactory::new(config.clone())));
}

/// A registry holding only the built-in node types
pub fn builtin_registry(config: &EngineConfig) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_builtins(&mut registry, config);
    registry
}
