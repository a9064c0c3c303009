//! Configuration shared by the built-in nodes

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};

/// Default values for [`EngineConfig`]
pub mod defaults {
    /// Size of each output chunk emitted by the codec nodes
    pub const CHUNK_SIZE: usize = 1024;
    /// Compression level used when deflation starts implicitly
    pub const DEFLATE_LEVEL: i32 = 6;
}

/// Engine-wide node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of each output chunk emitted by the codec nodes
    pub chunk_size: usize,
    /// Compression level used when `in` arrives before `start` (-1..=9)
    pub default_deflate_level: i32,
    /// Directory relative file paths are resolved against
    /// (the process working directory when unset)
    pub file_root: Option<PathBuf>,
    /// Create missing parent directories when opening a file for writing
    pub create_parent_dirs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            default_deflate_level: defaults::DEFLATE_LEVEL,
            file_root: None,
            create_parent_dirs: false,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NodeError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("loaded engine config from '{}'", path.display());
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(NodeError::Config("chunk_size must be positive".to_string()));
        }
        if !(-1..=9).contains(&self.default_deflate_level) {
            return Err(NodeError::Config(format!(
                "default_deflate_level {} is out of range (0~9 or -1)",
                self.default_deflate_level
            )));
        }
        Ok(())
    }

    /// Resolve a node-supplied path against `file_root`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.file_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.default_deflate_level, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"file_root": "/data", "create_parent_dirs": true}}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.file_root, Some(PathBuf::from("/data")));
        assert!(config.create_parent_dirs);
        assert_eq!(config.chunk_size, defaults::CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_deflate_level": 12}}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(NodeError::Config(_))
        ));

        let config = EngineConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/engine.json"),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_path() {
        let config = EngineConfig {
            file_root: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        assert_eq!(config.resolve_path(Path::new("a.bin")), PathBuf::from("/data/a.bin"));
        assert_eq!(config.resolve_path(Path::new("/abs/b.bin")), PathBuf::from("/abs/b.bin"));

        let config = EngineConfig::default();
        assert_eq!(config.resolve_path(Path::new("a.bin")), PathBuf::from("a.bin"));
    }
}
