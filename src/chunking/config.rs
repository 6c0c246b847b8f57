// src/chunking/config.rs
use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Boundary markers tried, in order, when a paragraph must be force-split:
/// paragraph break, line break, sentence end, word gap.
pub fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ". ", " "].iter().map(|s| s.to_string()).collect()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

/// Chunker settings. Sizes are counted in characters.
///
/// Missing fields in a JSON config file fall back to their defaults, so
/// `{"chunk_size": 1024}` is a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: default_separators(),
        }
    }
}

impl ChunkerConfig {
    /// Loads a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded chunker config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Rejects settings the force-split loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        if self.separators.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::EmptySeparator);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(chunk_size: usize, chunk_overlap: usize) -> ChunkerConfig {
        ChunkerConfig { chunk_size, chunk_overlap, ..ChunkerConfig::default() }
    }

    #[test]
    fn test_defaults() {
        let config = ChunkerConfig::default();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.separators, vec!["\n\n", "\n", ". ", " "]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(sized(0, 0).validate(), Err(ConfigError::InvalidChunkSize)));
        assert!(matches!(
            sized(100, 100).validate(),
            Err(ConfigError::OverlapTooLarge { overlap: 100, size: 100 })
        ));

        let mut config = sized(100, 10);
        config.separators.push(String::new());
        assert!(matches!(config.validate(), Err(ConfigError::EmptySeparator)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunker.json");
        std::fs::write(&path, r#"{"chunk_size": 1024}"#).unwrap();

        let config = ChunkerConfig::from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.separators, default_separators());
    }

    #[test]
    fn test_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(ChunkerConfig::from_file(&missing), Err(ConfigError::Read { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ chunk_size: ").unwrap();
        assert!(matches!(ChunkerConfig::from_file(&broken), Err(ConfigError::Parse { .. })));
    }
}
