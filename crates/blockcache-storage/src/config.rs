//! Configuration for the storage system

use blockcache_formats::{FemaleModelLayout, OuterCompression};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

/// Configuration for the storage system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the data and index files
    pub cache_dir: PathBuf,

    /// Create an empty cache when the directory holds none
    pub create_if_missing: bool,

    /// Whole-body compression for containers written back to the cache
    pub outer_compression: OuterCompression,

    /// Compress container entries rewritten by the cache
    pub compress_entries: bool,

    /// Operand layout of item opcode 26
    pub female_model_layout: FemaleModelLayout,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            create_if_missing: false,
            outer_compression: OuterCompression::None,
            compress_entries: true,
            female_model_layout: FemaleModelLayout::Plain,
        }
    }
}

impl StorageConfig {
    /// Create a new configuration for the specified cache directory
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| StorageError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a configuration from JSON text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON for this configuration
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Serialize the configuration as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Set the cache directory
    #[must_use]
    pub fn with_cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Create an empty cache when none exists
    #[must_use]
    pub const fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Set the outer compression of written containers
    #[must_use]
    pub const fn with_outer_compression(mut self, compression: OuterCompression) -> Self {
        self.outer_compression = compression;
        self
    }

    /// Enable or disable compression of rewritten container entries
    #[must_use]
    pub const fn with_compress_entries(mut self, compress: bool) -> Self {
        self.compress_entries = compress;
        self
    }

    /// Set the opcode 26 layout
    #[must_use]
    pub const fn with_female_model_layout(mut self, layout: FemaleModelLayout) -> Self {
        self.female_model_layout = layout;
        self
    }
}
