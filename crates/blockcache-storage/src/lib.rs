//! On-disk engine for the legacy block cache.
//!
//! A cache directory holds one data file split into fixed-size blocks and
//! five index files, one per channel. An index entry names a file's length
//! and first block; the file's bytes are spread over a linked chain of
//! blocks, each carrying an 8-byte header and up to 512 payload bytes.
//!
//! - **Block store**: Reads and writes block chains in the data file
//! - **Index table**: Reads and writes the 6-byte entries of each channel
//! - **Compactor**: Repacks every reachable block into a fresh cache
//! - **Cache**: Ties both together with the container and item codecs
//!
//! # Storage Layout
//!
//! ```text
//! <cache_dir>/main_file_cache.dat     blocks of [header:8][payload:512]
//! <cache_dir>/main_file_cache.idx0-4  entries of [length:u24][start_block:u24]
//! ```
//!
//! Block 0 is never part of a chain; a next-block pointer of 0 ends one.
//!
//! # Example
//!
//! ```rust,no_run
//! use blockcache_storage::{Cache, Channel};
//! use blockcache_formats::container::ArchiveId;
//!
//! # fn example() -> blockcache_storage::Result<()> {
//! let cache = Cache::open_dir("/path/to/cache")?;
//! let config = cache.read_container(Channel::Archive, ArchiveId::Config.record_id())?;
//! println!("config archive holds {} files", config.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use blockcache_formats::{CompressionError, ContainerError, ItemError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Block chains in the data file
pub mod block;

// Channel index files
pub mod index;

// Repacking into a fresh cache
pub mod compaction;

// High-level cache access
pub mod cache;

// Configuration
pub mod config;

pub use block::{BlockHeader, BlockStore, BlockType, RawBlock};
pub use cache::Cache;
pub use compaction::{CompactionReport, Compactor};
pub use config::StorageConfig;
pub use index::{IndexEntry, IndexTable};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel, record or block outside the addressable range.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A chain ended before delivering the length its entry declares.
    #[error(
        "Truncated chain starting at block {start_block}: block {block} reached after \
         {read} of {expected} bytes"
    )]
    TruncatedChain {
        /// First block of the chain
        start_block: u32,
        /// Block number where reading stopped
        block: u32,
        /// Bytes read before stopping
        read: usize,
        /// Length declared by the index entry
        expected: usize,
    },

    /// The data file ended in the middle of a block.
    #[error("Unexpected end of data file in block {block}")]
    EndOfStream {
        /// Block being read
        block: u32,
    },

    /// A container dropped damaged entries while parsing, so writing it
    /// back would lose them.
    #[error("Container {record_id} has damaged entries {skipped:?}; refusing to rewrite it")]
    DamagedContainer {
        /// Record id of the container
        record_id: u32,
        /// Ids of the entries that could not be decoded
        skipped: Vec<i32>,
    },

    /// Record not present in the cache.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Container decoding or encoding failed.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Item definition decoding or encoding failed.
    #[error("Item definition error: {0}")]
    Item(#[from] ItemError),

    /// Compression failed.
    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Binary layout error.
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Version information for the storage system.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data file name inside a cache directory.
pub const DATA_FILE: &str = "main_file_cache.dat";

/// Index file name prefix; the channel number is appended.
pub const INDEX_FILE_PREFIX: &str = "main_file_cache.idx";

/// Payload bytes per block.
pub const CHUNK_SIZE: usize = 512;

/// Header bytes per block.
pub const HEADER_SIZE: usize = 8;

/// Bytes per block (header + payload).
pub const BLOCK_SIZE: usize = HEADER_SIZE + CHUNK_SIZE;

/// Bytes per index entry.
pub const INDEX_ENTRY_SIZE: usize = 6;

/// Number of index channels.
pub const CHANNEL_COUNT: u8 = 5;

/// Largest length or block number an entry or header can hold.
pub use blockcache_formats::medium::MEDIUM_MAX;

/// File name of the index for `channel`.
pub fn index_file_name(channel: u8) -> String {
    format!("{INDEX_FILE_PREFIX}{channel}")
}

/// The five index channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Containers: title, config, interface, media, ...
    Archive = 0,
    /// 3D models
    Model = 1,
    /// Animation frames
    Animation = 2,
    /// MIDI music
    Music = 3,
    /// Map regions
    Map = 4,
}

impl Channel {
    /// All channels in index order.
    pub const ALL: [Self; CHANNEL_COUNT as usize] = [
        Self::Archive,
        Self::Model,
        Self::Animation,
        Self::Music,
        Self::Map,
    ];
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel as Self
    }
}

impl TryFrom<u8> for Channel {
    type Error = StorageError;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| StorageError::OutOfRange(format!("channel {value}")))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_block_geometry() {
        assert_eq!(BLOCK_SIZE, 520);
        assert_eq!(index_file_name(3), "main_file_cache.idx3");
    }

    #[test]
    fn test_channel_conversion() {
        for channel in Channel::ALL {
            let raw = u8::from(channel);
            assert_eq!(Channel::try_from(raw).expect("valid channel"), channel);
        }
        assert!(matches!(
            Channel::try_from(CHANNEL_COUNT),
            Err(StorageError::OutOfRange(_))
        ));
    }
}
