//! Error types for container operations

use thiserror::Error;

/// Container operation result type
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that make a container unreadable or unbuildable
///
/// Size disagreements after decompression are not errors; they are reported
/// as [`ContainerWarning`](super::ContainerWarning)s on the decoded container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Buffer ended before a declared region
    #[error("container truncated in {region}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Which part of the container was being read
        region: &'static str,
        /// Bytes the region declares
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// More entries than the 16-bit file count can express
    #[error("too many container entries: {0} (maximum 65535)")]
    TooManyEntries(usize),

    /// Entry or container body does not fit a 24-bit length field
    #[error("entry {id} is {len} bytes, larger than a 24-bit length field")]
    EntryTooLarge {
        /// Entry id (or 0 for the container body)
        id: i32,
        /// Offending length
        len: usize,
    },

    /// Outer envelope compression failed
    #[error("compression error: {0}")]
    Compression(#[from] crate::compression::CompressionError),

    /// Binary read/write error
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}
