//! Item definition error types

use thiserror::Error;

/// Item definition codec error type
#[derive(Debug, Error)]
pub enum ItemError {
    /// Opcode not in the item definition table
    #[error("unknown opcode {opcode} in item definition {record}")]
    UnknownOpcode {
        /// The offending opcode
        opcode: u8,
        /// Index of the record being decoded
        record: usize,
    },

    /// Record data ended before its terminator
    #[error("item definition {record} is truncated")]
    Truncated {
        /// Index of the record being decoded
        record: usize,
    },

    /// Index buffer shorter than its declared record count
    #[error("item index declares {declared} records but holds {available} bytes")]
    IndexTruncated {
        /// Record count from the index header
        declared: u16,
        /// Bytes in the index buffer
        available: usize,
    },

    /// More records than a 16-bit count can express
    #[error("too many item definitions: {0} (maximum 65535)")]
    TooManyRecords(usize),

    /// Encoded record longer than a 16-bit length can express
    #[error("item definition {record} encodes to {len} bytes (maximum 65535)")]
    RecordTooLarge {
        /// Index of the record being encoded
        record: usize,
        /// Encoded length
        len: usize,
    },

    /// Recolor table longer than an 8-bit count can express
    #[error("item definition {record} has {len} recolors (maximum 255)")]
    RecolorTableTooLarge {
        /// Index of the record being encoded
        record: usize,
        /// Table length
        len: usize,
    },

    /// Text that cannot be written as terminated Latin-1
    #[error("item definition {record} has unencodable text {text:?}")]
    InvalidText {
        /// Index of the record being encoded
        record: usize,
        /// The offending text
        text: String,
    },

    /// Numeric attribute outside its operand range
    #[error("item definition {record}: {field} value {value} is out of range")]
    ValueOutOfRange {
        /// Index of the record being encoded
        record: usize,
        /// Attribute name
        field: &'static str,
        /// Offending value
        value: i64,
    },

    /// Item id past the end of the archive
    #[error("item definition {id} does not exist ({len} definitions)")]
    RecordOutOfRange {
        /// Requested id
        id: usize,
        /// Number of definitions in the archive
        len: usize,
    },

    /// Binary read/write error
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for item definition operations
pub type ItemResult<T> = Result<T, ItemError>;
