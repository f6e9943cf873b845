//! Container envelope and descriptor table structures

use binrw::{BinRead, BinWrite};

use crate::medium::{parse_medium, write_medium};

/// Size of the outer envelope in bytes.
pub const ENVELOPE_SIZE: usize = 6;

/// Size of the file count field in bytes.
pub const COUNT_SIZE: usize = 2;

/// Size of one entry descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 10;

/// Outer envelope wrapping a whole container
///
/// Equal lengths mean the body that follows is stored raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct Envelope {
    /// Length of the container body once decompressed
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub decompressed_len: u32,
    /// Length of the body as stored
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub stored_len: u32,
}

impl Envelope {
    /// Whether the body is stored compressed.
    pub const fn is_compressed(&self) -> bool {
        self.decompressed_len != self.stored_len
    }
}

/// One row of the descriptor table (10 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct EntryDescriptor {
    /// Hashed sub-file name, see [`name_hash`](super::name_hash)
    pub id: i32,
    /// Payload length once decompressed
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub decompressed_len: u32,
    /// Payload length as stored in the container
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub stored_len: u32,
}

impl EntryDescriptor {
    /// Whether the payload is stored compressed.
    pub const fn is_compressed(&self) -> bool {
        self.decompressed_len != self.stored_len
    }
}
