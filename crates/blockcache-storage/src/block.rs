//! Block chains in the data file
//!
//! The data file is an array of 520-byte blocks. Each block starts with an
//! 8-byte big-endian header:
//!
//! ```text
//! [owner:u16][chunk:u16][next_block:u24][block_type:u8]
//! ```
//!
//! followed by up to 512 payload bytes. A file occupies a chain of blocks
//! linked through `next_block`; its index entry supplies the start block and
//! the total length, which is what decides how many payload bytes the last
//! block contributes. Block 0 is reserved and a `next_block` of 0 ends the
//! chain.

use binrw::{BinRead, BinReaderExt, BinWrite, BinWriterExt};
use blockcache_formats::medium::{parse_medium, write_medium};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

use crate::index::IndexEntry;
use crate::{BLOCK_SIZE, CHUNK_SIZE, HEADER_SIZE, MEDIUM_MAX, Result, StorageError};

/// Block type tag from the last header byte
///
/// The tag is informational. Payload bytes are read the same way whatever
/// the tag says, and unknown tags are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    /// Raw payload
    #[default]
    Uncompressed,
    /// Headerless bzip2 payload
    BZip2,
    /// Gzip payload
    GZip,
    /// Any other tag value
    Unknown(u8),
}

impl From<u8> for BlockType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Uncompressed,
            1 => Self::BZip2,
            2 => Self::GZip,
            other => Self::Unknown(other),
        }
    }
}

impl From<BlockType> for u8 {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Uncompressed => 0,
            BlockType::BZip2 => 1,
            BlockType::GZip => 2,
            BlockType::Unknown(other) => other,
        }
    }
}

/// 8-byte block header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct BlockHeader {
    /// Record id of the file owning this block (truncated to 16 bits)
    pub owner: u16,
    /// Position of this block within its chain
    pub chunk: u16,
    /// Next block of the chain, 0 for the last one
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub next_block: u32,
    /// Type tag
    #[br(map = |raw: u8| BlockType::from(raw))]
    #[bw(map = |t: &BlockType| u8::from(*t))]
    pub block_type: BlockType,
}

impl BlockHeader {
    /// Serialize to the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns an error if `next_block` does not fit in 24 bits
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut cursor = Cursor::new([0u8; HEADER_SIZE]);
        cursor.write_be(self)?;
        Ok(cursor.into_inner())
    }

    /// Parse from the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 8 bytes are given
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Cursor::new(bytes).read_be()?)
    }
}

/// A block as captured from disk: header plus the payload bytes in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Block header
    pub header: BlockHeader,
    /// Payload, at most [`CHUNK_SIZE`] bytes
    pub payload: Vec<u8>,
}

impl RawBlock {
    /// Serialize header and payload, optionally zero-padding the payload to
    /// a full chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be encoded or the payload
    /// exceeds one chunk
    pub fn to_bytes(&self, pad: bool) -> Result<Vec<u8>> {
        if self.payload.len() > CHUNK_SIZE {
            return Err(StorageError::OutOfRange(format!(
                "block payload of {} bytes (maximum {CHUNK_SIZE})",
                self.payload.len()
            )));
        }

        let mut bytes = Vec::with_capacity(BLOCK_SIZE);
        bytes.extend_from_slice(&self.header.to_bytes()?);
        bytes.extend_from_slice(&self.payload);
        if pad {
            bytes.resize(BLOCK_SIZE, 0);
        }
        Ok(bytes)
    }
}

/// Byte offset of a block in the data file
pub(crate) const fn block_offset(block: u32) -> u64 {
    block as u64 * BLOCK_SIZE as u64
}

/// Reader and writer for the block chains of one data file
///
/// The file handle sits behind a mutex that is held for one seek and the
/// read or write that follows it. New chains take their blocks from a
/// counter that only grows, so space of overwritten files is never reused
/// until the cache is compacted.
pub struct BlockStore {
    path: PathBuf,
    file: Mutex<File>,
    next_free: AtomicU32,
}

impl BlockStore {
    /// Open an existing data file for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or is too large to address
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();

        let blocks = len.div_ceil(BLOCK_SIZE as u64).max(1);
        let next_free = u32::try_from(blocks).map_err(|_| {
            StorageError::OutOfRange(format!("data file of {len} bytes has too many blocks"))
        })?;

        debug!(
            "Opened data file {} ({} bytes, next free block {})",
            path.display(),
            len,
            next_free
        );

        Ok(Self {
            path,
            file: Mutex::new(file),
            next_free: AtomicU32::new(next_free),
        })
    }

    /// Create (or truncate) a data file holding only the reserved block 0.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(&[0u8; BLOCK_SIZE])?;

        info!("Created data file {}", path.display());

        Ok(Self {
            path,
            file: Mutex::new(file),
            next_free: AtomicU32::new(1),
        })
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block number the next chain will start at
    pub fn next_free_block(&self) -> u32 {
        self.next_free.load(Ordering::SeqCst)
    }

    /// Read one block: its header and the first `payload_len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the data file ends inside the requested range and
    /// `OutOfRange` if `payload_len` exceeds one chunk
    pub fn read_block(&self, block: u32, payload_len: usize) -> Result<RawBlock> {
        if payload_len > CHUNK_SIZE {
            return Err(StorageError::OutOfRange(format!(
                "payload of {payload_len} bytes requested from block {block}"
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        let mut payload = vec![0u8; payload_len];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(block_offset(block)))?;
            file.read_exact(&mut header)?;
            file.read_exact(&mut payload)?;
        }

        Ok(RawBlock {
            header: BlockHeader::from_bytes(&header)?,
            payload,
        })
    }

    /// Read `length` bytes from the chain starting at `start_block`.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedChain` if the chain reaches block 0 before `length`
    /// bytes were read, and `Io` if the data file ends inside a block
    pub fn read_chain(&self, start_block: u32, length: u32) -> Result<Vec<u8>> {
        let expected = length as usize;
        let mut data = Vec::with_capacity(expected);
        let mut block = start_block;

        while data.len() < expected {
            if block == 0 {
                return Err(StorageError::TruncatedChain {
                    start_block,
                    block,
                    read: data.len(),
                    expected,
                });
            }

            let take = (expected - data.len()).min(CHUNK_SIZE);
            let raw = self.read_block(block, take)?;
            data.extend_from_slice(&raw.payload);
            block = raw.header.next_block;
        }

        debug!(
            "Read {} bytes from chain starting at block {}",
            data.len(),
            start_block
        );
        Ok(data)
    }

    /// Read the chain an index entry points at.
    ///
    /// # Errors
    ///
    /// See [`Self::read_chain`]
    pub fn read_entry(&self, entry: IndexEntry) -> Result<Vec<u8>> {
        self.read_chain(entry.start_block, entry.length)
    }

    /// Write `data` to freshly allocated blocks, returning the entry that
    /// addresses it.
    ///
    /// Blocks are consecutive, numbered from [`Self::next_free_block`], and
    /// tagged with `owner` and their chunk position. Empty data allocates
    /// nothing and yields the empty entry.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the length or the last block number does not
    /// fit in 24 bits, and `Io` if writing fails
    pub fn write_chain(&self, data: &[u8], owner: u16) -> Result<IndexEntry> {
        if data.is_empty() {
            return Ok(IndexEntry::EMPTY);
        }

        let length = u32::try_from(data.len())
            .ok()
            .filter(|len| *len <= MEDIUM_MAX)
            .ok_or_else(|| {
                StorageError::OutOfRange(format!("chain length {} exceeds 24 bits", data.len()))
            })?;

        // At most 32768 blocks, since length fits in 24 bits
        let count = data.len().div_ceil(CHUNK_SIZE) as u32;
        // Reserve only when the whole chain stays addressable
        let start_block = self
            .next_free
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                next.checked_add(count - 1)
                    .filter(|last| *last <= MEDIUM_MAX)
                    .map(|last| last + 1)
            })
            .map_err(|next| {
                StorageError::OutOfRange(format!(
                    "chain of {count} blocks at block {next} exceeds 24-bit block numbers"
                ))
            })?;
        let last_block = start_block + (count - 1);

        for (chunk, payload) in data.chunks(CHUNK_SIZE).enumerate() {
            let block = start_block + chunk as u32;
            let next_block = if block == last_block { 0 } else { block + 1 };
            let raw = RawBlock {
                header: BlockHeader {
                    owner,
                    chunk: chunk as u16,
                    next_block,
                    block_type: BlockType::Uncompressed,
                },
                payload: payload.to_vec(),
            };
            self.write_block(block, &raw, true)?;
        }

        debug!(
            "Wrote {} bytes to blocks {}..={} for owner {}",
            length, start_block, last_block, owner
        );
        Ok(IndexEntry::new(length, start_block))
    }

    /// Write one block at its position, zero-padding the payload when `pad`
    /// is set.
    ///
    /// This does not move the allocator; callers placing blocks by hand own
    /// the block numbers they use.
    ///
    /// # Errors
    ///
    /// Returns error if the block cannot be encoded or written
    pub fn write_block(&self, block: u32, raw: &RawBlock, pad: bool) -> Result<()> {
        let bytes = raw.to_bytes(pad)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(block_offset(block)))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Flush buffered writes to disk.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying flush fails
    pub fn flush(&self) -> Result<()> {
        let mut file = self.file.lock();
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    /// Current length of the data file in bytes
    ///
    /// # Errors
    ///
    /// Returns error if the file metadata cannot be read
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("path", &self.path)
            .field("next_free", &self.next_free_block())
            .finish_non_exhaustive()
    }
}
