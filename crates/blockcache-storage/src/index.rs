//! Channel index files
//!
//! Each of the five channels has an index file that is a flat array of
//! 6-byte entries; a record id is the position of its entry. An entry holds
//! the record's length and first block, both as 24-bit big-endian integers.

use binrw::{BinRead, BinReaderExt, BinWrite, BinWriterExt};
use blockcache_formats::medium::{parse_medium, write_medium};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{CHANNEL_COUNT, INDEX_ENTRY_SIZE, Result, StorageError, index_file_name};

/// Location of one record in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BinRead, BinWrite)]
#[brw(big)]
pub struct IndexEntry {
    /// Record length in bytes
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub length: u32,

    /// First block of the record's chain
    #[br(parse_with = parse_medium)]
    #[bw(write_with = write_medium)]
    pub start_block: u32,
}

impl IndexEntry {
    /// Entry of a record that holds nothing
    pub const EMPTY: Self = Self::new(0, 0);

    /// Create a new entry.
    pub const fn new(length: u32, start_block: u32) -> Self {
        Self {
            length,
            start_block,
        }
    }

    /// Whether this entry is the empty entry
    pub const fn is_empty(&self) -> bool {
        self.length == 0 && self.start_block == 0
    }

    /// Serialize to the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns an error if either field does not fit in 24 bits
    pub fn to_bytes(&self) -> Result<[u8; INDEX_ENTRY_SIZE]> {
        let mut cursor = Cursor::new([0u8; INDEX_ENTRY_SIZE]);
        cursor.write_be(self)?;
        Ok(cursor.into_inner())
    }

    /// Parse from the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 6 bytes are given
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Cursor::new(bytes).read_be()?)
    }
}

/// The five channel index files of a cache directory
///
/// Each file handle sits behind its own mutex, held for one seek and the
/// read or write that follows it.
pub struct IndexTable {
    dir: PathBuf,
    files: Vec<Mutex<File>>,
}

impl IndexTable {
    /// Open the five index files of `dir` for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns error if any index file is missing or cannot be opened
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir.as_ref(), false)
    }

    /// Create the five index files of `dir`, truncating existing ones.
    ///
    /// # Errors
    ///
    /// Returns error if any index file cannot be created
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let table = Self::open_with(dir.as_ref(), true)?;
        info!("Created {} index files in {}", CHANNEL_COUNT, table.dir.display());
        Ok(table)
    }

    fn open_with(dir: &Path, create: bool) -> Result<Self> {
        let files = (0..CHANNEL_COUNT)
            .map(|channel| {
                let path = dir.join(index_file_name(channel));
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(create)
                    .truncate(create)
                    .open(&path)?;
                debug!("Opened index file {}", path.display());
                Ok(Mutex::new(file))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    /// Directory holding the index files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, channel: u8) -> Result<&Mutex<File>> {
        self.files
            .get(usize::from(channel))
            .ok_or_else(|| StorageError::OutOfRange(format!("channel {channel}")))
    }

    /// Entry of `record_id` in `channel`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the channel does not exist or the record lies
    /// past the end of its index file
    pub fn lookup(&self, channel: impl Into<u8>, record_id: u32) -> Result<IndexEntry> {
        let channel = channel.into();
        let position = u64::from(record_id) * INDEX_ENTRY_SIZE as u64;

        let mut bytes = [0u8; INDEX_ENTRY_SIZE];
        {
            let mut file = self.file(channel)?.lock();
            let len = file.metadata()?.len();
            if position + INDEX_ENTRY_SIZE as u64 > len {
                return Err(StorageError::OutOfRange(format!(
                    "record {record_id} in channel {channel} (index holds {} entries)",
                    len / INDEX_ENTRY_SIZE as u64
                )));
            }
            file.seek(SeekFrom::Start(position))?;
            file.read_exact(&mut bytes)?;
        }

        IndexEntry::from_bytes(&bytes)
    }

    /// Number of entries in `channel`'s index file.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an unknown channel and `Io` if the file
    /// metadata cannot be read
    pub fn entry_count(&self, channel: impl Into<u8>) -> Result<u32> {
        let channel = channel.into();
        let len = self.file(channel)?.lock().metadata()?.len();
        u32::try_from(len / INDEX_ENTRY_SIZE as u64).map_err(|_| {
            StorageError::OutOfRange(format!("index of channel {channel} holds {len} bytes"))
        })
    }

    /// All entries of `channel` in record order.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an unknown channel and `Io` if the file
    /// cannot be read
    pub fn list_all(&self, channel: impl Into<u8>) -> Result<Vec<IndexEntry>> {
        let channel = channel.into();
        let mut bytes = Vec::new();
        {
            let mut file = self.file(channel)?.lock();
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut bytes)?;
        }

        // A trailing partial entry is not addressable
        bytes
            .chunks_exact(INDEX_ENTRY_SIZE)
            .map(IndexEntry::from_bytes)
            .collect()
    }

    /// Overwrite the entry of `record_id` in `channel`.
    ///
    /// Storing past the end grows the file; skipped records read back as
    /// empty entries.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an unknown channel or an entry field wider
    /// than 24 bits, and `Io` if writing fails
    pub fn store(&self, channel: impl Into<u8>, record_id: u32, entry: IndexEntry) -> Result<()> {
        let channel = channel.into();
        let bytes = entry.to_bytes().map_err(|_| {
            StorageError::OutOfRange(format!(
                "entry {entry:?} for record {record_id} does not fit in 24-bit fields"
            ))
        })?;
        let position = u64::from(record_id) * INDEX_ENTRY_SIZE as u64;

        {
            let mut file = self.file(channel)?.lock();
            file.seek(SeekFrom::Start(position))?;
            file.write_all(&bytes)?;
        }

        debug!(
            "Stored record {} of channel {}: {} bytes at block {}",
            record_id, channel, entry.length, entry.start_block
        );
        Ok(())
    }

    /// Flush every index file to disk.
    ///
    /// # Errors
    ///
    /// Returns error if any flush fails
    pub fn flush(&self) -> Result<()> {
        for file in &self.files {
            let mut file = file.lock();
            file.flush()?;
            file.sync_data()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for IndexTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexTable")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Write a fresh index file holding `entries` in record order.
///
/// # Errors
///
/// Returns error if an entry cannot be encoded or the file cannot be written
pub fn write_index_file(path: impl AsRef<Path>, entries: &[IndexEntry]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        writer.write_all(&entry.to_bytes()?)?;
    }
    writer.flush()?;

    debug!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Channel;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn new_table() -> (TempDir, IndexTable) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let table = IndexTable::create(dir.path()).expect("create");
        (dir, table)
    }

    #[test]
    fn test_entry_layout() {
        let entry = IndexEntry::new(0x01_0203, 0x04_0506);
        let bytes = entry.to_bytes().expect("encode");
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6]);
        assert_eq!(IndexEntry::from_bytes(&bytes).expect("decode"), entry);
    }

    #[test]
    fn test_entry_rejects_wide_fields() {
        assert!(IndexEntry::new(0x0100_0000, 1).to_bytes().is_err());
        assert!(IndexEntry::new(1, 0x0100_0000).to_bytes().is_err());
    }

    #[test]
    fn test_single_entry_round_trip() {
        let (dir, table) = new_table();
        table
            .store(Channel::Archive, 0, IndexEntry::new(512, 1))
            .expect("store");

        let bytes = std::fs::read(dir.path().join("main_file_cache.idx0")).expect("read");
        assert_eq!(bytes, vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(
            table.lookup(Channel::Archive, 0).expect("lookup"),
            IndexEntry::new(512, 1)
        );
        assert_eq!(table.entry_count(Channel::Archive).expect("count"), 1);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let (_dir, table) = new_table();
        table.store(1u8, 0, IndexEntry::new(3, 1)).expect("store");

        assert!(matches!(
            table.lookup(1u8, 1),
            Err(StorageError::OutOfRange(_))
        ));
        assert!(matches!(
            table.lookup(CHANNEL_COUNT, 0),
            Err(StorageError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_store_past_end_leaves_empty_gap() {
        let (_dir, table) = new_table();
        table
            .store(Channel::Map, 3, IndexEntry::new(10, 7))
            .expect("store");

        let entries = table.list_all(Channel::Map).expect("list");
        assert_eq!(entries.len(), 4);
        assert!(entries[..3].iter().all(IndexEntry::is_empty));
        assert_eq!(entries[3], IndexEntry::new(10, 7));
    }

    #[test]
    fn test_store_overwrites() {
        let (_dir, table) = new_table();
        table.store(Channel::Music, 0, IndexEntry::new(1, 1)).expect("store");
        table.store(Channel::Music, 1, IndexEntry::new(2, 2)).expect("store");
        table.store(Channel::Music, 0, IndexEntry::new(9, 9)).expect("store");

        assert_eq!(
            table.list_all(Channel::Music).expect("list"),
            vec![IndexEntry::new(9, 9), IndexEntry::new(2, 2)]
        );
    }

    #[test]
    fn test_open_requires_existing_files() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        assert!(matches!(
            IndexTable::open(dir.path()),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn test_write_index_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("main_file_cache.idx2");
        write_index_file(&path, &[IndexEntry::EMPTY, IndexEntry::new(5, 2)]).expect("write");
        assert_eq!(
            std::fs::read(&path).expect("read"),
            vec![0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 2]
        );
    }
}
