//! Repacking a cache into a fresh data file and index files.
//!
//! The compactor walks every chain referenced by a non-empty index entry,
//! captures each block verbatim (header included) and writes the captured
//! blocks into a new data file at their original block numbers. Blocks that
//! no entry reaches are left out, so space abandoned by rewritten files is
//! dropped from the copy. The index files are copied entry for entry.
//!
//! Only the payload bytes a chain actually uses are captured. When several
//! entries reach the same block, the longest capture of it is kept. Every
//! block but the last one written is zero-padded back to a full chunk, so
//! the new data file ends exactly where the last chain's data ends.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::block::{BlockStore, RawBlock, block_offset};
use crate::index::{IndexEntry, IndexTable, write_index_file};
use crate::{CHANNEL_COUNT, CHUNK_SIZE, DATA_FILE, Result, StorageError, index_file_name};

/// Outcome of a compaction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Blocks written to the new data file
    pub blocks_written: usize,
    /// Entries written per channel
    pub entries: [u32; CHANNEL_COUNT as usize],
    /// Length of the new data file in bytes
    pub data_file_len: u64,
}

/// Copies the reachable part of a cache into another directory
pub struct Compactor<'a> {
    index: &'a IndexTable,
    store: &'a BlockStore,
}

impl<'a> Compactor<'a> {
    /// Create a compactor reading from `index` and `store`.
    pub const fn new(index: &'a IndexTable, store: &'a BlockStore) -> Self {
        Self { index, store }
    }

    /// Write the compacted cache into `out_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `EndOfStream` if the source data file ends inside a block,
    /// and `Io` if the output cannot be written
    pub fn compact(&self, out_dir: impl AsRef<Path>) -> Result<CompactionReport> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;

        let mut report = CompactionReport::default();
        let mut channels = Vec::with_capacity(usize::from(CHANNEL_COUNT));
        for channel in 0..CHANNEL_COUNT {
            let entries = self.index.list_all(channel)?;
            report.entries[usize::from(channel)] = u32::try_from(entries.len()).map_err(|_| {
                StorageError::OutOfRange(format!("channel {channel} holds too many entries"))
            })?;
            channels.push(entries);
        }

        let blocks = self.capture_blocks(&channels)?;
        report.blocks_written = blocks.len();
        report.data_file_len = write_data_file(&out_dir.join(DATA_FILE), &blocks)?;

        for (channel, entries) in (0..CHANNEL_COUNT).zip(&channels) {
            write_index_file(out_dir.join(index_file_name(channel)), entries)?;
        }

        info!(
            "Compacted {} blocks into {} ({} bytes)",
            report.blocks_written,
            out_dir.display(),
            report.data_file_len
        );
        Ok(report)
    }

    /// Capture every block reachable from a non-empty entry.
    fn capture_blocks(&self, channels: &[Vec<IndexEntry>]) -> Result<BTreeMap<u32, RawBlock>> {
        let mut blocks = BTreeMap::new();

        for (channel, entries) in channels.iter().enumerate() {
            for (record, entry) in entries.iter().enumerate() {
                if entry.is_empty() {
                    continue;
                }

                let mut block = entry.start_block;
                let mut remaining = entry.length as usize;
                while remaining > 0 {
                    if block == 0 {
                        warn!(
                            "Chain of record {} in channel {} ends {} bytes early",
                            record, channel, remaining
                        );
                        break;
                    }

                    let take = remaining.min(CHUNK_SIZE);
                    let raw = self.store.read_block(block, take).map_err(|e| match e {
                        StorageError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
                            StorageError::EndOfStream { block }
                        }
                        other => other,
                    })?;

                    let next = raw.header.next_block;
                    // Chains sharing a block keep the longest capture
                    match blocks.entry(block) {
                        Entry::Vacant(slot) => {
                            slot.insert(raw);
                        }
                        Entry::Occupied(mut slot) => {
                            if raw.payload.len() > slot.get().payload.len() {
                                slot.insert(raw);
                            }
                        }
                    }
                    remaining -= take;
                    block = next;
                }
            }
            debug!("Captured chains of channel {}", channel);
        }

        Ok(blocks)
    }
}

/// Write captured blocks at their block offsets, returning the file length.
fn write_data_file(path: &Path, blocks: &BTreeMap<u32, RawBlock>) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    let last = blocks.keys().next_back().copied();

    for (&block, raw) in blocks {
        writer.seek(SeekFrom::Start(block_offset(block)))?;
        writer.write_all(&raw.to_bytes(Some(block) != last)?)?;
    }
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| StorageError::Io(e.into_error()))?;
    Ok(file.metadata()?.len())
}
