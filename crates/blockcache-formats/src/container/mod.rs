//! Container archive codec
//!
//! A container packs many sub-files into one byte stream. The stream is
//! itself stored inside a block chain, so the layout is built for sequential
//! reading:
//!
//! ```text
//! [decompressed_len:u24][stored_len:u24]            outer envelope
//! [count:u16]                                       body starts here
//! count x [id:i32][decompressed_len:u24][stored_len:u24]
//! payload bytes, one region per descriptor, in table order
//! ```
//!
//! Both the body and each individual payload are bzip2-compressed
//! (headerless, see [`crate::compression`]) whenever their two lengths
//! differ.
//!
//! Decoding is permissive in the same places the game client is: an outer
//! body that decompresses to an unexpected length is kept, and a payload
//! that fails to decompress to its declared length is dropped on its own
//! while the rest of the container is still returned. Both cases are logged
//! and recorded in [`Container::warnings`].
//!
//! # Example
//!
//! ```rust
//! use blockcache_formats::container::{Container, OuterCompression, name_hash};
//!
//! let mut container = Container::new();
//! container.insert_named("obj.idx", vec![0, 1, 0, 4], false);
//! container.insert_named("obj.dat", b"payload".to_vec(), true);
//!
//! let bytes = container.build(OuterCompression::None)?;
//! let parsed = Container::parse(&bytes)?;
//! assert_eq!(parsed.get(name_hash("OBJ.IDX")), Some(&[0u8, 1, 0, 4][..]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod header;
mod name;

pub use error::{ContainerError, ContainerResult};
pub use header::{COUNT_SIZE, DESCRIPTOR_SIZE, ENVELOPE_SIZE, EntryDescriptor, Envelope};
pub use name::{ArchiveId, name_hash};

use binrw::{BinReaderExt, BinWriterExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::compression;
use crate::medium::MEDIUM_MAX;

/// Whether the whole container body is compressed when building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OuterCompression {
    /// Envelope lengths are equal and the body is stored raw
    #[default]
    None,
    /// Body is bzip2-compressed
    #[serde(rename = "bzip2")]
    BZip2,
}

/// A decoded sub-file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Hashed name
    pub id: i32,
    /// Decompressed payload
    pub data: Vec<u8>,
    /// Whether the payload is compressed when the container is built
    pub compressed: bool,
}

/// Non-fatal problem found while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerWarning {
    /// The outer body decompressed to a different length than declared
    OuterSizeMismatch {
        /// Length from the envelope
        expected: u32,
        /// Length actually produced
        actual: usize,
    },
    /// An entry was dropped from the decoded file set
    EntrySkipped {
        /// Entry id
        id: i32,
        /// Why it was dropped
        reason: String,
    },
}

/// In-memory container: a set of sub-files keyed by hashed name
///
/// Entries are kept ordered by id (signed), which is the order the builder
/// writes them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    entries: BTreeMap<i32, ContainerEntry>,
    warnings: Vec<ContainerWarning>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a container including its outer envelope.
    pub fn parse(data: &[u8]) -> ContainerResult<Self> {
        let envelope: Envelope = Cursor::new(ensure_len(data, ENVELOPE_SIZE, "envelope")?)
            .read_be()?;
        let rest = &data[ENVELOPE_SIZE..];

        let mut warnings = Vec::new();
        let body = if envelope.is_compressed() {
            let stored = ensure_len(rest, envelope.stored_len as usize, "compressed body")?;
            let body = compression::decompress(stored)?;
            if body.len() != envelope.decompressed_len as usize {
                warn!(
                    "container body decompressed to {} bytes, envelope declares {}",
                    body.len(),
                    envelope.decompressed_len
                );
                warnings.push(ContainerWarning::OuterSizeMismatch {
                    expected: envelope.decompressed_len,
                    actual: body.len(),
                });
            }
            body
        } else {
            ensure_len(rest, envelope.decompressed_len as usize, "body")?.to_vec()
        };

        let mut container = Self::parse_unwrapped(&body)?;
        warnings.append(&mut container.warnings);
        container.warnings = warnings;
        Ok(container)
    }

    /// Parse a container body that has no outer envelope.
    pub fn parse_unwrapped(body: &[u8]) -> ContainerResult<Self> {
        let mut cursor = Cursor::new(ensure_len(body, COUNT_SIZE, "file count")?);
        let count: u16 = cursor.read_be()?;

        let table_len = COUNT_SIZE + usize::from(count) * DESCRIPTOR_SIZE;
        let mut cursor = Cursor::new(ensure_len(body, table_len, "descriptor table")?);
        cursor.set_position(COUNT_SIZE as u64);
        let descriptors = (0..count)
            .map(|_| cursor.read_be::<EntryDescriptor>())
            .collect::<Result<Vec<_>, _>>()?;

        debug!("container holds {} entries", count);

        let mut container = Self::new();
        let mut offset = table_len;
        for descriptor in descriptors {
            let stored_len = descriptor.stored_len as usize;
            let region = ensure_len(&body[offset..], stored_len, "entry payload")?;
            offset += stored_len;

            match decode_payload(&descriptor, region) {
                Ok(data) => {
                    container.entries.insert(
                        descriptor.id,
                        ContainerEntry {
                            id: descriptor.id,
                            data,
                            compressed: descriptor.is_compressed(),
                        },
                    );
                }
                Err(reason) => {
                    warn!("skipping container entry {}: {}", descriptor.id, reason);
                    container.warnings.push(ContainerWarning::EntrySkipped {
                        id: descriptor.id,
                        reason,
                    });
                }
            }
        }

        if offset != body.len() {
            debug!(
                "container has {} trailing bytes after the last payload",
                body.len() - offset
            );
        }

        Ok(container)
    }

    /// Build the container, wrapped in its outer envelope.
    pub fn build(&self, outer: OuterCompression) -> ContainerResult<Vec<u8>> {
        let body = self.build_unwrapped()?;
        check_medium(0, body.len())?;

        let stored = match outer {
            OuterCompression::None => None,
            OuterCompression::BZip2 => {
                let compressed = compression::compress(&body)?;
                // Equal lengths would read back as a raw body
                if compressed.len() == body.len() {
                    debug!("compressed body is as long as the raw body, storing raw");
                    None
                } else {
                    check_medium(0, compressed.len())?;
                    Some(compressed)
                }
            }
        };

        let payload = stored.as_deref().unwrap_or(body.as_slice());
        let envelope = Envelope {
            decompressed_len: body.len() as u32,
            stored_len: payload.len() as u32,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(ENVELOPE_SIZE + payload.len()));
        cursor.write_be(&envelope)?;
        let mut out = cursor.into_inner();
        out.extend_from_slice(payload);
        Ok(out)
    }

    /// Build the container body without an outer envelope.
    pub fn build_unwrapped(&self) -> ContainerResult<Vec<u8>> {
        let count = u16::try_from(self.entries.len())
            .map_err(|_| ContainerError::TooManyEntries(self.entries.len()))?;

        let mut descriptors = Vec::with_capacity(self.entries.len());
        let mut payloads = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            let stored = if entry.compressed {
                let compressed = compression::compress(&entry.data)?;
                if compressed.len() == entry.data.len() {
                    debug!("entry {} compresses to its own length, storing raw", entry.id);
                    None
                } else {
                    Some(compressed)
                }
            } else {
                None
            };
            let payload = stored.unwrap_or_else(|| entry.data.clone());

            check_medium(entry.id, entry.data.len())?;
            check_medium(entry.id, payload.len())?;
            descriptors.push(EntryDescriptor {
                id: entry.id,
                decompressed_len: entry.data.len() as u32,
                stored_len: payload.len() as u32,
            });
            payloads.push(payload);
        }

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_be(&count)?;
        for descriptor in &descriptors {
            cursor.write_be(descriptor)?;
        }
        let mut out = cursor.into_inner();
        for payload in payloads {
            out.extend_from_slice(&payload);
        }
        Ok(out)
    }

    /// Payload of the entry with `id`.
    pub fn get(&self, id: i32) -> Option<&[u8]> {
        self.entries.get(&id).map(|e| e.data.as_slice())
    }

    /// Payload of the entry named `name`.
    pub fn get_named(&self, name: &str) -> Option<&[u8]> {
        self.get(name_hash(name))
    }

    /// Full entry with `id`.
    pub fn entry(&self, id: i32) -> Option<&ContainerEntry> {
        self.entries.get(&id)
    }

    /// Insert or replace an entry, returning the previous one.
    pub fn insert(&mut self, id: i32, data: Vec<u8>, compressed: bool) -> Option<ContainerEntry> {
        self.entries.insert(
            id,
            ContainerEntry {
                id,
                data,
                compressed,
            },
        )
    }

    /// Insert or replace an entry by name.
    pub fn insert_named(
        &mut self,
        name: &str,
        data: Vec<u8>,
        compressed: bool,
    ) -> Option<ContainerEntry> {
        self.insert(name_hash(name), data, compressed)
    }

    /// Remove an entry.
    pub fn remove(&mut self, id: i32) -> Option<ContainerEntry> {
        self.entries.remove(&id)
    }

    /// Entry ids in build order.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in build order.
    pub fn entries(&self) -> impl Iterator<Item = &ContainerEntry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Problems tolerated while decoding this container.
    pub fn warnings(&self) -> &[ContainerWarning] {
        &self.warnings
    }
}

fn ensure_len<'a>(data: &'a [u8], needed: usize, region: &'static str) -> ContainerResult<&'a [u8]> {
    data.get(..needed).ok_or(ContainerError::Truncated {
        region,
        needed,
        available: data.len(),
    })
}

fn check_medium(id: i32, len: usize) -> ContainerResult<()> {
    if len > MEDIUM_MAX as usize {
        return Err(ContainerError::EntryTooLarge { id, len });
    }
    Ok(())
}

/// Decode one payload region. Errors are reasons to skip the entry.
fn decode_payload(descriptor: &EntryDescriptor, region: &[u8]) -> Result<Vec<u8>, String> {
    if !descriptor.is_compressed() {
        return Ok(region.to_vec());
    }

    let data = compression::decompress(region).map_err(|e| e.to_string())?;
    if data.len() != descriptor.decompressed_len as usize {
        return Err(format!(
            "decompressed to {} bytes, descriptor declares {}",
            data.len(),
            descriptor.decompressed_len
        ));
    }
    Ok(data)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Container {
        let mut container = Container::new();
        container.insert_named("obj.idx", vec![0, 2, 0, 3, 0, 1], false);
        container.insert_named("obj.dat", b"\x00\x02\x02abc\n\x00\x00".to_vec(), true);
        container.insert_named("loc.dat", vec![7; 2000], true);
        container
    }

    #[test]
    fn test_round_trip_uncompressed_outer() {
        let original = sample();
        let bytes = original.build(OuterCompression::None).expect("build");

        // Raw envelope: both lengths equal the body length
        assert_eq!(bytes[0..3], bytes[3..6]);

        let parsed = Container::parse(&bytes).expect("parse");
        assert!(parsed.warnings().is_empty());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_round_trip_compressed_outer() {
        let original = sample();
        let bytes = original.build(OuterCompression::BZip2).expect("build");
        assert_ne!(bytes[0..3], bytes[3..6]);

        let parsed = Container::parse(&bytes).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_descriptor_table_sorted_by_signed_id() {
        let mut container = Container::new();
        container.insert(5, vec![5], false);
        container.insert(-3, vec![3], false);
        container.insert(0, vec![0], false);

        let body = container.build_unwrapped().expect("build");
        assert_eq!(&body[0..2], &[0, 3]);
        let id_at = |i: usize| {
            let start = COUNT_SIZE + i * DESCRIPTOR_SIZE;
            i32::from_be_bytes(body[start..start + 4].try_into().unwrap())
        };
        assert_eq!([id_at(0), id_at(1), id_at(2)], [-3, 0, 5]);

        // Payloads follow the table in the same order
        assert_eq!(&body[COUNT_SIZE + 3 * DESCRIPTOR_SIZE..], &[3, 0, 5]);
    }

    #[test]
    fn test_size_invariant() {
        let container = sample();
        let body = container.build_unwrapped().expect("build");
        let parsed_table: Vec<EntryDescriptor> = {
            let mut cursor = Cursor::new(&body[COUNT_SIZE..]);
            (0..container.len())
                .map(|_| cursor.read_be().expect("descriptor"))
                .collect()
        };
        let stored: usize = parsed_table.iter().map(|d| d.stored_len as usize).sum();
        assert_eq!(COUNT_SIZE + container.len() * DESCRIPTOR_SIZE + stored, body.len());
    }

    #[test]
    fn test_mismatched_entry_is_skipped() {
        let mut container = Container::new();
        container.insert(1, b"first entry".to_vec(), false);
        container.insert(2, vec![9; 600], true);
        container.insert(3, b"third entry".to_vec(), false);
        let mut body = container.build_unwrapped().expect("build");

        // Corrupt the declared decompressed length of entry 2 (second row)
        let row = COUNT_SIZE + DESCRIPTOR_SIZE;
        body[row + 4..row + 7].copy_from_slice(&[0x00, 0x02, 0x00]);

        let parsed = Container::parse_unwrapped(&body).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(1), Some(&b"first entry"[..]));
        assert_eq!(parsed.get(2), None);
        assert_eq!(parsed.get(3), Some(&b"third entry"[..]));
        assert!(matches!(
            parsed.warnings(),
            [ContainerWarning::EntrySkipped { id: 2, .. }]
        ));
    }

    #[test]
    fn test_outer_size_mismatch_is_tolerated() {
        let original = sample();
        let mut bytes = original.build(OuterCompression::BZip2).expect("build");

        // Overstate the decompressed length in the envelope
        let declared = crate::medium::from_be_bytes([bytes[0], bytes[1], bytes[2]]);
        bytes[0..3].copy_from_slice(&crate::medium::to_be_bytes(declared + 1000));

        let parsed = Container::parse(&bytes).expect("parse");
        assert_eq!(parsed.len(), original.len());
        assert!(matches!(
            parsed.warnings(),
            [ContainerWarning::OuterSizeMismatch { .. }]
        ));
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let body = sample().build_unwrapped().expect("build");
        let result = Container::parse_unwrapped(&body[..body.len() - 1]);
        assert!(matches!(
            result,
            Err(ContainerError::Truncated {
                region: "entry payload",
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_envelope_is_fatal() {
        assert!(matches!(
            Container::parse(&[0, 0, 1]),
            Err(ContainerError::Truncated {
                region: "envelope",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_container() {
        let bytes = Container::new().build(OuterCompression::None).expect("build");
        assert_eq!(bytes, vec![0, 0, 2, 0, 0, 2, 0, 0]);
        let parsed = Container::parse(&bytes).expect("parse");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_replace_entry() {
        let mut container = sample();
        let previous = container.insert_named("obj.idx", vec![1], false);
        assert!(previous.is_some());
        assert_eq!(container.get_named("OBJ.IDX"), Some(&[1u8][..]));
        assert_eq!(container.len(), 3);
    }
}
