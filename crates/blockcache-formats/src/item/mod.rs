//! Item definition codec
//!
//! Item definitions live in two sub-files of the config archive. The index
//! sub-file (`obj.idx`) lists record lengths, the data sub-file (`obj.dat`)
//! holds the records back to back:
//!
//! ```text
//! obj.idx: [count:u16] count x [length:u16]
//! obj.dat: [count:u16] record_0 record_1 ...
//! ```
//!
//! Each record is a stream of opcode-tagged attributes ending in opcode 0.
//! See [`opcode`] for the table. Records are decoded independently, record
//! `i` starting at `2 + sum(length[..i])` in the data buffer.
//!
//! # Example
//!
//! ```rust
//! use blockcache_formats::item::{ItemArchive, ItemDefinition};
//!
//! let archive = ItemArchive::from_definitions(vec![
//!     ItemDefinition::default().with_name("Bronze dagger").with_cost(10),
//! ]);
//! let encoded = archive.encode()?;
//! let decoded = ItemArchive::decode(&encoded.index, &encoded.data)?;
//! assert_eq!(decoded.definitions()[0].name, "Bronze dagger");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decoder;
mod definition;
mod encoder;
mod error;
pub mod opcode;

pub use definition::{ItemDefinition, Recolor, StackVariant, WornModel};
pub use error::{ItemError, ItemResult};

use binrw::BinWriterExt;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

use decoder::{RecordReader, record_offsets};
use encoder::RecordWriter;

/// Sub-file name of the item index inside the config archive
pub const INDEX_NAME: &str = "obj.idx";

/// Sub-file name of the item data inside the config archive
pub const DATA_NAME: &str = "obj.dat";

/// Operand layout of opcode 26
///
/// Some revisions of the format write an unused `u16` in front of the
/// second female worn model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FemaleModelLayout {
    /// One `u16` model id
    #[default]
    Plain,
    /// An ignored `u16` followed by the model id
    Prefixed,
}

/// Encoded index and data sub-files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedItems {
    /// Contents of `obj.idx`
    pub index: Vec<u8>,
    /// Contents of `obj.dat`
    pub data: Vec<u8>,
}

/// Ordered set of item definitions, addressed by item id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemArchive {
    definitions: Vec<ItemDefinition>,
    layout: FemaleModelLayout,
}

impl ItemArchive {
    /// Wrap definitions for encoding with the default layout.
    pub fn from_definitions(definitions: Vec<ItemDefinition>) -> Self {
        Self {
            definitions,
            layout: FemaleModelLayout::default(),
        }
    }

    /// Decode with the default opcode 26 layout.
    pub fn decode(index: &[u8], data: &[u8]) -> ItemResult<Self> {
        Self::decode_with(index, data, FemaleModelLayout::default())
    }

    /// Decode both sub-files.
    ///
    /// The record count and lengths come from the index buffer; the data
    /// buffer's own count is not consulted.
    pub fn decode_with(index: &[u8], data: &[u8], layout: FemaleModelLayout) -> ItemResult<Self> {
        let offsets = record_offsets(index)?;
        let definitions = offsets
            .into_iter()
            .enumerate()
            .map(|(record, offset)| RecordReader::new(data, offset, record, layout).decode())
            .collect::<ItemResult<Vec<_>>>()?;

        debug!("Decoded {} item definitions", definitions.len());
        Ok(Self {
            definitions,
            layout,
        })
    }

    /// Encode with the layout this archive was decoded with.
    pub fn encode(&self) -> ItemResult<EncodedItems> {
        self.encode_with(self.layout)
    }

    /// Encode every definition into fresh index and data buffers.
    pub fn encode_with(&self, layout: FemaleModelLayout) -> ItemResult<EncodedItems> {
        let count = u16::try_from(self.definitions.len())
            .map_err(|_| ItemError::TooManyRecords(self.definitions.len()))?;

        let mut index = Cursor::new(Vec::with_capacity(2 + self.definitions.len() * 2));
        let mut data = Cursor::new(Vec::new());
        index.write_be(&count)?;
        data.write_be(&count)?;

        for (record, def) in self.definitions.iter().enumerate() {
            let bytes = RecordWriter::new(record, layout).encode(def)?;
            let len = u16::try_from(bytes.len()).map_err(|_| ItemError::RecordTooLarge {
                record,
                len: bytes.len(),
            })?;
            index.write_be(&len)?;
            data.write_be(&bytes)?;
        }

        debug!("Encoded {} item definitions", count);
        Ok(EncodedItems {
            index: index.into_inner(),
            data: data.into_inner(),
        })
    }

    /// Opcode 26 layout used by [`Self::encode`]
    pub const fn layout(&self) -> FemaleModelLayout {
        self.layout
    }

    /// Change the layout used by [`Self::encode`].
    pub const fn set_layout(&mut self, layout: FemaleModelLayout) {
        self.layout = layout;
    }

    /// All definitions in id order
    pub fn definitions(&self) -> &[ItemDefinition] {
        &self.definitions
    }

    /// Consume the archive, returning its definitions.
    pub fn into_definitions(self) -> Vec<ItemDefinition> {
        self.definitions
    }

    /// Definition for an item id
    pub fn get(&self, id: usize) -> Option<&ItemDefinition> {
        self.definitions.get(id)
    }

    /// Replace the definition of an existing item id, returning the old one.
    ///
    /// Edits take a copy from [`Self::get`], change it and put it back here;
    /// nothing reaches the cache until the archive is encoded again.
    ///
    /// # Errors
    ///
    /// Returns `RecordOutOfRange` if no definition has this id
    pub fn replace(
        &mut self,
        id: usize,
        definition: ItemDefinition,
    ) -> ItemResult<ItemDefinition> {
        let len = self.definitions.len();
        let slot = self
            .definitions
            .get_mut(id)
            .ok_or(ItemError::RecordOutOfRange { id, len })?;
        Ok(std::mem::replace(slot, definition))
    }

    /// Append a definition, returning its id.
    pub fn push(&mut self, definition: ItemDefinition) -> usize {
        self.definitions.push(definition);
        self.definitions.len() - 1
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the archive holds no definitions
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_archive() {
        let encoded = ItemArchive::default().encode().expect("encode");
        assert_eq!(encoded.index, vec![0, 0]);
        assert_eq!(encoded.data, vec![0, 0]);

        let decoded = ItemArchive::decode(&encoded.index, &encoded.data).expect("decode");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_index_lengths_match_records() {
        let archive = ItemArchive::from_definitions(vec![
            ItemDefinition::default(),
            ItemDefinition::default().with_name("Coins"),
        ]);
        let encoded = archive.encode().expect("encode");

        // terminator only, then opcode 2 + "Coins\n" + terminator
        assert_eq!(encoded.index, vec![0, 2, 0, 1, 0, 8]);
        assert_eq!(encoded.data.len(), 2 + 1 + 8);
        assert_eq!(&encoded.data[..3], &[0, 2, 0]);
    }

    #[test]
    fn test_round_trip_keeps_layout() {
        let mut archive = ItemArchive::from_definitions(vec![ItemDefinition {
            female_model_1: Some(1234),
            ..ItemDefinition::default()
        }]);
        archive.set_layout(FemaleModelLayout::Prefixed);

        let encoded = archive.encode().expect("encode");
        let decoded =
            ItemArchive::decode_with(&encoded.index, &encoded.data, FemaleModelLayout::Prefixed)
                .expect("decode");
        assert_eq!(decoded, archive);
        assert_eq!(decoded.encode().expect("re-encode"), encoded);
    }

    #[test]
    fn test_edit_one_record() {
        let archive = ItemArchive::from_definitions(vec![
            ItemDefinition::default().with_name("Shortbow"),
            ItemDefinition::default().with_name("Longbow"),
        ]);
        let encoded = archive.encode().expect("encode");

        let mut edited = ItemArchive::decode(&encoded.index, &encoded.data).expect("decode");
        let mut bow = edited.get(1).cloned().expect("record 1");
        bow.name = "Magic longbow".to_string();
        bow.members = true;
        let previous = edited.replace(1, bow).expect("replace");
        assert_eq!(previous.name, "Longbow");
        assert!(matches!(
            edited.replace(2, ItemDefinition::default()),
            Err(ItemError::RecordOutOfRange { id: 2, len: 2 })
        ));

        let re_encoded = edited.encode().expect("encode");
        let decoded = ItemArchive::decode(&re_encoded.index, &re_encoded.data).expect("decode");
        assert_eq!(decoded.get(0).map(|d| d.name.as_str()), Some("Shortbow"));
        assert_eq!(decoded.get(1).map(|d| d.name.as_str()), Some("Magic longbow"));
        assert!(decoded.get(1).is_some_and(|d| d.members));
    }

    #[test]
    fn test_decode_error_reports_record() {
        // record 1 holds opcode 200
        let index = [0, 2, 0, 1, 0, 2];
        let data = [0, 2, 0, 200, 0];
        let err = ItemArchive::decode(&index, &data).unwrap_err();
        assert!(matches!(
            err,
            ItemError::UnknownOpcode {
                opcode: 200,
                record: 1
            }
        ));
    }

    #[test]
    fn test_too_many_records() {
        let archive = ItemArchive::from_definitions(vec![ItemDefinition::default(); 65536]);
        assert!(matches!(
            archive.encode(),
            Err(ItemError::TooManyRecords(65536))
        ));
    }

    #[test]
    fn test_record_too_large() {
        let def = ItemDefinition::default().with_examine("x".repeat(70_000));
        let archive = ItemArchive::from_definitions(vec![def]);
        assert!(matches!(
            archive.encode(),
            Err(ItemError::RecordTooLarge { record: 0, .. })
        ));
    }
}
