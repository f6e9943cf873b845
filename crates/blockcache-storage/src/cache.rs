//! High-level access to a cache directory
//!
//! [`Cache`] owns the data file and the five index files of one directory
//! and layers the container and item definition codecs over them.
//!
//! # Example
//!
//! ```rust,no_run
//! use blockcache_storage::{Cache, StorageConfig};
//!
//! # fn example() -> blockcache_storage::Result<()> {
//! let cache = Cache::open(&StorageConfig::new("/path/to/cache"))?;
//! let mut items = cache.read_item_definitions()?;
//! items[1351].name = "Bronze hatchet".to_string();
//! cache.write_item_definitions(&items)?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use blockcache_formats::container::{ArchiveId, Container, ContainerWarning};
use blockcache_formats::item::{DATA_NAME, INDEX_NAME, ItemArchive, ItemDefinition};
use tracing::{debug, info};

use crate::block::BlockStore;
use crate::compaction::{CompactionReport, Compactor};
use crate::config::StorageConfig;
use crate::index::IndexTable;
use crate::{Channel, DATA_FILE, Result, StorageError};

/// A cache directory opened for reading and writing
#[derive(Debug)]
pub struct Cache {
    config: StorageConfig,
    store: BlockStore,
    index: IndexTable,
}

impl Cache {
    /// Open the cache described by `config`.
    ///
    /// When `create_if_missing` is set and the directory holds no data file,
    /// an empty cache is created first.
    ///
    /// # Errors
    ///
    /// Returns error if the data or index files cannot be opened or created
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let dir = &config.cache_dir;
        let data_path = dir.join(DATA_FILE);

        let (store, index) = if config.create_if_missing && !data_path.exists() {
            std::fs::create_dir_all(dir)?;
            info!("Creating empty cache in {}", dir.display());
            (BlockStore::create(&data_path)?, IndexTable::create(dir)?)
        } else {
            (BlockStore::open(&data_path)?, IndexTable::open(dir)?)
        };

        Ok(Self {
            config: config.clone(),
            store,
            index,
        })
    }

    /// Open the existing cache in `dir` with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if the data or index files cannot be opened
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(&StorageConfig::new(dir))
    }

    /// Configuration the cache was opened with
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Underlying block store
    pub const fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Underlying index table
    pub const fn index(&self) -> &IndexTable {
        &self.index
    }

    /// Read the raw bytes of a record.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an unknown channel or record and any error of
    /// [`BlockStore::read_chain`]
    pub fn read(&self, channel: impl Into<u8>, record_id: u32) -> Result<Vec<u8>> {
        let entry = self.index.lookup(channel, record_id)?;
        self.store.read_entry(entry)
    }

    /// Write the raw bytes of a record to new blocks and point its entry at
    /// them.
    ///
    /// The chain is written before the entry, so a failure in between
    /// leaves the old record intact.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an unknown channel or an oversized record,
    /// and `Io` if writing fails
    pub fn write(&self, channel: impl Into<u8>, record_id: u32, data: &[u8]) -> Result<()> {
        let channel = channel.into();
        Channel::try_from(channel)?;

        // Block headers only have room for the low 16 bits
        let owner = record_id as u16;
        let entry = self.store.write_chain(data, owner)?;
        self.index.store(channel, record_id, entry)
    }

    /// Read and parse a container record.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or is not a valid container
    pub fn read_container(&self, channel: impl Into<u8>, record_id: u32) -> Result<Container> {
        let bytes = self.read(channel, record_id)?;
        let container = Container::parse(&bytes)?;
        debug!(
            "Read container {} with {} entries ({} warnings)",
            record_id,
            container.len(),
            container.warnings().len()
        );
        Ok(container)
    }

    /// Build a container with the configured outer compression and write it.
    ///
    /// # Errors
    ///
    /// Returns error if the container cannot be built or written
    pub fn write_container(
        &self,
        channel: impl Into<u8>,
        record_id: u32,
        container: &Container,
    ) -> Result<()> {
        let bytes = container.build(self.config.outer_compression)?;
        self.write(channel, record_id, &bytes)
    }

    fn read_config_archive(&self) -> Result<Container> {
        self.read_container(Channel::Archive, ArchiveId::Config.record_id())
    }

    /// Decode all item definitions from the config archive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the archive lacks `obj.idx` or `obj.dat`, and
    /// any read or decode error
    pub fn read_item_definitions(&self) -> Result<Vec<ItemDefinition>> {
        let config = self.read_config_archive()?;
        let index = config
            .get_named(INDEX_NAME)
            .ok_or_else(|| StorageError::NotFound(format!("{INDEX_NAME} in config archive")))?;
        let data = config
            .get_named(DATA_NAME)
            .ok_or_else(|| StorageError::NotFound(format!("{DATA_NAME} in config archive")))?;

        let archive = ItemArchive::decode_with(index, data, self.config.female_model_layout)?;
        Ok(archive.into_definitions())
    }

    /// Encode item definitions into the config archive and write it back.
    ///
    /// Every other entry of the archive is kept as it was read.
    ///
    /// # Errors
    ///
    /// Returns `DamagedContainer` if parsing the archive skipped any entry,
    /// and otherwise any error reading the archive, encoding the
    /// definitions or writing the archive back
    pub fn write_item_definitions(&self, definitions: &[ItemDefinition]) -> Result<()> {
        let mut config = self.read_config_archive()?;
        let skipped: Vec<i32> = config
            .warnings()
            .iter()
            .filter_map(|warning| match warning {
                ContainerWarning::EntrySkipped { id, .. } => Some(*id),
                ContainerWarning::OuterSizeMismatch { .. } => None,
            })
            .collect();
        if !skipped.is_empty() {
            return Err(StorageError::DamagedContainer {
                record_id: ArchiveId::Config.record_id(),
                skipped,
            });
        }

        let encoded = ItemArchive::from_definitions(definitions.to_vec())
            .encode_with(self.config.female_model_layout)?;

        let compress = self.config.compress_entries;
        config.insert_named(INDEX_NAME, encoded.index, compress);
        config.insert_named(DATA_NAME, encoded.data, compress);

        info!("Writing {} item definitions", definitions.len());
        self.write_container(Channel::Archive, ArchiveId::Config.record_id(), &config)
    }

    /// Copy the reachable part of this cache into `out_dir`.
    ///
    /// # Errors
    ///
    /// See [`Compactor::compact`]
    pub fn compact(&self, out_dir: impl AsRef<Path>) -> Result<CompactionReport> {
        Compactor::new(&self.index, &self.store).compact(out_dir)
    }

    /// Flush the data and index files to disk.
    ///
    /// # Errors
    ///
    /// Returns error if any flush fails
    pub fn flush(&self) -> Result<()> {
        self.store.flush()?;
        self.index.flush()
    }
}
