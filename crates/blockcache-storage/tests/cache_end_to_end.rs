#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end tests over a cache directory on disk
//!
//! Caches are built in a temporary directory, either through the public
//! API or byte for byte, and read back through every layer.

use blockcache_formats::container::{ArchiveId, Container, OuterCompression};
use blockcache_formats::item::{DATA_NAME, INDEX_NAME, ItemArchive, ItemDefinition, WornModel};
use blockcache_formats::FemaleModelLayout;
use blockcache_storage::{
    BLOCK_SIZE, BlockStore, Cache, Channel, DATA_FILE, IndexEntry, IndexTable, StorageConfig,
    index_file_name,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn sample_items() -> Vec<ItemDefinition> {
    vec![
        ItemDefinition {
            model_id: 2400,
            name: "Dwarf remains".to_string(),
            examine: "The body of a Dwarf savaged by Goblins.".to_string(),
            icon_zoom: 1200,
            inventory_options: [None, None, None, None, Some("Drop".to_string())],
            ..ItemDefinition::default()
        },
        ItemDefinition {
            model_id: 2543,
            name: "Bronze pickaxe".to_string(),
            examine: "Used for mining.".to_string(),
            cost: 1,
            male_model_0: Some(WornModel {
                model_id: 2640,
                offset_y: 0,
            }),
            female_model_0: Some(WornModel {
                model_id: 2640,
                offset_y: -4,
            }),
            female_model_1: Some(17),
            ground_options: [None, None, Some("Take".to_string()), None, None],
            inventory_options: [None, Some("Wield".to_string()), None, None, None],
            ..ItemDefinition::default()
        },
    ]
}

fn seed_cache(config: &StorageConfig) -> Cache {
    let cache = Cache::open(config).expect("open");

    let encoded = ItemArchive::from_definitions(sample_items())
        .encode_with(config.female_model_layout)
        .expect("encode items");
    let mut archive = Container::new();
    archive.insert_named(INDEX_NAME, encoded.index, true);
    archive.insert_named(DATA_NAME, encoded.data, true);
    archive.insert_named("loc.dat", vec![0x42; 900], true);
    cache
        .write_container(Channel::Archive, ArchiveId::Config.record_id(), &archive)
        .expect("write config archive");
    cache
}

#[test]
fn ten_byte_chain_is_read_without_touching_block_zero() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    // block 0 is garbage that would corrupt the result if it were read
    let mut data = vec![0xEE; BLOCK_SIZE];
    data.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]);
    data.extend_from_slice(b"0123456789");
    std::fs::write(dir.path().join(DATA_FILE), &data).expect("write data file");

    let store = BlockStore::open(dir.path().join(DATA_FILE)).expect("open");
    assert_eq!(store.read_chain(1, 10).expect("read"), b"0123456789");
    assert_eq!(store.next_free_block(), 2);
}

#[test]
fn index_entry_bytes_on_disk() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for channel in 0..5u8 {
        std::fs::write(dir.path().join(index_file_name(channel)), b"").expect("create index");
    }

    let index = IndexTable::open(dir.path()).expect("open");
    index
        .store(Channel::Archive, 0, IndexEntry::new(512, 1))
        .expect("store");
    assert_eq!(
        std::fs::read(dir.path().join("main_file_cache.idx0")).expect("read"),
        vec![0, 2, 0, 0, 0, 1]
    );
    assert_eq!(
        index.lookup(Channel::Archive, 0).expect("lookup"),
        IndexEntry::new(512, 1)
    );
}

#[test]
fn edit_item_then_compact() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = StorageConfig::new(dir.path().join("cache"))
        .with_create_if_missing(true)
        .with_outer_compression(OuterCompression::BZip2)
        .with_female_model_layout(FemaleModelLayout::Prefixed);
    let cache = seed_cache(&config);

    let mut items = cache.read_item_definitions().expect("read items");
    assert_eq!(items, sample_items());

    items[1] = items[1].clone().with_name("Rune pickaxe").with_cost(32_000);
    items[1].members = true;
    cache.write_item_definitions(&items).expect("write items");
    cache.flush().expect("flush");

    let blocks_before = cache.store().next_free_block();
    let out = dir.path().join("compacted");
    let report = cache.compact(&out).expect("compact");
    assert_eq!(report.entries[0], ArchiveId::Config.record_id() + 1);
    assert!(report.blocks_written < blocks_before as usize - 1);

    let compacted = Cache::open(&config.clone().with_cache_dir(&out)).expect("open compacted");
    let reread = compacted.read_item_definitions().expect("read compacted items");
    assert_eq!(reread, items);
    assert_eq!(reread[1].name, "Rune pickaxe");

    let archive = compacted
        .read_container(Channel::Archive, ArchiveId::Config.record_id())
        .expect("config archive");
    assert!(archive.warnings().is_empty());
    assert_eq!(archive.get_named("loc.dat"), Some(&[0x42u8; 900][..]));
}

#[test]
fn concurrent_writers_never_share_blocks() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = StorageConfig::new(dir.path()).with_create_if_missing(true);
    let cache = Arc::new(Cache::open(&config).expect("open"));

    let handles: Vec<_> = (0..4u8)
        .map(|writer| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for record in 0..8u32 {
                    let data = vec![writer; 700 + record as usize];
                    cache.write(Channel::Model, u32::from(writer) * 100 + record, &data)
                        .expect("write");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }

    for writer in 0..4u8 {
        for record in 0..8u32 {
            let data = cache
                .read(Channel::Model, u32::from(writer) * 100 + record)
                .expect("read");
            assert_eq!(data, vec![writer; 700 + record as usize]);
        }
    }
    // 32 chains of two blocks each after the reserved block
    assert_eq!(cache.store().next_free_block(), 1 + 32 * 2);
}
