//! Dump the index entries of a cache and the contents of its config archive.
//!
//! Usage:
//!   cargo run --example dump_index -p blockcache-storage -- <cache_dir>

use blockcache_formats::container::ArchiveId;
use blockcache_storage::{CHUNK_SIZE, Cache, Channel};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(dir) = std::env::args().nth(1) else {
        eprintln!("usage: dump_index <cache_dir>");
        std::process::exit(2);
    };

    let cache = Cache::open_dir(&dir)?;
    println!(
        "Data file: {} (next free block {})\n",
        cache.store().path().display(),
        cache.store().next_free_block()
    );

    for channel in Channel::ALL {
        let entries = cache.index().list_all(channel)?;
        let used: Vec<_> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .collect();
        let blocks: usize = used
            .iter()
            .map(|(_, e)| (e.length as usize).div_ceil(CHUNK_SIZE))
            .sum();
        println!(
            "{channel:?}: {} entries, {} in use, {blocks} blocks",
            entries.len(),
            used.len()
        );

        for (record, entry) in used.iter().take(5) {
            println!(
                "    record={record:>6} length={:>8} start_block={:>8}",
                entry.length, entry.start_block
            );
        }
        if used.len() > 5 {
            println!("    ... and {} more", used.len() - 5);
        }
    }

    println!("\n=== Archives ===");
    for archive in ArchiveId::ALL {
        match cache.read_container(Channel::Archive, archive.record_id()) {
            Ok(container) => {
                println!("{archive:?}: {} files", container.len());
                for entry in container.entries() {
                    println!(
                        "    id={:>11} size={:>8} compressed={}",
                        entry.id,
                        entry.data.len(),
                        entry.compressed
                    );
                }
                for warning in container.warnings() {
                    println!("    warning: {warning:?}");
                }
            }
            Err(e) => println!("{archive:?}: unreadable ({e})"),
        }
    }

    Ok(())
}
