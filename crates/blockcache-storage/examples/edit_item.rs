//! Rename one item definition in a cache, then write a compacted copy.
//!
//! Usage:
//!   cargo run --example edit_item -p blockcache-storage -- \
//!       <cache_dir> <item_id> <new_name> [compacted_dir]
//!
//! Set `RUST_LOG=debug` to see each chain and container as it is touched.

use blockcache_storage::{Cache, StorageConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <cache_dir> <item_id> <new_name> [compacted_dir]", args[0]);
        std::process::exit(2);
    }
    let item_id: usize = args[2].parse()?;

    let cache = Cache::open(&StorageConfig::new(&args[1]))?;
    let mut items = cache.read_item_definitions()?;
    println!("Loaded {} item definitions", items.len());

    let Some(item) = items.get(item_id) else {
        return Err(format!("no item {item_id} (cache holds {})", items.len()).into());
    };
    println!("Item {item_id}: {:?} -> {:?}", item.name, args[3]);
    items[item_id] = item.clone().with_name(&args[3]);

    cache.write_item_definitions(&items)?;
    cache.flush()?;
    info!("Wrote item definitions back to {}", args[1]);

    if let Some(out_dir) = args.get(4) {
        let report = cache.compact(out_dir)?;
        println!(
            "Compacted {} blocks into {} ({} bytes)",
            report.blocks_written, out_dir, report.data_file_len
        );
    }

    Ok(())
}
