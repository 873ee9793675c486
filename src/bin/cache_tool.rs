//! Cache maintenance tool
//!
//! Inspect the cache database, evict individual keys, or warm the
//! top-markets cache from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::sync::Arc;

use coindash::cache::{CacheStore, SqliteStorage};
use coindash::{Config, MarketDataService};

#[derive(Parser)]
#[command(name = "cache_tool", about = "coindash cache maintenance")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "coindash.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show entry counts per resource kind
    Stats,
    /// Remove one cache entry
    Evict { key: String },
    /// Fetch and cache a page of the top-markets ranking
    WarmTop {
        #[arg(default_value_t = 1)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    coindash::logger::init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Stats => {
            let storage = SqliteStorage::open(&config.cache.database_path)
                .map_err(|e| anyhow::anyhow!(e))?;
            let keys = storage.keys();

            let mut per_kind: BTreeMap<String, usize> = BTreeMap::new();
            for key in &keys {
                let kind = key.split(':').next().unwrap_or("?").to_string();
                *per_kind.entry(kind).or_default() += 1;
            }

            println!("cache: {}", config.cache.database_path);
            println!("entries: {}", keys.len());
            for (kind, count) in per_kind {
                println!("  {:<10} {}", kind, count);
            }
        }
        Command::Evict { key } => {
            let storage = SqliteStorage::open(&config.cache.database_path)
                .map_err(|e| anyhow::anyhow!(e))?;
            let cache = CacheStore::new(Arc::new(storage));
            cache.invalidate(&key);
            println!("evicted {}", key);
        }
        Command::WarmTop { page } => {
            let service = MarketDataService::new(config)?;
            let outcome = service.refresh_top_markets(page).await;
            match outcome.value() {
                Some(coins) => println!("cached {} coins for page {}", coins.len(), page),
                None => println!("upstream unavailable, retry scheduled"),
            }
        }
    }

    Ok(())
}
