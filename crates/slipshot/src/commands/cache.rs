//! Cache command - inspect and clear the local resource cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use serde::Serialize;
use slipshot_config::StoreBackend;

use super::{Context, heading};

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached entries and their remaining lifetime
    Status,

    /// Remove expired entries
    Sweep,

    /// Drop every cached resource (preferences are kept)
    Clear,
}

#[derive(Debug, Serialize)]
struct EntryInfo {
    key: String,
    remaining_secs: u64,
}

/// Run the cache command.
pub async fn run(args: CacheArgs, ctx: &Context) -> Result<()> {
    let cache = ctx.client.cache();
    let namespace = cache.config().namespace.clone();

    match args.command {
        CacheCommand::Status => {
            let now = cache.now_ms();
            let mut entries = Vec::new();
            for full_key in cache.store().keys()? {
                let Some(key) = full_key.strip_prefix(&namespace) else {
                    continue;
                };
                if let Some(entry) = cache.get_entry::<serde_json::Value>(key) {
                    entries.push(EntryInfo {
                        key: key.to_string(),
                        remaining_secs: entry.remaining_ms(now) / 1000,
                    });
                }
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));

            if ctx.json_output {
                return ctx.print_json(&entries);
            }
            heading("Cache");
            let dim = Style::new().dim();
            println!("  Namespace: {}", namespace);
            let store = ctx.config.cache().store;
            println!("  Store:     {:?}", store);
            if store == StoreBackend::File
                && let Some(path) = ctx.config.cache().resolved_store_path()
            {
                println!("  Path:      {}", path.display());
            }
            println!();
            if entries.is_empty() {
                println!("{}", dim.apply_to("No live entries"));
            }
            for entry in &entries {
                println!(
                    "  {:<40} {}",
                    entry.key,
                    dim.apply_to(format!("{}s left", entry.remaining_secs))
                );
            }
        }
        CacheCommand::Sweep => {
            let removed = cache.sweep_expired()?;
            if ctx.json_output {
                return ctx.print_json(&serde_json::json!({ "removed": removed }));
            }
            println!("Removed {} expired entries", removed);
        }
        CacheCommand::Clear => {
            ctx.client.invalidate_all();
            if ctx.json_output {
                return ctx.print_json(&serde_json::json!({ "cleared": true }));
            }
            println!("Cache cleared");
        }
    }
    Ok(())
}
