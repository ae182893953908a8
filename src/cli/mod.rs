//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommands:
//! - `replay <FILE>` -- feed recorded server updates through a fresh cache
//! - `schema` -- print the configuration JSON Schema
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Client-side poll cache and reconciler.
#[derive(Parser, Debug)]
#[command(
    name = "pollsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Replay and inspect chat poll updates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay recorded server updates and print the resulting cache.
    Replay {
        /// JSON array of updates, or one update per line.
        file: PathBuf,

        /// Config file (default: $POLLSYNC_CONFIG, then built-in defaults).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the configuration JSON Schema.
    Schema,

    /// Print version, build date, and git commit information.
    Version,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config::{self, PollsConfig};
use crate::polls::PollCache;
use crate::text::MarkdownProcessor;
use crate::updates::{LocalDispatcher, ServerUpdate, UpdateDispatcher, Updates};
use serde_json::{json, Value};
use std::sync::Arc;

/// Run the `replay` subcommand.
pub fn handle_replay(
    file: &std::path::Path,
    config: &PollsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(file)?;
    let updates = parse_updates(&raw)?;
    tracing::info!(file = %file.display(), updates = updates.len(), "replaying updates");

    let cache = replay(updates, config);
    let pretty = serde_json::to_string_pretty(&cache_to_json(&cache))?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `schema` subcommand.
pub fn handle_schema() -> Result<(), Box<dyn std::error::Error>> {
    let pretty = serde_json::to_string_pretty(&config::schema::generate_config_schema())?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollsync {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLSYNC_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLSYNC_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a JSON array of updates, or newline-delimited updates.
pub fn parse_updates(raw: &str) -> Result<Vec<ServerUpdate>, serde_json::Error> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}

/// Feed updates through a dispatcher into a fresh cache.
pub fn replay(updates: Vec<ServerUpdate>, config: &PollsConfig) -> Arc<PollCache> {
    let cache = Arc::new(PollCache::new(Arc::new(MarkdownProcessor::new()), config));
    let dispatcher = LocalDispatcher::new();
    dispatcher.register(cache.clone());
    dispatcher.process_updates(Updates::new(updates));
    cache
}

fn cache_to_json(cache: &PollCache) -> Value {
    Value::Array(
        cache
            .entries()
            .into_iter()
            .map(|(poll, results)| json!({ "poll": poll, "results": results }))
            .collect(),
    )
}
