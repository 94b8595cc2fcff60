//! `primemap-inspect` — Read-only views of the data directory and of single
//! numbers.
//!
//! **Usage:**
//! ```text
//! primemap-inspect stats            # index totals and geometry ranges
//! primemap-inspect list             # one line per index entry
//! primemap-inspect files            # dataset files on disk, checked against the index
//! primemap-inspect progress         # last recorded generation sweep (JSON)
//! primemap-inspect number 7919      # profile of one number (JSON)
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use primemap::batch::PROGRESS_FILE;
use primemap::{Atlas, GenerationReport, NumberProfile};
use primemap_clients::{init_tracing, EngineArgs};

/// Inspect a primemap data directory.
#[derive(Parser)]
#[command(name = "primemap-inspect", about = "Inspect a primemap data directory")]
struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index totals as JSON.
    Stats,
    /// Every index entry, oldest first.
    List,
    /// Dataset files on disk.
    Files,
    /// The last recorded generation sweep as JSON.
    Progress,
    /// Profile of one number as JSON.
    Number {
        /// The number.
        n: u64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Stats => {
            let atlas = open(&args.engine)?;
            println!("{}", serde_json::to_string_pretty(&atlas.stats())?);
        }
        Command::List => {
            let atlas = open(&args.engine)?;
            for e in atlas.index().snapshot().iter() {
                let c = &e.configuration;
                println!(
                    "{}  {:>6}x{:<6} {:<18} {:>10} elements  {:>6.2}% primes  {:>12} bytes",
                    e.key,
                    c.circle_count(),
                    c.segments_per_circle(),
                    c.mapping(),
                    e.element_count,
                    e.density,
                    e.size_bytes
                );
            }
        }
        Command::Files => {
            let atlas = open(&args.engine)?;
            let files = atlas.store().scan().context("Failed to scan dataset files")?;
            for f in &files {
                let indexed = f.key.as_ref().is_some_and(|k| atlas.index().contains(k));
                println!(
                    "{:>12} bytes  {}  {}",
                    f.size_bytes,
                    if indexed { "indexed  " } else { "unindexed" },
                    f.path.display()
                );
            }
            println!("{} file(s)", files.len());
        }
        Command::Progress => {
            let engine = args.engine.load()?;
            let path = engine.data_dir.join(PROGRESS_FILE);
            if !path.exists() {
                println!("no sweep recorded in {}", engine.data_dir.display());
                return Ok(());
            }
            let report = GenerationReport::load(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Number { n } => {
            println!("{}", serde_json::to_string_pretty(&NumberProfile::of(n))?);
        }
    }
    Ok(())
}

fn open(engine: &EngineArgs) -> Result<Atlas> {
    Atlas::open(engine.load()?).context("Failed to open the atlas")
}
