//! `primemap-resolve` — Resolves one layout request and prints a JSON summary.
//!
//! The summary names the dataset that answered the request (exact, similar
//! or freshly generated), its score, statistics, the visible record count
//! after filters, and up to five stored alternatives with the same geometry.
//!
//! **Usage:**
//! ```text
//! primemap-resolve --circles 10 --segments 24 [--mapping linear] [--hide composite]... [--records 20]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use anyhow::{Context, Result};
use clap::Parser;
use primemap::{Atlas, Category, CategoryFilters, Configuration, MappingStrategy};
use primemap_clients::{init_tracing, EngineArgs};
use serde_json::json;

/// Resolve a polar prime layout.
#[derive(Parser)]
#[command(name = "primemap-resolve", about = "Resolve a polar prime layout request")]
struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    /// Number of concentric circles.
    #[arg(long)]
    circles: u32,

    /// Segments per circle.
    #[arg(long)]
    segments: u32,

    /// Mapping strategy.
    #[arg(long, default_value = "linear")]
    mapping: MappingStrategy,

    /// Category to hide from the visible records. Repeatable.
    #[arg(long = "hide", value_name = "CATEGORY")]
    hidden: Vec<Category>,

    /// Include the first N visible records in the output.
    #[arg(long, default_value_t = 0)]
    records: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let engine = args.engine.load()?;

    let filters: CategoryFilters = args.hidden.iter().map(|&c| (c, false)).collect();
    let request = Configuration::new(args.circles, args.segments, args.mapping)
        .context("Invalid layout request")?
        .with_filters(filters);

    let atlas = Atlas::open(engine).context("Failed to open the atlas")?;
    let resolved = atlas.resolve(&request).context("Failed to resolve the request")?;
    let alternatives: Vec<_> = atlas
        .alternatives(&request)
        .into_iter()
        .map(|e| {
            json!({
                "key": e.key,
                "filters": e.configuration.filters(),
                "size_bytes": e.size_bytes,
            })
        })
        .collect();
    let visible: Vec<_> = resolved.visible().take(args.records).collect();

    let summary = json!({
        "requested": resolved.requested,
        "key": resolved.key(),
        "source": resolved.source,
        "score": resolved.score(),
        "stored_configuration": resolved.dataset.configuration(),
        "statistics": resolved.dataset.statistics(),
        "visible_count": resolved.visible().count(),
        "records": visible,
        "alternatives": alternatives,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
