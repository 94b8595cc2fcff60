//! `primemap-generate` — Runs a generation sweep and indexes the results.
//!
//! Without `--target`, the sweep covers the single 10 000 × 1 300 linear
//! layout (13 000 000 numbers). Targets that already have a usable dataset
//! are skipped, so re-running the sweep is cheap.
//!
//! Ctrl-C or SIGTERM stops the sweep at the next batch boundary; datasets
//! finished before that stay indexed. Progress is recorded in
//! `<data-dir>/generation_progress.json` as the sweep runs.
//!
//! **Usage:**
//! ```text
//! primemap-generate [--data-dir <dir>] [--config <file>] [--target 40x60:fibonacci-spiral]...
//! ```
//!
//! Exits with status 1 if any target failed and 130 if the sweep was
//! interrupted.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use primemap::batch::{BatchJob, Outcome};
use primemap::{Atlas, Configuration};
use primemap_clients::{init_tracing, interrupt_on_signal, parse_target, EngineArgs};

/// Generate and index polar prime datasets.
#[derive(Parser)]
#[command(
    name = "primemap-generate",
    about = "Generate and index polar prime datasets"
)]
struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    /// Layout to generate, as CIRCLESxSEGMENTS[:MAPPING]. Repeatable.
    #[arg(long = "target", value_parser = parse_target)]
    targets: Vec<Configuration>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let engine = args.engine.load()?;
    let atlas = Atlas::open(engine).context("Failed to open the atlas")?;
    let interrupt = interrupt_on_signal()?;

    let job = if args.targets.is_empty() {
        BatchJob::default_target()?
    } else {
        BatchJob::new(args.targets)
    };
    let report = job.run(&atlas, &interrupt);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("primemap generation report");
        println!("==========================");
        println!();
        for result in &report.results {
            let status = match result.outcome {
                Outcome::Generated => "GEN ",
                Outcome::Skipped => "SKIP",
                Outcome::Failed => "FAIL",
                Outcome::Interrupted => "STOP",
            };
            let c = &result.configuration;
            println!(
                "[{}] {} {}x{} {} — {}",
                status,
                result.key,
                c.circle_count(),
                c.segments_per_circle(),
                c.mapping(),
                result.message
            );
        }
        println!();
        println!(
            "Summary: {} generated, {} skipped, {} failed, {} bytes written",
            report.generated_count(),
            report.skipped_count(),
            report.failure_count(),
            report.total_bytes()
        );
    }

    if report.failure_count() > 0 {
        eprintln!(
            "Generation FAILED: {} target(s) did not complete.",
            report.failure_count()
        );
        process::exit(1);
    }
    if report.was_interrupted() {
        eprintln!("Generation interrupted; re-run to resume.");
        process::exit(130);
    }
    Ok(())
}
