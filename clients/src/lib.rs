//! Shared plumbing for the primemap client binaries: logging setup, engine
//! configuration flags, termination signals, and target parsing.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::future::Future;
use std::path::PathBuf;
use std::{io, process, thread};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use primemap::{Configuration, EngineConfig, Interrupt, MappingStrategy};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// An [`Interrupt`] that fires on Ctrl-C, or SIGTERM on Unix.
///
/// Signals are awaited on a dedicated thread driving a current-thread tokio
/// runtime, so callers stay synchronous. The handlers are installed before
/// this returns. A second Ctrl-C exits the process immediately with status
/// 130.
///
/// # Errors
///
/// If the runtime, the handlers or the thread cannot be set up.
pub fn interrupt_on_signal() -> Result<Interrupt> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the signal runtime")?;
    let first = {
        let _context = runtime.enter();
        termination().context("Failed to install signal handlers")?
    };

    let interrupt = Interrupt::new();
    let trigger = interrupt.clone();
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            let Some(signal) = runtime.block_on(first) else {
                return;
            };
            warn!(signal, "termination requested, stopping at the next batch boundary");
            trigger.trigger();
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                warn!("second interrupt, exiting now");
                process::exit(130);
            }
        })
        .context("Failed to spawn the signal thread")?;
    Ok(interrupt)
}

/// Resolves to the name of the first termination signal received, or `None`
/// if no signal source is left to wait on.
#[cfg(unix)]
fn termination() -> io::Result<impl Future<Output = Option<&'static str>>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => Some("SIGINT"),
            Some(()) = terminate.recv() => Some("SIGTERM"),
            else => None,
        }
    })
}

#[cfg(not(unix))]
fn termination() -> io::Result<impl Future<Output = Option<&'static str>>> {
    Ok(async { tokio::signal::ctrl_c().await.ok().map(|()| "ctrl-c") })
}

/// Flags every binary accepts for locating and tuning the engine.
#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// TOML engine configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Data directory (overrides the file and PRIMEMAP_DATA_DIR).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Minimum similarity score; matches must score strictly above it.
    #[arg(long)]
    pub min_score: Option<u32>,

    /// Records generated per batch.
    #[arg(long)]
    pub batch_size: Option<u64>,
}

impl EngineArgs {
    /// File (or defaults), then environment, then flags.
    ///
    /// # Errors
    ///
    /// If the file cannot be loaded or the result fails validation.
    pub fn load(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load engine config {}", path.display()))?,
            None => EngineConfig::default(),
        }
        .with_env_overrides();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(score) = self.min_score {
            config.resolver.min_score = score;
        }
        if let Some(size) = self.batch_size {
            config.generator.batch_size = size;
        }
        config
            .validate()
            .map_err(|message| anyhow!("Invalid engine configuration: {message}"))?;
        Ok(config)
    }
}

/// Parses `CIRCLESxSEGMENTS[:MAPPING]`, e.g. `10000x1300` or
/// `40x60:fibonacci-spiral`. The mapping defaults to linear.
///
/// # Errors
///
/// A message describing the malformed part.
pub fn parse_target(s: &str) -> std::result::Result<Configuration, String> {
    let (grid, mapping) = match s.split_once(':') {
        Some((grid, mapping)) => (
            grid,
            mapping
                .parse::<MappingStrategy>()
                .map_err(|e| e.to_string())?,
        ),
        None => (s, MappingStrategy::Linear),
    };
    let (circles, segments) = grid
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected CIRCLESxSEGMENTS, got `{grid}`"))?;
    let circles: u32 = circles
        .trim()
        .parse()
        .map_err(|e| format!("circles `{circles}`: {e}"))?;
    let segments: u32 = segments
        .trim()
        .parse()
        .map_err(|e| format!("segments `{segments}`: {e}"))?;
    Configuration::new(circles, segments, mapping).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse() {
        let c = parse_target("10000x1300").unwrap();
        assert_eq!(c.limit(), 13_000_000);
        assert_eq!(c.mapping(), MappingStrategy::Linear);

        let c = parse_target("40X60:fibonacci").unwrap();
        assert_eq!((c.circle_count(), c.segments_per_circle()), (40, 60));
        assert_eq!(c.mapping(), MappingStrategy::FibonacciSpiral);
    }

    #[test]
    fn bad_targets_are_rejected() {
        assert!(parse_target("10").is_err());
        assert!(parse_target("0x10").is_err());
        assert!(parse_target("10x10:hexagonal").is_err());
        assert!(parse_target("ax10").is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("engine.toml");
        std::fs::write(&file, "data_dir = \"from-file\"\n[resolver]\nmin_score = 40\n").unwrap();
        let args = EngineArgs {
            config: Some(file),
            data_dir: Some(dir.path().join("from-flag")),
            min_score: None,
            batch_size: Some(10),
        };
        let config = args.load().unwrap();
        assert_eq!(config.data_dir, dir.path().join("from-flag"));
        assert_eq!(config.resolver.min_score, 40);
        assert_eq!(config.generator.batch_size, 10);
    }

    #[cfg(unix)]
    #[test]
    fn sigterm_triggers_the_interrupt() {
        let interrupt = interrupt_on_signal().unwrap();
        assert!(!interrupt.is_triggered());

        let status = process::Command::new("kill")
            .args(["-TERM", &process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        for _ in 0..500 {
            if interrupt.is_triggered() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(interrupt.is_triggered());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = EngineArgs {
            batch_size: Some(0),
            ..EngineArgs::default()
        };
        assert!(args.load().is_err());
    }
}
