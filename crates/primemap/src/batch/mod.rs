//! Long-running generation sweeps.
//!
//! A [`BatchJob`] walks a list of configurations in order. Configurations
//! that already have a usable indexed dataset are skipped; the rest are
//! generated, stored and indexed one at a time. The [`Interrupt`] is checked
//! before each configuration and, through the generator, before each batch
//! of records. When it fires the current configuration is abandoned and the
//! sweep stops; everything stored before that stays valid.
//!
//! The report is checkpointed to [`PROGRESS_FILE`] in the data directory
//! after every configuration.
//!
//! # Examples
//!
//! ```no_run
//! use primemap::batch::BatchJob;
//! use primemap::{Atlas, EngineConfig, Interrupt};
//!
//! let atlas = Atlas::open(EngineConfig::default())?;
//! let report = BatchJob::default_target()?.run(&atlas, &Interrupt::new());
//! println!(
//!     "{} generated, {} skipped, {} failed",
//!     report.generated_count(),
//!     report.skipped_count(),
//!     report.failure_count()
//! );
//! # Ok::<(), primemap::Error>(())
//! ```

pub mod report;

use std::path::Path;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::atlas::Atlas;
use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::generator::Interrupt;
use crate::mapping::MappingStrategy;

pub use report::{ConfigurationResult, GenerationReport, Outcome, PROGRESS_FILE};

/// Circles in the default sweep target.
pub const TARGET_CIRCLES: u32 = 10_000;

/// Segments per circle in the default sweep target.
pub const TARGET_SEGMENTS: u32 = 1_300;

/// An ordered list of configurations to make available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchJob {
    configurations: Vec<Configuration>,
}

impl BatchJob {
    /// A job over `configurations`, in order.
    pub fn new(configurations: Vec<Configuration>) -> Self {
        Self { configurations }
    }

    /// The single 10 000 × 1 300 linear configuration.
    ///
    /// # Errors
    ///
    /// Never in practice; the constants are valid.
    pub fn default_target() -> Result<Self> {
        Ok(Self::new(vec![Configuration::new(
            TARGET_CIRCLES,
            TARGET_SEGMENTS,
            MappingStrategy::Linear,
        )?]))
    }

    /// The configurations, in run order.
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Runs the sweep against `atlas`.
    pub fn run(&self, atlas: &Atlas, interrupt: &Interrupt) -> GenerationReport {
        let total = self.configurations.len();
        let progress = atlas.config().data_dir.join(PROGRESS_FILE);
        let mut report = GenerationReport::planned(total);
        checkpoint(&report, &progress);
        info!(configurations = total, progress = %progress.display(), "batch started");

        for (i, config) in self.configurations.iter().enumerate() {
            if interrupt.is_triggered() {
                warn!(done = i, total, "batch interrupted between configurations");
                record(
                    &mut report,
                    ConfigurationResult::interrupted(config.clone(), "interrupted before start", 0),
                    &progress,
                );
                break;
            }
            if atlas.has_usable(config) {
                info!(
                    circles = config.circle_count(),
                    segments = config.segments_per_circle(),
                    "already indexed, skipping"
                );
                record(&mut report, ConfigurationResult::skipped(config.clone()), &progress);
                continue;
            }

            let started = Instant::now();
            let result = atlas.generate_and_store(config, interrupt);
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let recorded = match result {
                Ok((_, entry)) => {
                    info!(
                        key = %entry.key,
                        size_bytes = entry.size_bytes,
                        elapsed_ms,
                        progress = format!("{}/{total}", i + 1),
                        "configuration generated"
                    );
                    ConfigurationResult::generated(config.clone(), entry.size_bytes, elapsed_ms)
                }
                Err(e @ Error::Interrupted { .. }) => {
                    warn!(error = %e, "batch interrupted");
                    ConfigurationResult::interrupted(config.clone(), e.to_string(), elapsed_ms)
                }
                Err(e) => {
                    error!(error = %e, "configuration failed");
                    ConfigurationResult::failed(config.clone(), e.to_string(), elapsed_ms)
                }
            };
            let stop = recorded.outcome == Outcome::Interrupted;
            record(&mut report, recorded, &progress);
            if stop {
                break;
            }
        }

        info!(
            generated = report.generated_count(),
            skipped = report.skipped_count(),
            failed = report.failure_count(),
            interrupted = report.was_interrupted(),
            total_bytes = report.total_bytes(),
            "batch finished"
        );
        report
    }
}

fn record(report: &mut GenerationReport, result: ConfigurationResult, progress: &Path) {
    report.push(result);
    checkpoint(report, progress);
}

/// The progress file is informational; failing to write it never stops a sweep.
fn checkpoint(report: &GenerationReport, progress: &Path) {
    if let Err(e) = report.save(progress) {
        warn!(error = %e, "could not record sweep progress");
    }
}
