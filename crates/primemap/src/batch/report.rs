//! Batch report types: per-configuration results and summary counters.
//!
//! A running sweep checkpoints its report to
//! `<data_dir>/generation_progress.json` after every configuration, so the
//! progress of an interrupted or still-running sweep can be read back with
//! [`GenerationReport::load`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::index::{replace_file, unix_now};
use crate::key::ConfigurationKey;

/// File name of the sweep progress record inside the data directory.
pub const PROGRESS_FILE: &str = "generation_progress.json";

/// What happened to one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Generated, stored and indexed.
    Generated,
    /// A usable dataset was already indexed.
    Skipped,
    /// Generation or persistence failed.
    Failed,
    /// Stopped by the interrupt before completion.
    Interrupted,
}

/// Result for one configuration of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResult {
    /// The configuration.
    pub configuration: Configuration,
    /// Its key.
    pub key: ConfigurationKey,
    /// Outcome.
    pub outcome: Outcome,
    /// Human-readable description.
    pub message: String,
    /// Bytes written, for generated datasets.
    pub size_bytes: u64,
    /// Wall time spent on this configuration.
    pub elapsed_ms: u64,
}

impl ConfigurationResult {
    /// A generated result.
    pub fn generated(configuration: Configuration, size_bytes: u64, elapsed_ms: u64) -> Self {
        Self::new(configuration, Outcome::Generated, "generated", size_bytes, elapsed_ms)
    }

    /// A skipped result.
    pub fn skipped(configuration: Configuration) -> Self {
        Self::new(configuration, Outcome::Skipped, "already indexed", 0, 0)
    }

    /// A failed result.
    pub fn failed(configuration: Configuration, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::new(configuration, Outcome::Failed, message, 0, elapsed_ms)
    }

    /// An interrupted result.
    pub fn interrupted(
        configuration: Configuration,
        message: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self::new(configuration, Outcome::Interrupted, message, 0, elapsed_ms)
    }

    fn new(
        configuration: Configuration,
        outcome: Outcome,
        message: impl Into<String>,
        size_bytes: u64,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            key: ConfigurationKey::of(&configuration),
            configuration,
            outcome,
            message: message.into(),
            size_bytes,
            elapsed_ms,
        }
    }

    /// True for [`Outcome::Failed`].
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Aggregated report of a sweep.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Configurations the sweep was asked to cover.
    #[serde(default)]
    pub planned: usize,
    /// Unix seconds at which the sweep started.
    #[serde(default)]
    pub started_at: u64,
    /// Unix seconds of the last recorded result.
    #[serde(default)]
    pub updated_at: u64,
    /// One result per configuration that was reached.
    pub results: Vec<ConfigurationResult>,
}

impl GenerationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty report for a sweep over `planned` configurations, stamped
    /// with the current time.
    pub fn planned(planned: usize) -> Self {
        let now = unix_now();
        Self {
            planned,
            started_at: now,
            updated_at: now,
            results: Vec::new(),
        }
    }

    /// Appends a result.
    pub fn push(&mut self, result: ConfigurationResult) {
        self.results.push(result);
        self.updated_at = unix_now();
    }

    /// Planned configurations without a result yet.
    pub fn remaining(&self) -> usize {
        self.planned.saturating_sub(self.results.len())
    }

    /// Writes the report as pretty JSON, replacing `path` atomically.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] or [`Error::Io`].
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        replace_file(path, &bytes)
            .map_err(|e| Error::io(format!("writing progress {}", path.display()), e))
    }

    /// Reads a report written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Serialization`] if
    /// it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| Error::io(format!("reading progress {}", path.display()), e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Datasets generated.
    pub fn generated_count(&self) -> usize {
        self.count(Outcome::Generated)
    }

    /// Configurations skipped.
    pub fn skipped_count(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Configurations that failed.
    pub fn failure_count(&self) -> usize {
        self.count(Outcome::Failed)
    }

    /// True if the sweep stopped early.
    pub fn was_interrupted(&self) -> bool {
        self.count(Outcome::Interrupted) > 0
    }

    /// Bytes written across generated datasets.
    pub fn total_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.size_bytes).sum()
    }

    /// True if nothing failed and the sweep ran to the end.
    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0 && !self.was_interrupted()
    }
}
