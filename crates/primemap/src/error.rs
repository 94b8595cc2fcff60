//! Error type shared by every fallible operation in the crate.
//!
//! Pure computations (primality, classification, mapping) are total and never
//! produce these. Errors come from configuration validation, persistence, and
//! interrupted or failed generation.

use std::path::PathBuf;

use crate::key::ConfigurationKey;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the atlas engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration was rejected before any computation started.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine configuration file could not be read or parsed.
    #[error("engine config {}: {message}", path.display())]
    EngineConfig {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser or I/O message.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding a persisted value failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored dataset exists in the index but cannot be used.
    #[error("dataset {key} is unusable: {reason}")]
    UnusableDataset {
        /// Key of the index entry that referenced the dataset.
        key: ConfigurationKey,
        /// Why the dataset was rejected.
        reason: String,
    },

    /// Generation was stopped through an [`Interrupt`](crate::Interrupt)
    /// before the dataset was complete. Nothing was persisted.
    #[error("generation interrupted after {completed} of {total} elements")]
    Interrupted {
        /// Elements produced before the interrupt was observed.
        completed: u64,
        /// Elements the configuration required.
        total: u64,
    },

    /// Generation failed for a reason other than interruption.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl Error {
    /// Wraps an I/O error with a description of the attempted operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors that mean "treat the stored entry as missing".
    pub fn is_unusable(&self) -> bool {
        matches!(self, Self::UnusableDataset { .. })
    }

    /// True if the error came from an [`Interrupt`](crate::Interrupt).
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
