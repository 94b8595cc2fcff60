//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```toml
//! data_dir = "data"
//!
//! [primality]
//! sieve_threshold = 1000000
//! chunk_size = 1000000
//!
//! [generator]
//! batch_size = 100000
//! max_elements = 13000000
//!
//! [resolver]
//! min_score = 30
//! ```
//!
//! `PRIMEMAP_DATA_DIR`, when set, overrides `data_dir` through
//! [`EngineConfig::with_env_overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generator::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ELEMENTS};
use crate::primality::{DEFAULT_CHUNK_SIZE, DEFAULT_SIEVE_THRESHOLD};
use crate::resolver::{DEFAULT_MIN_SCORE, MAX_SCORE};

/// Environment variable overriding [`EngineConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "PRIMEMAP_DATA_DIR";

// ============================================================================
// SECTIONS
// ============================================================================

/// `[primality]`: prime enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimalitySettings {
    /// Table bounds above this use the chunked path.
    pub sieve_threshold: u64,
    /// Numbers per chunk on the chunked path.
    pub chunk_size: u64,
}

impl Default for PrimalitySettings {
    fn default() -> Self {
        Self {
            sieve_threshold: DEFAULT_SIEVE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// `[generator]`: dataset synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Records per batch.
    pub batch_size: u64,
    /// Largest accepted `circle_count × segments_per_circle`.
    pub max_elements: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

/// `[resolver]`: approximate matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSettings {
    /// Scores must be strictly above this to be accepted.
    pub min_score: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

// ============================================================================
// ROOT
// ============================================================================

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory holding `index.json` and `datasets/`.
    pub data_dir: PathBuf,
    /// Prime enumeration.
    pub primality: PrimalitySettings,
    /// Dataset synthesis.
    pub generator: GeneratorSettings,
    /// Approximate matching.
    pub resolver: ResolverSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            primality: PrimalitySettings::default(),
            generator: GeneratorSettings::default(),
            resolver: ResolverSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `data_dir` replaced.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`Error::EngineConfig`] if the file cannot be read, does not parse, or
    /// fails [`validate`](Self::validate).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::EngineConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|message| Error::EngineConfig {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// The parser or validation message.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// A message naming the offending field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".into());
        }
        if self.primality.chunk_size == 0 {
            return Err("primality.chunk_size must be at least 1".into());
        }
        if self.generator.batch_size == 0 {
            return Err("generator.batch_size must be at least 1".into());
        }
        if self.generator.max_elements == 0 {
            return Err("generator.max_elements must be at least 1".into());
        }
        if self.resolver.min_score >= MAX_SCORE {
            return Err(format!(
                "resolver.min_score must be below {MAX_SCORE}, got {}",
                self.resolver.min_score
            ));
        }
        Ok(())
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(crate::index::INDEX_FILE)
    }
}
