//! The atlas: index, store, resolver and generator behind one entry point.
//!
//! [`Atlas::resolve`] answers a request in three steps:
//!
//! 1. **Exact**: the index holds the request's key and the stored dataset
//!    loads. It is returned unchanged.
//! 2. **Similar**: otherwise the resolver ranks the indexed configurations;
//!    the best acceptable one whose dataset loads is returned with positions
//!    re-projected for the requested segment count.
//! 3. **Generated**: otherwise a fresh dataset is generated, written to the
//!    store, and only then appended to the index.
//!
//! An exact entry whose dataset is unusable skips step 2: the request is
//! regenerated so the damaged entry is superseded by a valid one.
//!
//! # Examples
//!
//! ```no_run
//! use primemap::{Atlas, Configuration, EngineConfig, MappingStrategy};
//!
//! let atlas = Atlas::open(EngineConfig::with_data_dir("data"))?;
//! let request = Configuration::new(10, 24, MappingStrategy::Linear)?;
//! let resolved = atlas.resolve(&request)?;
//! println!("{} records, score {}", resolved.dataset.len(), resolved.score());
//! # Ok::<(), primemap::Error>(())
//! ```

use std::fs;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::configuration::Configuration;
use crate::dataset::{Dataset, NumberRecord};
use crate::error::{Error, Result};
use crate::generator::{Generator, Interrupt};
use crate::index::{IndexEntry, IndexStats, ResultIndex};
use crate::key::ConfigurationKey;
use crate::resolver::{MatchResolver, MAX_SCORE};
use crate::store::DatasetStore;

/// Most alternatives [`Atlas::alternatives`] returns.
pub const MAX_ALTERNATIVES: usize = 5;

/// Where a resolved dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// Stored under the requested key.
    Exact {
        /// The requested key.
        key: ConfigurationKey,
    },
    /// Stored under a different key and adapted.
    Similar {
        /// Key of the stored dataset.
        key: ConfigurationKey,
        /// Its similarity score.
        score: u32,
    },
    /// Generated for this request, then stored and indexed.
    Generated {
        /// The requested key.
        key: ConfigurationKey,
    },
}

/// A dataset answering a request.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The configuration that was asked for.
    pub requested: Configuration,
    /// The records. For a similar match, the dataset keeps the stored
    /// configuration and its positions use the requested segment count.
    pub dataset: Dataset,
    /// How the dataset was obtained.
    pub source: Source,
}

impl Resolved {
    /// 100 for exact and generated results, the similarity otherwise.
    pub fn score(&self) -> u32 {
        match self.source {
            Source::Exact { .. } | Source::Generated { .. } => MAX_SCORE,
            Source::Similar { score, .. } => score,
        }
    }

    /// Key of the dataset that was returned.
    pub fn key(&self) -> &ConfigurationKey {
        match &self.source {
            Source::Exact { key } | Source::Similar { key, .. } | Source::Generated { key } => key,
        }
    }

    /// Records admitted by the requested filters.
    pub fn visible(&self) -> impl Iterator<Item = &NumberRecord> + '_ {
        self.dataset.filtered(self.requested.filters())
    }
}

/// Owns the engine state for one data directory.
#[derive(Debug)]
pub struct Atlas {
    config: EngineConfig,
    index: ResultIndex,
    store: DatasetStore,
    resolver: MatchResolver,
    generator: Generator,
}

impl Atlas {
    /// Creates the data directories and loads the index.
    ///
    /// # Errors
    ///
    /// [`Error::EngineConfig`] if `config` fails validation, [`Error::Io`] if
    /// the directories cannot be created. A missing or corrupt index is not
    /// an error.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(|message| Error::EngineConfig {
            path: config.data_dir.clone(),
            message,
        })?;
        fs::create_dir_all(&config.data_dir)
            .map_err(|e| Error::io(format!("creating {}", config.data_dir.display()), e))?;
        let store = DatasetStore::new(&config.data_dir);
        store.ensure()?;
        let index = ResultIndex::load(config.index_path());
        info!(
            data_dir = %config.data_dir.display(),
            entries = index.len(),
            "atlas opened"
        );
        Ok(Self {
            resolver: MatchResolver::new(config.resolver.min_score),
            generator: Generator::from_config(&config),
            index,
            store,
            config,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared index.
    pub fn index(&self) -> &ResultIndex {
        &self.index
    }

    /// The dataset store.
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// The generator.
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Resolves `config` without an interrupt.
    ///
    /// # Errors
    ///
    /// See [`resolve_with`](Self::resolve_with).
    pub fn resolve(&self, config: &Configuration) -> Result<Resolved> {
        self.resolve_with(config, &Interrupt::new())
    }

    /// Resolves `config`, generating if nothing stored qualifies.
    ///
    /// # Errors
    ///
    /// Only generation and persistence errors surface; unusable stored
    /// datasets fall through to generation.
    pub fn resolve_with(&self, config: &Configuration, interrupt: &Interrupt) -> Result<Resolved> {
        let key = ConfigurationKey::of(config);

        match self.exact(&key, config) {
            Lookup::Found(dataset) => {
                info!(%key, "exact match");
                return Ok(Resolved {
                    requested: config.clone(),
                    dataset,
                    source: Source::Exact { key },
                });
            }
            Lookup::Unusable => {}
            Lookup::Absent => {
                if let Some(resolved) = self.similar(config) {
                    return Ok(resolved);
                }
            }
        }

        let (dataset, _) = self.generate_and_store(config, interrupt)?;
        Ok(Resolved {
            requested: config.clone(),
            dataset,
            source: Source::Generated { key },
        })
    }

    fn exact(&self, key: &ConfigurationKey, config: &Configuration) -> Lookup {
        let Some(entry) = self.index.get(key) else {
            return Lookup::Absent;
        };
        if entry.configuration != *config {
            warn!(%key, "key collision, ignoring indexed entry");
            return Lookup::Absent;
        }
        match self.store.load_entry(&entry) {
            Ok(dataset) => Lookup::Found(dataset),
            Err(e) => {
                warn!(%key, error = %e, "indexed dataset unusable, regenerating");
                Lookup::Unusable
            }
        }
    }

    fn similar(&self, config: &Configuration) -> Option<Resolved> {
        let snapshot = self.index.snapshot();
        for candidate in self.resolver.ranked(config, &snapshot) {
            let key = candidate.entry.key.clone();
            match self.store.load_entry(&candidate.entry) {
                Ok(dataset) => {
                    info!(%key, score = candidate.score, "similar match");
                    return Some(Resolved {
                        requested: config.clone(),
                        dataset: dataset.reprojected(config.segments_per_circle()),
                        source: Source::Similar {
                            key,
                            score: candidate.score,
                        },
                    });
                }
                Err(e) => warn!(%key, error = %e, "candidate dataset unusable, skipping"),
            }
        }
        None
    }

    /// Generates `config`, writes the dataset, then appends its index entry.
    ///
    /// # Errors
    ///
    /// Generation, store or index errors. Nothing is indexed unless the
    /// dataset file was written.
    pub fn generate_and_store(
        &self,
        config: &Configuration,
        interrupt: &Interrupt,
    ) -> Result<(Dataset, IndexEntry)> {
        let dataset = self.generator.generate_with(config, interrupt)?;
        let stored = self.store.save(&dataset)?;
        let entry = IndexEntry::describe(&dataset, stored.file, stored.size_bytes);
        self.index.append(entry.clone())?;
        Ok((dataset, entry))
    }

    /// True if `config` has an indexed entry whose dataset loads.
    pub fn has_usable(&self, config: &Configuration) -> bool {
        matches!(self.exact(&ConfigurationKey::of(config), config), Lookup::Found(_))
    }

    /// Aggregate index figures.
    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Stored datasets with the same grid and mapping as `config`.
    pub fn alternatives(&self, config: &Configuration) -> Vec<IndexEntry> {
        self.index.alternatives(config, MAX_ALTERNATIVES)
    }
}

enum Lookup {
    Found(Dataset),
    Unusable,
    Absent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingStrategy;

    fn open(dir: &std::path::Path) -> Atlas {
        Atlas::open(EngineConfig::with_data_dir(dir)).unwrap()
    }

    fn config(c: u32, s: u32, m: MappingStrategy) -> Configuration {
        Configuration::new(c, s, m).unwrap()
    }

    #[test]
    fn open_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/data");
        let atlas = open(&root);
        assert!(atlas.store().dataset_dir().is_dir());
        assert!(atlas.index().is_empty());
    }

    #[test]
    fn invalid_engine_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.generator.batch_size = 0;
        assert!(matches!(Atlas::open(config), Err(Error::EngineConfig { .. })));
    }

    #[test]
    fn generate_then_exact() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        let c = config(10, 24, MappingStrategy::Linear);

        let first = atlas.resolve(&c).unwrap();
        assert!(matches!(first.source, Source::Generated { .. }));
        assert_eq!(first.score(), 100);
        assert_eq!(atlas.index().len(), 1);

        let second = atlas.resolve(&c).unwrap();
        assert!(matches!(second.source, Source::Exact { .. }));
        assert_eq!(second.dataset, first.dataset);
        assert_eq!(second.score(), 100);
        assert_eq!(atlas.index().len(), 1);
    }

    #[test]
    fn similar_match_reprojects() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        let stored = config(10, 24, MappingStrategy::Linear);
        atlas.resolve(&stored).unwrap();

        let request = config(10, 20, MappingStrategy::Linear);
        let resolved = atlas.resolve(&request).unwrap();
        assert_eq!(resolved.score(), 50 + 25 + 17);
        assert!(matches!(resolved.source, Source::Similar { .. }));
        assert_eq!(resolved.dataset.configuration(), &stored);
        let r = resolved.dataset.record(11).unwrap();
        assert_eq!(r.segment, 10);
        assert!((r.position.angle - 180.0).abs() < 1e-12);
        assert_eq!(atlas.index().len(), 1);
    }

    #[test]
    fn distant_request_is_generated() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        atlas.resolve(&config(10, 24, MappingStrategy::Linear)).unwrap();
        let resolved = atlas
            .resolve(&config(40, 60, MappingStrategy::Logarithmic))
            .unwrap();
        assert!(matches!(resolved.source, Source::Generated { .. }));
        assert_eq!(resolved.dataset.len(), 2_400);
        assert_eq!(atlas.index().len(), 2);
    }

    #[test]
    fn corrupt_exact_entry_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        let c = config(6, 6, MappingStrategy::ArchimedeanSpiral);
        let original = atlas.resolve(&c).unwrap();
        let path = atlas.store().path_for(original.key());
        fs::write(&path, b"PMDS\x01garbage").unwrap();

        let again = atlas.resolve(&c).unwrap();
        assert!(matches!(again.source, Source::Generated { .. }));
        assert_eq!(again.dataset, original.dataset);
        assert_eq!(atlas.index().len(), 2);
        assert!(atlas.has_usable(&c));
    }

    #[test]
    fn interrupted_resolution_indexes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let err = atlas
            .resolve_with(&config(5, 5, MappingStrategy::Linear), &interrupt)
            .unwrap_err();
        assert!(err.is_interrupted());
        assert!(atlas.index().is_empty());
        assert!(atlas.store().scan().unwrap().is_empty());
    }

    #[test]
    fn visible_applies_requested_filters() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = open(dir.path());
        let c = config(10, 24, MappingStrategy::Linear).with_filters(
            crate::configuration::CategoryFilters::new()
                .hide("composite")
                .unwrap(),
        );
        let resolved = atlas.resolve(&c).unwrap();
        let visible = resolved.visible().count() as u64;
        assert_eq!(visible, resolved.dataset.statistics().total_primes);
    }

    #[test]
    fn reopen_sees_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(3, 9, MappingStrategy::FibonacciSpiral);
        open(dir.path()).resolve(&c).unwrap();
        let atlas = open(dir.path());
        assert_eq!(atlas.stats().entries, 1);
        assert!(matches!(atlas.resolve(&c).unwrap().source, Source::Exact { .. }));
    }
}
