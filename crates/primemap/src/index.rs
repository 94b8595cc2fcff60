//! Persisted index of stored datasets.
//!
//! The index is an append-only list of [`IndexEntry`] values kept in
//! `<data_dir>/index.json`:
//!
//! ```text
//! { "version": 1, "entries": [ { "key": "3f2a...", ... }, ... ] }
//! ```
//!
//! Readers take a cheap [`Arc`] snapshot and never block on writers. An
//! append re-reads `index.json`, merges in entries other handles (or other
//! processes) have written since, serializes the full list to a uniquely named
//! temporary file in the same directory, renames it over `index.json`, and
//! only then publishes the new snapshot. A reader therefore only ever sees a
//! complete index, and an append never drops an entry another writer has
//! already persisted.
//!
//! A missing, unreadable or unparsable file loads as an empty index.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::configuration::Configuration;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::key::ConfigurationKey;

/// Version written into `index.json`.
pub const INDEX_VERSION: u32 = 1;

/// File name of the index inside the data directory.
pub const INDEX_FILE: &str = "index.json";

/// Descriptor of one stored dataset.
///
/// Carries everything the resolver needs to score a candidate without
/// loading the dataset itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Key of `configuration`.
    pub key: ConfigurationKey,
    /// The configuration the dataset was generated for.
    pub configuration: Configuration,
    /// Number of records.
    pub element_count: u64,
    /// Number of primes among them.
    pub prime_count: u64,
    /// Prime share in percent.
    pub density: f64,
    /// Dataset file, relative to the data directory.
    pub file: PathBuf,
    /// Size of the dataset file in bytes.
    pub size_bytes: u64,
    /// Unix seconds at which the entry was appended.
    pub created_at: u64,
}

impl IndexEntry {
    /// Describes a dataset that has been written to `file`.
    pub fn describe(dataset: &Dataset, file: PathBuf, size_bytes: u64) -> Self {
        let stats = dataset.statistics();
        Self {
            key: ConfigurationKey::of(dataset.configuration()),
            configuration: dataset.configuration().clone(),
            element_count: stats.total_elements,
            prime_count: stats.total_primes,
            density: stats.density,
            file,
            size_bytes,
            created_at: unix_now(),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    entries: Vec<IndexEntry>,
}

/// Aggregate figures over the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of entries.
    pub entries: usize,
    /// Sum of `size_bytes`.
    pub total_bytes: u64,
    /// Sum of `element_count`.
    pub total_elements: u64,
    /// Smallest and largest circle count, if any entry exists.
    pub circle_range: Option<(u32, u32)>,
    /// Smallest and largest segment count, if any entry exists.
    pub segment_range: Option<(u32, u32)>,
}

/// The shared, persisted index.
///
/// # Examples
///
/// ```no_run
/// use primemap::ResultIndex;
///
/// let index = ResultIndex::load("data/index.json");
/// println!("{} stored datasets", index.len());
/// ```
pub struct ResultIndex {
    path: PathBuf,
    snapshot: RwLock<Arc<Vec<IndexEntry>>>,
    writer: Mutex<()>,
}

impl ResultIndex {
    /// Loads the index at `path`. Never fails: a missing or corrupt file
    /// yields an empty index.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(Some(entries)) => {
                info!(path = %path.display(), entries = entries.len(), "index loaded");
                entries
            }
            Ok(None) => {
                debug!(path = %path.display(), "no index file, starting empty");
                Vec::new()
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "index unusable, starting empty");
                Vec::new()
            }
        };
        Self {
            path,
            snapshot: RwLock::new(Arc::new(entries)),
            writer: Mutex::new(()),
        }
    }

    /// Path of the persisted form.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current complete list of entries, in append order.
    pub fn snapshot(&self) -> Arc<Vec<IndexEntry>> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True if nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Most recently appended entry for `key`.
    pub fn get(&self, key: &ConfigurationKey) -> Option<IndexEntry> {
        self.snapshot().iter().rev().find(|e| &e.key == key).cloned()
    }

    /// True if some entry has `key`.
    pub fn contains(&self, key: &ConfigurationKey) -> bool {
        self.snapshot().iter().any(|e| &e.key == key)
    }

    /// Appends `entry` and rewrites the persisted index.
    ///
    /// Entries persisted by other handles since this one last wrote are
    /// merged in first and become visible in the new snapshot. The in-memory
    /// snapshot changes only after the new file is in place; on error neither
    /// is modified.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] or [`Error::Serialization`] if the index file cannot be
    /// written.
    pub fn append(&self, entry: IndexEntry) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.merged_with_persisted();
        let key = entry.key.clone();
        entries.push(entry);
        self.persist(&entries)?;
        let count = entries.len();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(entries);
        info!(%key, entries = count, "index entry appended");
        Ok(())
    }

    /// The persisted entries followed by any of ours the file lacks.
    fn merged_with_persisted(&self) -> Vec<IndexEntry> {
        let ours = self.snapshot();
        let mut entries = match read_entries(&self.path) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    %reason,
                    "persisted index unusable, rewriting from memory"
                );
                Vec::new()
            }
        };
        let persisted = entries.len();
        for e in ours.iter() {
            if !entries.contains(e) {
                entries.push(e.clone());
            }
        }
        if persisted > ours.len() {
            debug!(
                path = %self.path.display(),
                picked_up = persisted - ours.len(),
                "merged entries from other writers"
            );
        }
        entries
    }

    fn persist(&self, entries: &[IndexEntry]) -> Result<()> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            version: u32,
            entries: &'a [IndexEntry],
        }
        let bytes = serde_json::to_vec_pretty(&Borrowed {
            version: INDEX_VERSION,
            entries,
        })
        .map_err(|e| Error::Serialization(e.to_string()))?;

        replace_file(&self.path, &bytes)
            .map_err(|e| Error::io(format!("writing index {}", self.path.display()), e))
    }

    /// Aggregate figures over every entry.
    pub fn stats(&self) -> IndexStats {
        let entries = self.snapshot();
        let mut stats = IndexStats {
            entries: entries.len(),
            ..IndexStats::default()
        };
        for e in entries.iter() {
            stats.total_bytes += e.size_bytes;
            stats.total_elements += e.element_count;
            let c = e.configuration.circle_count();
            let s = e.configuration.segments_per_circle();
            stats.circle_range = Some(widen(stats.circle_range, c));
            stats.segment_range = Some(widen(stats.segment_range, s));
        }
        stats
    }

    /// Up to `limit` other stored datasets with the same grid and mapping as
    /// `config` (they differ only in filters), newest first, one per key.
    pub fn alternatives(&self, config: &Configuration, limit: usize) -> Vec<IndexEntry> {
        let own = ConfigurationKey::of(config);
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for e in self.snapshot().iter().rev() {
            if out.len() >= limit {
                break;
            }
            if e.key == own || seen.contains(&e.key) || !e.configuration.same_geometry(config) {
                continue;
            }
            seen.push(e.key.clone());
            out.push(e.clone());
        }
        out
    }
}

impl std::fmt::Debug for ResultIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultIndex")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

fn widen(range: Option<(u32, u32)>, v: u32) -> (u32, u32) {
    match range {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
    }
}

/// Writes `bytes` to a uniquely named temporary file next to `path`, syncs
/// it, and renames it over `path`. The temporary file is removed on error.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_entries(path: &Path) -> std::result::Result<Option<Vec<IndexEntry>>, String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    if file.version != INDEX_VERSION {
        return Err(format!("unsupported index version {}", file.version));
    }
    Ok(Some(file.entries))
}
