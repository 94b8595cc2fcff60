//! On-disk dataset files.
//!
//! Each dataset lives in `<data_dir>/datasets/data_<key>.pmds`:
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0 | 4 | magic `PMDS` |
//! | 4 | 1 | format version |
//! | 5 | n | bincode-encoded [`Dataset`] |
//! | 5 + n | 8 | xxh64 (seed 0) of bytes `0..5+n`, little-endian |
//!
//! Files are streamed through a hashing writer into a uniquely named
//! temporary file in the dataset directory and renamed into place, so a reader either sees a complete file or none.
//! Loading streams the same way; the full file is never buffered.
//!
//! Every load failure (missing file, truncation, bad header, checksum
//! mismatch, decoding error, inconsistent contents) is reported as
//! [`Error::UnusableDataset`].

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use xxhash_rust::xxh64::Xxh64;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::index::IndexEntry;
use crate::key::ConfigurationKey;

/// File magic.
pub const DATASET_MAGIC: [u8; 4] = *b"PMDS";

/// Current format version.
pub const DATASET_VERSION: u8 = 1;

/// Sub-directory of the data directory holding dataset files.
pub const DATASET_DIR: &str = "datasets";

/// Extension of dataset files.
pub const DATASET_EXT: &str = "pmds";

const HEADER_LEN: u64 = 5;
const FOOTER_LEN: u64 = 8;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Where a dataset was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataset {
    /// Key of the stored configuration.
    pub key: ConfigurationKey,
    /// Path relative to the data directory, as recorded in the index.
    pub file: PathBuf,
    /// Bytes on disk.
    pub size_bytes: u64,
}

/// A dataset file found by [`DatasetStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Key parsed from the file name, if it has the expected shape.
    pub key: Option<ConfigurationKey>,
    /// Absolute path.
    pub path: PathBuf,
    /// Bytes on disk.
    pub size_bytes: u64,
}

/// Reads and writes dataset files under one data directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    /// A store rooted at `data_dir`. Nothing is touched on disk.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Creates the dataset directory.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        let dir = self.dataset_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))
    }

    /// `<data_dir>/datasets`.
    pub fn dataset_dir(&self) -> PathBuf {
        self.data_dir.join(DATASET_DIR)
    }

    /// Path relative to the data directory for `key`.
    pub fn relative_path(key: &ConfigurationKey) -> PathBuf {
        Path::new(DATASET_DIR).join(format!("data_{key}.{DATASET_EXT}"))
    }

    /// Absolute path for `key`.
    pub fn path_for(&self, key: &ConfigurationKey) -> PathBuf {
        self.data_dir.join(Self::relative_path(key))
    }

    /// Writes `dataset` atomically and returns where it went.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] or [`Error::Serialization`]; on error no file is left at
    /// the final path.
    pub fn save(&self, dataset: &Dataset) -> Result<StoredDataset> {
        self.ensure()?;
        let key = ConfigurationKey::of(dataset.configuration());
        let path = self.path_for(&key);
        let dir = self.dataset_dir();
        let tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| Error::io(format!("creating a temporary file in {}", dir.display()), e))?;

        // Dropping `tmp` on any error below removes the partial file.
        let size_bytes = write_file(tmp.as_file(), &path, dataset)?;
        tmp.persist(&path)
            .map_err(|e| Error::io(format!("renaming into {}", path.display()), e.error))?;
        info!(%key, path = %path.display(), size_bytes, "dataset stored");
        Ok(StoredDataset {
            file: Self::relative_path(&key),
            key,
            size_bytes,
        })
    }

    /// Loads the dataset stored for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::UnusableDataset`] for any failure.
    pub fn load(&self, key: &ConfigurationKey) -> Result<Dataset> {
        self.load_path(key, &self.path_for(key))
    }

    /// Loads the dataset an index entry refers to.
    ///
    /// # Errors
    ///
    /// [`Error::UnusableDataset`] for any failure.
    pub fn load_entry(&self, entry: &IndexEntry) -> Result<Dataset> {
        self.load_path(&entry.key, &self.data_dir.join(&entry.file))
    }

    fn load_path(&self, key: &ConfigurationKey, path: &Path) -> Result<Dataset> {
        let unusable = |reason: String| Error::UnusableDataset {
            key: key.clone(),
            reason,
        };
        let dataset = read_file(path).map_err(&unusable)?;
        let stored = ConfigurationKey::of(dataset.configuration());
        if &stored != key {
            return Err(unusable(format!("file holds configuration {stored}")));
        }
        dataset.check().map_err(&unusable)?;
        debug!(%key, path = %path.display(), "dataset loaded");
        Ok(dataset)
    }

    /// Lists the dataset files on disk, sorted by path.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the directory walk fails. A missing dataset
    /// directory yields an empty list.
    pub fn scan(&self) -> Result<Vec<StoredFile>> {
        let dir = self.dataset_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                Error::io(
                    format!("scanning {}", dir.display()),
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory loop")),
                )
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DATASET_EXT)
            {
                continue;
            }
            let size_bytes = entry
                .metadata()
                .map(|m| m.len())
                .map_err(|e| Error::io(format!("stat {}", path.display()), io::Error::other(e)))?;
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("data_"))
                .and_then(|s| s.parse().ok());
            files.push(StoredFile {
                key,
                path: path.to_path_buf(),
                size_bytes,
            });
        }
        Ok(files)
    }
}

/// Feeds every written byte into an xxh64 state.
struct HashingWriter<W> {
    inner: W,
    hasher: Xxh64,
    written: u64,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Feeds every read byte into an xxh64 state.
struct HashingReader<R> {
    inner: R,
    hasher: Xxh64,
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

fn write_file(file: &File, path: &Path, dataset: &Dataset) -> Result<u64> {
    let io_err = |e: io::Error| Error::io(format!("writing {}", path.display()), e);
    let mut out = HashingWriter {
        inner: BufWriter::new(file),
        hasher: Xxh64::new(0),
        written: 0,
    };
    out.write_all(&DATASET_MAGIC).map_err(io_err)?;
    out.write_all(&[DATASET_VERSION]).map_err(io_err)?;
    codec()
        .serialize_into(&mut out, dataset)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let checksum = out.hasher.digest();
    let mut inner = out.inner;
    inner.write_all(&checksum.to_le_bytes()).map_err(io_err)?;
    let file = inner.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    Ok(out.written + FOOTER_LEN)
}

fn read_file(path: &Path) -> std::result::Result<Dataset, String> {
    let file = File::open(path).map_err(|e| format!("opening {}: {e}", path.display()))?;
    let len = file.metadata().map_err(|e| e.to_string())?.len();
    if len < HEADER_LEN + FOOTER_LEN {
        return Err(format!("file is {len} bytes, too short"));
    }
    let payload_len = len - FOOTER_LEN;
    let mut reader = BufReader::new(file);
    let mut hashed = HashingReader {
        inner: (&mut reader).take(payload_len),
        hasher: Xxh64::new(0),
    };

    let mut header = [0u8; HEADER_LEN as usize];
    hashed.read_exact(&mut header).map_err(|e| e.to_string())?;
    if header[..4] != DATASET_MAGIC {
        return Err("bad magic".into());
    }
    if header[4] != DATASET_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {DATASET_VERSION})",
            header[4]
        ));
    }

    let decoded: std::result::Result<Dataset, _> = codec()
        .with_limit(payload_len - HEADER_LEN)
        .deserialize_from(&mut hashed);
    // Drain whatever the decoder left so the checksum covers the whole payload.
    let trailing = io::copy(&mut hashed, &mut io::sink()).map_err(|e| e.to_string())?;
    let computed = hashed.hasher.digest();

    let mut footer = [0u8; FOOTER_LEN as usize];
    reader.read_exact(&mut footer).map_err(|e| e.to_string())?;
    let stored = u64::from_le_bytes(footer);
    if stored != computed {
        return Err(format!(
            "checksum mismatch: stored={stored:#x}, computed={computed:#x}"
        ));
    }
    let dataset = decoded.map_err(|e| format!("decoding: {e}"))?;
    if trailing != 0 {
        return Err(format!("{trailing} trailing bytes after the dataset"));
    }
    Ok(dataset)
}
