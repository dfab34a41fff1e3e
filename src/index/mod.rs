//! Deduplication index for processed recipes
//!
//! The index is an insertion-ordered set of identifiers backed by an
//! append-only log file with one identifier per line. It is read fully when
//! opened, grows in memory as recipes are processed, and writes every new
//! identifier to the log before `add` returns.
//!
//! The log never holds an identifier that is missing from memory, and every
//! identifier confirmed by `add` reaches stable storage no later than `close`.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Errors that can occur while maintaining the index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to create index directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to read index {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Index log write failed: {0}")]
    Io(#[from] io::Error),

    #[error("Index is closed")]
    Closed,
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

struct IndexState {
    ids: Vec<String>,
    members: HashSet<String>,
    log: Option<File>,
}

/// Persistent, append-only set of processed identifiers
///
/// All operations take `&self`; the in-memory set and the log handle sit
/// behind one mutex, so concurrent workers can share an `Arc<DedupIndex>`.
pub struct DedupIndex {
    path: PathBuf,
    state: Mutex<IndexState>,
}

impl DedupIndex {
    /// Opens the index at `path`, loading any existing log
    ///
    /// A missing file is an empty index; its parent directories are created.
    /// A leading byte-order marker and trailing line whitespace are ignored.
    pub fn open(path: &Path) -> IndexResult<Self> {
        tracing::info!("Opening index file {}", path.display());

        let ids = match fs::read_to_string(path) {
            Ok(content) => parse_log(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("Index file not found, creating a new one");
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|source| IndexError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                Vec::new()
            }
            Err(source) => {
                return Err(IndexError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut members = HashSet::with_capacity(ids.len());
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if members.insert(id.clone()) {
                unique.push(id);
            }
        }

        let log = OpenOptions::new().create(true).append(true).open(path)?;

        tracing::debug!("Loaded {} identifiers from index", unique.len());

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(IndexState {
                ids: unique,
                members,
                log: Some(log),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the identifier has been processed before
    pub fn contains(&self, id: &str) -> bool {
        self.lock().members.contains(id)
    }

    /// Number of known identifiers
    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all identifiers in insertion order
    pub fn ids(&self) -> Vec<String> {
        self.lock().ids.clone()
    }

    /// Records an identifier
    ///
    /// Returns `Ok(true)` when the identifier was new and has been written to
    /// the log, `Ok(false)` when it was already present. After `close` every
    /// call fails with [`IndexError::Closed`] and leaves the set unchanged.
    pub fn add(&self, id: &str) -> IndexResult<bool> {
        let mut state = self.lock();

        if state.members.contains(id) {
            return Ok(false);
        }

        let log = state.log.as_mut().ok_or(IndexError::Closed)?;
        log.write_all(format!("{}\n", id).as_bytes())?;

        state.members.insert(id.to_string());
        state.ids.push(id.to_string());
        Ok(true)
    }

    /// Flushes the log and forces it to stable storage
    ///
    /// Calling this more than once is a no-op after the first success.
    pub fn close(&self) -> IndexResult<()> {
        let mut state = self.lock();

        if let Some(mut log) = state.log.take() {
            tracing::info!("Flushing index file");
            log.flush()?;
            log.sync_all()?;
            tracing::info!("Index file closed ({} identifiers)", state.ids.len());
        }

        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().log.is_none()
    }
}

impl Drop for DedupIndex {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Failed to close index {}: {}", self.path.display(), e);
        }
    }
}

fn parse_log(content: &str) -> Vec<String> {
    content
        .strip_prefix(BYTE_ORDER_MARK)
        .unwrap_or(content)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
