//! Deduplicating output sink.
//!
//! A [`DedupSink`] sits in front of an [`OutputStore`] and guarantees that
//! each key is persisted at most once. The set of already written keys
//! ([`SeenSet`]) is rebuilt from the store at startup with
//! [`load_existing`]; it is never stored on its own.
//!
//! Records are buffered and written in batches. The owner decides when to
//! [`DedupSink::flush`]. A failed flush keeps the batch buffered so the next
//! flush retries it.

pub mod csv_table;
pub mod username_list;

pub use csv_table::CsvTable;
pub use username_list::{Username, UsernameList};

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by output stores.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl SinkError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        SinkError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A record with a dedup key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Persistent, record-oriented output.
pub trait OutputStore {
    type Record: Keyed + Clone;

    /// Location of the output, for diagnostics.
    fn path(&self) -> &Path;

    /// Read every persisted record. A missing output is empty.
    fn load(&self) -> Result<Vec<Self::Record>, SinkError>;

    /// Add records after the existing ones.
    fn append(&self, records: &[Self::Record]) -> Result<(), SinkError>;

    /// Replace the whole output with `records`.
    fn overwrite(&self, records: &[Self::Record]) -> Result<(), SinkError>;
}

/// Keys already persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` when the key was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn clear(&mut self) {
        self.keys.clear();
    }
}

impl<K: Into<String>> FromIterator<K> for SeenSet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// How a flush treats the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the destination with this run's records
    Overwrite,
    /// Add unseen records after the existing ones
    Append,
}

/// Scan a store for already written records.
///
/// Returns the keys for seeding a [`SeenSet`] and the records themselves,
/// so callers can recover earlier results without asking the remote side
/// again. Records with an empty key are dropped.
pub fn load_existing<S: OutputStore>(
    store: &S,
) -> Result<(SeenSet, Vec<S::Record>), SinkError> {
    let records: Vec<_> = store
        .load()?
        .into_iter()
        .filter(|r| !r.key().is_empty())
        .collect();
    let seen = records.iter().map(|r| r.key().to_string()).collect();
    Ok((seen, records))
}

/// At-most-once writer over an [`OutputStore`].
pub struct DedupSink<S: OutputStore> {
    store: S,
    mode: WriteMode,
    seen: SeenSet,
    /// Append: records not yet written. Overwrite: all records of the run.
    buffer: Vec<S::Record>,
    buffered_keys: HashSet<String>,
    /// Append mode: buffered records not yet persisted
    unflushed: usize,
}

impl<S: OutputStore> DedupSink<S> {
    /// Sink with an empty seen set.
    pub fn new(store: S, mode: WriteMode) -> Self {
        Self::with_seen(store, mode, SeenSet::new())
    }

    /// Sink seeded with keys from an earlier run.
    pub fn with_seen(store: S, mode: WriteMode, seen: SeenSet) -> Self {
        Self {
            store,
            mode,
            seen,
            buffer: Vec::new(),
            buffered_keys: HashSet::new(),
            unflushed: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Whether `key` is persisted or waiting in the buffer.
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key) || self.buffered_keys.contains(key)
    }

    /// Records accepted but not yet durable.
    pub fn pending(&self) -> usize {
        self.unflushed
    }

    /// Buffer a record. Returns `false` and drops it when the key is known.
    pub fn push(&mut self, record: S::Record) -> bool {
        if self.contains(record.key()) {
            return false;
        }
        self.buffered_keys.insert(record.key().to_string());
        self.buffer.push(record);
        self.unflushed += 1;
        true
    }

    /// Persist the buffer according to the sink's mode.
    ///
    /// Returns how many records became durable. On error the buffer is
    /// kept for the next attempt.
    pub fn flush(&mut self) -> Result<usize, SinkError> {
        match self.mode {
            WriteMode::Append => {
                if self.buffer.is_empty() {
                    return Ok(0);
                }
                let batch = std::mem::take(&mut self.buffer);
                match self.write(&batch, WriteMode::Append) {
                    Ok(written) => {
                        self.buffered_keys.clear();
                        self.unflushed = 0;
                        Ok(written)
                    }
                    Err(e) => {
                        self.buffer = batch;
                        Err(e)
                    }
                }
            }
            WriteMode::Overwrite => {
                let content = std::mem::take(&mut self.buffer);
                let result = self.write(&content, WriteMode::Overwrite);
                self.buffer = content;
                result.map(|_| std::mem::replace(&mut self.unflushed, 0))
            }
        }
    }

    /// Write `records` straight to the store.
    ///
    /// `Append` drops records whose key is already seen (or repeated within
    /// `records`) and adds the rest to the seen set. `Overwrite` replaces the
    /// destination and resets the seen set to exactly the written keys. The
    /// seen set only changes when the store accepted the write.
    pub fn write(&mut self, records: &[S::Record], mode: WriteMode) -> Result<usize, SinkError> {
        let mut batch_keys = HashSet::new();
        let fresh: Vec<S::Record> = records
            .iter()
            .filter(|r| {
                let key = r.key();
                let known = mode == WriteMode::Append && self.seen.contains(key);
                !known && batch_keys.insert(key.to_string())
            })
            .cloned()
            .collect();

        match mode {
            WriteMode::Append => {
                if fresh.is_empty() {
                    return Ok(0);
                }
                self.store.append(&fresh)?;
            }
            WriteMode::Overwrite => {
                self.store.overwrite(&fresh)?;
                self.seen.clear();
            }
        }

        for key in batch_keys {
            self.seen.insert(key);
        }
        tracing::debug!(path = %self.store.path().display(), written = fresh.len(), ?mode, "Flushed records");
        Ok(fresh.len())
    }
}
