//! CSV-backed output store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::{Keyed, OutputStore, SinkError};
use crate::files::write_atomic;

/// A CSV file with one header row, one record per row.
///
/// The file is opened per call and closed again, so it can be inspected
/// while a run is in progress. Rows that fail to decode are skipped with a
/// warning when loading.
#[derive(Debug, Clone)]
pub struct CsvTable<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> CsvTable<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    fn has_content(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Encode `records` in memory, so a failing record leaves the file alone.
    fn encode(&self, records: &[R], with_header: bool) -> Result<Vec<u8>, SinkError>
    where
        R: Serialize,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(with_header)
            .from_writer(Vec::new());
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| SinkError::csv(&self.path, e))?;
        }
        writer
            .into_inner()
            .map_err(|e| SinkError::io(&self.path, io::Error::new(e.error().kind(), e.to_string())))
    }

    fn create_parent(&self) -> Result<(), SinkError> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e)),
            None => Ok(()),
        }
    }
}

impl<R> OutputStore for CsvTable<R>
where
    R: Keyed + Clone + Serialize + DeserializeOwned,
{
    type Record = R;

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<R>, SinkError> {
        let mut reader = match csv::Reader::from_path(&self.path) {
            Ok(reader) => reader,
            Err(e) => {
                if let csv::ErrorKind::Io(io_err) = e.kind() {
                    if io_err.kind() == io::ErrorKind::NotFound {
                        return Ok(Vec::new());
                    }
                }
                return Err(SinkError::csv(&self.path, e));
            }
        };

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<R>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), row = index + 1, error = %e, "Skipping unreadable row");
                }
            }
        }
        Ok(records)
    }

    fn append(&self, records: &[R]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        self.create_parent()?;
        let bytes = self.encode(records, !self.has_content())?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::io(&self.path, e))?;
        file.write_all(&bytes)
            .map_err(|e| SinkError::io(&self.path, e))
    }

    fn overwrite(&self, records: &[R]) -> Result<(), SinkError> {
        let bytes = self.encode(records, true)?;
        write_atomic(&self.path, &bytes).map_err(|e| SinkError::io(&self.path, e))
    }
}
