//! JSON file output
//!
//! Each record lands in `<folder>/<id>.json`. The file is written under a
//! temporary name first and renamed into place, so readers never observe a
//! partially written record.

use crate::output::{OutputError, OutputResult, RecordSink};
use crate::parser::Record;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Writes records as JSON files into a folder
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    folder: PathBuf,
}

impl JsonFileSink {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Path a record with this identifier is written to
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.folder.join(format!("{}.json", id))
    }
}

impl RecordSink for JsonFileSink {
    fn persist(&self, record: &Record) -> OutputResult<()> {
        let id = &record.id;
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(OutputError::UnsafeIdentifier(id.clone()));
        }

        fs::create_dir_all(&self.folder).map_err(|source| OutputError::CreateDir {
            path: self.folder.display().to_string(),
            source,
        })?;

        let json = serde_json::to_string_pretty(record).map_err(|source| {
            OutputError::Serialize {
                id: id.clone(),
                source,
            }
        })?;

        let target = self.record_path(id);
        let staging = self.folder.join(format!(".{}.json.tmp", id));

        let mut file = fs::File::create(&staging)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &target)?;

        tracing::trace!("Wrote {}", target.display());
        Ok(())
    }
}
