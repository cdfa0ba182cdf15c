//! File-backed checkpoint storage

use super::{checkpoint_file_name, Checkpoint, CheckpointStore};
use crate::error::{ErrorCode, LongtaskError, Result};
use crate::task::ItemId;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// On-disk encoding of a checkpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Gzip-compressed JSON
    Gzip,
}

impl CheckpointFormat {
    /// Suffix appended to the base checkpoint file name
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Json => "",
            Self::Gzip => ".gz",
        }
    }

    fn encode(&self, json: Vec<u8>) -> io::Result<Vec<u8>> {
        match self {
            Self::Json => Ok(json),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&json)?;
                encoder.finish()
            }
        }
    }

    fn decode(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Json => Ok(data.to_vec()),
            Self::Gzip => {
                let mut decoder = GzDecoder::new(data);
                let mut result = Vec::new();
                decoder.read_to_end(&mut result)?;
                Ok(result)
            }
        }
    }
}

/// Stores one task's checkpoint in `<dir>/.<task>.task[.gz]`.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the checkpoint, so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: CheckpointFormat,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, task_name: &str) -> Self {
        Self::with_format(dir, task_name, CheckpointFormat::Json)
    }

    pub fn with_format(dir: impl AsRef<Path>, task_name: &str, format: CheckpointFormat) -> Self {
        let file_name = format!("{}{}", checkpoint_file_name(task_name), format.suffix());
        Self {
            path: dir.as_ref().join(file_name),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> CheckpointFormat {
        self.format
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn io_error(&self, context: &str, err: io::Error) -> LongtaskError {
        let code = match err.kind() {
            io::ErrorKind::PermissionDenied => ErrorCode::STORAGE_PERMISSION_DENIED,
            _ => ErrorCode::STORAGE_IO_ERROR,
        };
        LongtaskError::storage(code, context, &self.path).with_source(err)
    }

    fn decode<Id: ItemId>(&self, data: &[u8]) -> Result<Checkpoint<Id>> {
        let json = self.format.decode(data).map_err(|e| {
            LongtaskError::storage(
                ErrorCode::STORAGE_CORRUPTED,
                "failed to decompress checkpoint",
                &self.path,
            )
            .with_source(e)
        })?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Move an unreadable checkpoint aside so the next save does not destroy it
    fn quarantine(&self) {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupted.{}", Utc::now().timestamp()));
        let backup = PathBuf::from(backup);
        match fs::rename(&self.path, &backup) {
            Ok(()) => warn!(backup = %backup.display(), "Moved unreadable checkpoint aside"),
            Err(e) => warn!(error = %e, "Failed to move unreadable checkpoint aside"),
        }
    }
}

impl<Id: ItemId> CheckpointStore<Id> for FileStore {
    fn load(&self) -> Checkpoint<Id> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint found");
                return Checkpoint::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read checkpoint, starting from empty state");
                return Checkpoint::default();
            }
        };

        match self.decode(&data) {
            Ok(checkpoint) => {
                debug!(path = %self.path.display(), "Checkpoint loaded");
                checkpoint
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Checkpoint corrupted, starting from empty state");
                self.quarantine();
                Checkpoint::default()
            }
        }
    }

    fn save(&self, checkpoint: &Checkpoint<Id>) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(checkpoint)?;
        json.push(b'\n');
        let data = self
            .format
            .encode(json)
            .map_err(|e| self.io_error("failed to compress checkpoint", e))?;

        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| self.io_error("failed to create checkpoint directory", e))?;

        // Write to temp file
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| self.io_error("failed to create temporary checkpoint", e))?;
        temp.write_all(&data)
            .map_err(|e| self.io_error("failed to write temporary checkpoint", e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| self.io_error("failed to flush temporary checkpoint", e))?;

        // Atomic rename
        temp.persist(&self.path).map_err(|e| {
            LongtaskError::storage(
                ErrorCode::STORAGE_PERSIST_FAILED,
                "failed to move checkpoint into place",
                &self.path,
            )
            .with_source(e.error)
        })?;

        debug!(path = %self.path.display(), bytes = data.len(), "Checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ErrorClass;
    use tempfile::TempDir;

    fn sample() -> Checkpoint<String> {
        let mut cp = Checkpoint {
            processed: 3,
            items_len: Some(5),
            ..Default::default()
        };
        cp.errors
            .record_raw("b.png".to_string(), ErrorClass::Io, "Io at src/resize.rs:4:9");
        cp
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "resize");
        let cp: Checkpoint<String> = store.load();
        assert!(cp.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "Resize Images");
        store.save(&sample()).unwrap();

        assert!(dir.path().join(".resize_images.task").exists());
        let loaded: Checkpoint<String> = store.load();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_gzip_format() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_format(dir.path(), "resize", CheckpointFormat::Gzip);
        store.save(&sample()).unwrap();

        let raw = fs::read(dir.path().join(".resize.task.gz")).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let loaded: Checkpoint<String> = store.load();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_identical_state_writes_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "resize");
        store.save(&sample()).unwrap();
        let first = fs::read(store.path()).unwrap();
        store.save(&sample()).unwrap();
        let second = fs::read(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_file_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "resize");
        fs::write(store.path(), b"{ not json").unwrap();

        let cp: Checkpoint<String> = store.load();
        assert!(cp.is_empty());
        assert!(!store.path().exists());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupted."))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state").join("tasks");
        let store = FileStore::new(&nested, "resize");
        store.save(&sample()).unwrap();
        assert!(nested.join(".resize.task").exists());
    }
}
