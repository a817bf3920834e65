//! Snapshot format and the stores that hold it.
//!
//! A [`Snapshot`] is a plain copy of the four stage collections. Stores only
//! ever see serialized copies; the board keeps the live records.

use crate::error::StoreError;
use crate::task::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, alias = "plannedTasks")]
    pub planned: Vec<Task>,
    #[serde(default, alias = "inProgressTasks")]
    pub in_progress: Vec<Task>,
    #[serde(default, alias = "testingTasks")]
    pub testing: Vec<Task>,
    #[serde(default, alias = "doneTasks")]
    pub done: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<TaskId>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Id to hand out next: the recorded counter, never below `max(id) + 1`.
    pub fn resolve_next_id(&self) -> TaskId {
        let max = [&self.planned, &self.in_progress, &self.testing, &self.done]
            .into_iter()
            .flatten()
            .map(|t| t.id)
            .max()
            .unwrap_or(0);
        self.next_id.unwrap_or(0).max(max + 1)
    }
}

/// Where board state lives between runs.
pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replaces whatever was stored before.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Snapshot kept as one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let snapshot = Snapshot::from_json(&data)?;
        debug!(path = %self.path.display(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = snapshot.to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), "saved snapshot");
        Ok(())
    }
}

/// In-process store holding the serialized blob.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            ..Self::default()
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Makes every following save fail, leaving the last good blob in place.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        self.blob.as_deref().map(Snapshot::from_json).transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.blob = Some(snapshot.to_json()?);
        self.saves += 1;
        Ok(())
    }
}
