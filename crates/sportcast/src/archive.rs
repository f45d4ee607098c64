//! Snapshot archive: optional persistence of every published update.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use sportcast_broker::TopicId;
use sportcast_sports::LifecycleState;

use crate::error::ArchiveError;

/// One published update as written to the archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedSnapshot {
    pub ts: DateTime<Utc>,
    pub topic: TopicId,
    pub lifecycle: LifecycleState,
    pub sequence: i64,
    pub payload: Value,
}

#[async_trait]
pub trait SnapshotArchive: Send + Sync {
    async fn store(&self, snapshot: &ArchivedSnapshot) -> Result<(), ArchiveError>;
}

/// Discards everything.
pub struct NoopArchive;

#[async_trait]
impl SnapshotArchive for NoopArchive {
    async fn store(&self, _snapshot: &ArchivedSnapshot) -> Result<(), ArchiveError> {
        Ok(())
    }
}

/// Appends snapshots to `{base_dir}/{sport}/{event_id}.jsonl`, one JSON object per line.
pub struct JsonlArchive {
    base_dir: PathBuf,
    // serializes appends so concurrent watchers never interleave lines
    write_lock: Mutex<()>,
}

impl JsonlArchive {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, topic: &TopicId) -> PathBuf {
        self.base_dir
            .join(file_safe(topic.sport()))
            .join(format!("{}.jsonl", file_safe(topic.event_id())))
    }
}

fn file_safe(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl SnapshotArchive for JsonlArchive {
    async fn store(&self, snapshot: &ArchivedSnapshot) -> Result<(), ArchiveError> {
        let line = serde_json::to_string(snapshot)?;
        let path = self.path_for(&snapshot.topic);

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
