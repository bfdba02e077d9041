//! Plain-text mirror of the last scrape.
//!
//! The mirror is an inspection aid, not part of the metrics contract. The
//! `/metrics` handler hands every [`Snapshot`] to a [`SnapshotSink`] and only
//! logs a failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::snapshot::Snapshot;

/// Destination for rendered snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn write(&self, snapshot: &Snapshot) -> std::io::Result<()>;
}

/// Overwrites a file with [`Snapshot::render_dump`] on every write.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    // Serializes concurrent scrapes so the file always holds one whole snapshot.
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSink for FileSink {
    async fn write(&self, snapshot: &Snapshot) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;
        tokio::fs::write(&self.path, snapshot.render_dump()).await
    }
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl SnapshotSink for NullSink {
    async fn write(&self, _snapshot: &Snapshot) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotEntry;

    fn snapshot(value: f64, timestamp_ms: i64) -> Snapshot {
        Snapshot {
            timestamp_ms,
            entries: vec![SnapshotEntry {
                name: "Bedroom".to_string(),
                value,
            }],
        }
    }

    #[tokio::test]
    async fn test_file_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("radon.txt"));

        sink.write(&snapshot(1.5, 10)).await.unwrap();
        sink.write(&snapshot(2.25, 20)).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "Bedroom=2.25 20\n");
    }

    #[tokio::test]
    async fn test_file_sink_empty_snapshot_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("radon.txt"));

        sink.write(&snapshot(1.5, 10)).await.unwrap();
        sink.write(&Snapshot {
            timestamp_ms: 30,
            entries: Vec::new(),
        })
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(sink.path()).unwrap(), "");
    }

    #[tokio::test]
    async fn test_file_sink_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("missing").join("radon.txt"));
        assert!(sink.write(&snapshot(1.0, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_null_sink() {
        assert!(NullSink.write(&snapshot(1.0, 1)).await.is_ok());
    }
}
