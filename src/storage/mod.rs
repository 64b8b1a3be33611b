//! Storage provider abstraction
//!
//! `SnapshotStore` decouples the rest of the system from a specific backing
//! store. Three backends are provided: a SQLite key-value store, a remote
//! HTTP index+blob store, and an in-memory store for tests.

mod error;
mod local;
mod memory;
mod remote;

pub use error::{Result, StorageError};
pub use local::LocalStore;
pub use memory::InMemoryStore;
pub use remote::{DeleteHook, RemoteStore, RemoteStoreConfig, SaveHook, UpdateHook};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::{AnnotationSet, Question, Snapshot, SnapshotStatus, SnapshotSummary};

/// Current version of the bulk export format
pub const EXPORT_VERSION: u32 = 1;

/// Abstract persistence interface for snapshots.
///
/// Read contracts shared by every backend: a missing id resolves to
/// `Ok(None)`, list results are ordered newest-`captured_at`-first, and
/// per-item failures inside `get_all_snapshots` drop the item rather than
/// failing the batch.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Fetch one snapshot; `Ok(None)` when the id does not resolve
    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>>;

    /// Lightweight records without the `html` payload, newest first
    async fn get_all_summaries(&self) -> Result<Vec<SnapshotSummary>>;

    /// Full records, newest first; individual fetch failures are dropped
    async fn get_all_snapshots(&self) -> Result<Vec<Snapshot>>;

    /// Persist a new snapshot
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Apply an update; `Ok(None)` when the id does not exist
    async fn update_snapshot(&self, id: &str, update: SnapshotUpdate) -> Result<Option<Snapshot>>;

    /// Remove a snapshot; returns whether anything was deleted
    async fn delete_snapshot(&self, id: &str) -> Result<bool>;

    /// Bulk export of everything in the store
    async fn export_all(&self) -> Result<ExportData>;

    /// Bulk import. Idempotent: an already-present id is counted as skipped
    /// and its stored record is left untouched.
    async fn import(&self, data: ExportData) -> Result<ImportReport>;

    /// Whether write operations are available on this provider
    fn is_read_only(&self) -> bool {
        false
    }

    /// Resolve a static-asset reference relative to the provider's serving
    /// context; `None` when the provider serves no assets
    fn asset_url(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Partial update applied through `update_snapshot`. Only the populated
/// fields change; every application bumps `updated_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<AnnotationSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SnapshotStatus>,
}

impl SnapshotUpdate {
    pub fn annotations(annotations: AnnotationSet) -> Self {
        Self {
            annotations: Some(annotations),
            ..Default::default()
        }
    }

    pub fn status(status: SnapshotStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Default::default()
        }
    }

    /// Apply this update to a snapshot in place
    pub fn apply(&self, snapshot: &mut Snapshot) {
        if let Some(title) = &self.title {
            snapshot.title = title.clone();
        }
        if let Some(annotations) = &self.annotations {
            snapshot.annotations = annotations.clone();
        }
        if let Some(questions) = &self.questions {
            snapshot.questions = questions.clone();
        }
        if let Some(tags) = &self.tags {
            snapshot.tags = tags.clone();
        }
        if let Some(status) = self.status {
            snapshot.status = status;
        }
        snapshot.touch();
    }
}

/// Bulk interchange payload produced by `export_all` / consumed by `import`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub snapshots: Vec<Snapshot>,
}

impl ExportData {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            snapshots,
        }
    }
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Shared list ordering: newest `captured_at` first
pub(crate) fn sort_summaries_newest_first(summaries: &mut [SnapshotSummary]) {
    summaries.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
}

pub(crate) fn sort_snapshots_newest_first(snapshots: &mut [Snapshot]) {
    snapshots.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
}
