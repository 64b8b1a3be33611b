//! In-memory snapshot store
//!
//! The test double of the provider set. State lives behind a
//! `tokio::sync::RwLock`; instances constructed separately share nothing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    sort_snapshots_newest_first, sort_summaries_newest_first, ExportData, ImportReport, Result,
    SnapshotStore, SnapshotUpdate,
};
use crate::snapshot::{Snapshot, SnapshotSummary};

#[derive(Default, Clone)]
pub struct InMemoryStore {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything; used between tests
    pub async fn reset(&self) {
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(id).cloned())
    }

    async fn get_all_summaries(&self) -> Result<Vec<SnapshotSummary>> {
        let mut summaries: Vec<SnapshotSummary> = self
            .snapshots
            .read()
            .await
            .values()
            .map(Snapshot::summary)
            .collect();
        sort_summaries_newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn get_all_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots: Vec<Snapshot> = self.snapshots.read().await.values().cloned().collect();
        sort_snapshots_newest_first(&mut snapshots);
        Ok(snapshots)
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn update_snapshot(&self, id: &str, update: SnapshotUpdate) -> Result<Option<Snapshot>> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get_mut(id) {
            Some(snapshot) => {
                update.apply(snapshot);
                Ok(Some(snapshot.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_snapshot(&self, id: &str) -> Result<bool> {
        Ok(self.snapshots.write().await.remove(id).is_some())
    }

    async fn export_all(&self) -> Result<ExportData> {
        Ok(ExportData::new(self.get_all_snapshots().await?))
    }

    async fn import(&self, data: ExportData) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut snapshots = self.snapshots.write().await;
        for snapshot in data.snapshots {
            if snapshots.contains_key(&snapshot.id) {
                report.skipped += 1;
            } else {
                snapshots.insert(snapshot.id.clone(), snapshot);
                report.imported += 1;
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{SnapshotStatus, Viewport};
    use chrono::{DateTime, Utc};

    fn snapshot_captured_at(id: &str, when: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(
            "https://example.com",
            id,
            format!("<p>{}</p>", id),
            Viewport {
                width: 1280,
                height: 800,
            },
        );
        snapshot.id = id.to_string();
        snapshot.captured_at = DateTime::parse_from_rfc3339(&format!("{}T00:00:00Z", when))
            .unwrap()
            .with_timezone(&Utc);
        snapshot
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryStore::new();
        assert!(store.get_snapshot("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_get_delete() {
        let store = InMemoryStore::new();
        let snapshot = snapshot_captured_at("a", "2024-01-01");

        store.save_snapshot(&snapshot).await.unwrap();
        assert!(store.get_snapshot("a").await.unwrap().is_some());

        assert!(store.delete_snapshot("a").await.unwrap());
        assert!(store.get_snapshot("a").await.unwrap().is_none());
        assert!(!store.delete_snapshot("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_summaries_ordered_newest_first() {
        let store = InMemoryStore::new();
        for (id, when) in [
            ("jan", "2024-01-01"),
            ("mar", "2024-03-01"),
            ("feb", "2024-02-01"),
        ] {
            store
                .save_snapshot(&snapshot_captured_at(id, when))
                .await
                .unwrap();
        }

        let summaries = store.get_all_summaries().await.unwrap();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["mar", "feb", "jan"]);
    }

    #[tokio::test]
    async fn test_update_bumps_timestamp() {
        let store = InMemoryStore::new();
        let snapshot = snapshot_captured_at("a", "2024-01-01");
        store.save_snapshot(&snapshot).await.unwrap();

        let updated = store
            .update_snapshot("a", SnapshotUpdate::status(SnapshotStatus::Reviewed))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, SnapshotStatus::Reviewed);
        assert!(updated.updated_at > snapshot.updated_at);
        assert_eq!(updated.captured_at, snapshot.captured_at);

        assert!(store
            .update_snapshot("nope", SnapshotUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let store = InMemoryStore::new();
        let export = ExportData::new(vec![snapshot_captured_at("x", "2024-01-01")]);

        let first = store.import(export.clone()).await.unwrap();
        assert_eq!(
            first,
            ImportReport {
                imported: 1,
                skipped: 0
            }
        );

        let second = store.import(export).await.unwrap();
        assert_eq!(
            second,
            ImportReport {
                imported: 0,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_not_read_only_and_no_assets() {
        let store = InMemoryStore::new();
        assert!(!store.is_read_only());
        assert!(store.asset_url("logo.png").is_none());
    }
}
