//! SQLite key-value snapshot store
//!
//! Mirrors the extension-storage convention the persisted data originally
//! lived under: one index key holding the ordered list of snapshot ids, and
//! one record key per snapshot. The index and the record are written
//! separately with no transaction spanning the pair, so reads reconcile:
//! an indexed id whose record is missing is treated as not found.

use sqlx::SqlitePool;

use super::{
    sort_snapshots_newest_first, sort_summaries_newest_first, ExportData, ImportReport, Result,
    SnapshotStore, SnapshotUpdate,
};
use crate::snapshot::{Snapshot, SnapshotSummary};

use async_trait::async_trait;

/// Key of the snapshot id index
const INDEX_KEY: &str = "snapshot_index";

/// Key prefix of per-snapshot records
const RECORD_KEY_PREFIX: &str = "snapshot:";

pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Wrap an existing pool and ensure the key-value table exists
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Connect to a SQLite database URL and initialize the store
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::new(pool).await
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn record_key(id: &str) -> String {
        format!("{}{}", RECORD_KEY_PREFIX, id)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read the id index. An absent or unparseable index degrades to empty
    /// so list views stay renderable.
    async fn read_index(&self) -> Result<Vec<String>> {
        let Some(raw) = self.get_value(INDEX_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(ids) => Ok(ids),
            Err(err) => {
                tracing::warn!("snapshot index is unreadable, treating as empty: {}", err);
                Ok(Vec::new())
            }
        }
    }

    async fn write_index(&self, ids: &[String]) -> Result<()> {
        self.put_value(INDEX_KEY, &serde_json::to_string(ids)?).await
    }

    /// Read one record, reconciling: a parse failure is logged and treated
    /// as absent rather than failing the caller.
    async fn read_record(&self, id: &str) -> Result<Option<Snapshot>> {
        let Some(raw) = self.get_value(&Self::record_key(id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                tracing::warn!("snapshot record {} is unreadable, skipping: {}", id, err);
                Ok(None)
            }
        }
    }

    async fn write_record(&self, snapshot: &Snapshot) -> Result<()> {
        self.put_value(
            &Self::record_key(&snapshot.id),
            &serde_json::to_string(snapshot)?,
        )
        .await
    }

    /// All resolvable snapshots in index order; indexed ids without a
    /// record are dropped
    async fn read_all(&self) -> Result<Vec<Snapshot>> {
        let ids = self.read_index().await?;
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(snapshot) = self.read_record(id).await? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotStore for LocalStore {
    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>> {
        self.read_record(id).await
    }

    async fn get_all_summaries(&self) -> Result<Vec<SnapshotSummary>> {
        let mut summaries: Vec<SnapshotSummary> = self
            .read_all()
            .await?
            .iter()
            .map(Snapshot::summary)
            .collect();
        sort_summaries_newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn get_all_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = self.read_all().await?;
        sort_snapshots_newest_first(&mut snapshots);
        Ok(snapshots)
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        // Record first, index second; two independent writes by design
        self.write_record(snapshot).await?;
        let mut ids = self.read_index().await?;
        if !ids.contains(&snapshot.id) {
            ids.push(snapshot.id.clone());
            self.write_index(&ids).await?;
        }
        Ok(())
    }

    async fn update_snapshot(&self, id: &str, update: SnapshotUpdate) -> Result<Option<Snapshot>> {
        let Some(mut snapshot) = self.read_record(id).await? else {
            return Ok(None);
        };
        update.apply(&mut snapshot);
        self.write_record(&snapshot).await?;
        Ok(Some(snapshot))
    }

    async fn delete_snapshot(&self, id: &str) -> Result<bool> {
        let mut ids = self.read_index().await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() != before {
            self.write_index(&ids).await?;
        }
        let removed = self.delete_value(&Self::record_key(id)).await?;
        Ok(removed || ids.len() != before)
    }

    async fn export_all(&self) -> Result<ExportData> {
        Ok(ExportData::new(self.get_all_snapshots().await?))
    }

    async fn import(&self, data: ExportData) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        for snapshot in &data.snapshots {
            if self.read_record(&snapshot.id).await?.is_some() {
                report.skipped += 1;
            } else {
                self.save_snapshot(snapshot).await?;
                report.imported += 1;
            }
        }
        Ok(report)
    }
}
