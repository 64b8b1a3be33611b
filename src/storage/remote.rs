//! Remote HTTP snapshot store
//!
//! Reads a published index document plus one JSON document per snapshot.
//! Reads degrade: an unreachable endpoint yields an empty list or `None`
//! (logged), and HTTP 404 is the canonical "no such snapshot" signal.
//! Writes go through caller-supplied hooks; a store constructed without all
//! three hooks is read-only and rejects writes explicitly.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use lru::LruCache;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{
    sort_summaries_newest_first, ExportData, ImportReport, Result, SnapshotStore, SnapshotUpdate,
    StorageError,
};
use crate::snapshot::{Snapshot, SnapshotStatus, SnapshotSummary, Viewport};

/// Write hook invoked by `save_snapshot`
#[async_trait]
pub trait SaveHook: Send + Sync {
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Write hook invoked by `update_snapshot`
#[async_trait]
pub trait UpdateHook: Send + Sync {
    async fn update(&self, id: &str, update: &SnapshotUpdate) -> Result<Option<Snapshot>>;
}

/// Write hook invoked by `delete_snapshot`
#[async_trait]
pub trait DeleteHook: Send + Sync {
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Base URL assets and snapshots are served from
    pub base_url: String,
    /// URL of the index document
    pub index_url: String,
    /// URL pattern for snapshot documents; `{id}` is substituted
    pub snapshot_url_pattern: String,
    /// Capacity of the per-id snapshot cache
    pub cache_capacity: usize,
}

impl From<&crate::config::Config> for RemoteStoreConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            base_url: config.remote.base_url.clone(),
            index_url: config.remote.index_url.clone(),
            snapshot_url_pattern: config.remote.snapshot_url_pattern.clone(),
            cache_capacity: config.cache.max_snapshots,
        }
    }
}

impl RemoteStoreConfig {
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            base_url: base.to_string(),
            index_url: format!("{}/index.json", base),
            snapshot_url_pattern: format!("{}/snapshots/{{id}}.json", base),
            cache_capacity: 50,
        }
    }
}

pub struct RemoteStore {
    client: reqwest::Client,
    config: RemoteStoreConfig,
    /// Per-id snapshot cache, invalidated on every write
    snapshot_cache: RwLock<LruCache<String, Snapshot>>,
    /// Single index cache, invalidated on every write
    index_cache: RwLock<Option<Vec<SnapshotSummary>>>,
    on_save: Option<Arc<dyn SaveHook>>,
    on_update: Option<Arc<dyn UpdateHook>>,
    on_delete: Option<Arc<dyn DeleteHook>>,
}

/// Shape of the published index document
#[derive(Debug, Deserialize)]
struct IndexDocument {
    #[allow(dead_code)]
    version: Option<u32>,
    snapshots: Vec<IndexEntry>,
}

/// An index entry is either a full summary or a minimal `{id, url}` record
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexEntry {
    Full(SnapshotSummary),
    Minimal { id: String, url: Option<String> },
}

/// Promote minimal entries to summaries with placeholder status and counts
fn normalize_entry(entry: IndexEntry) -> SnapshotSummary {
    match entry {
        IndexEntry::Full(summary) => summary,
        IndexEntry::Minimal { id, url } => SnapshotSummary {
            id,
            url: url.unwrap_or_default(),
            title: String::new(),
            viewport: Viewport {
                width: 0,
                height: 0,
            },
            status: SnapshotStatus::Pending,
            tags: Vec::new(),
            text_annotation_count: 0,
            region_annotation_count: 0,
            question_count: 0,
            captured_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        },
    }
}

impl RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .unwrap_or(NonZeroUsize::new(50).expect("nonzero"));
        Self {
            client: reqwest::Client::new(),
            snapshot_cache: RwLock::new(LruCache::new(capacity)),
            index_cache: RwLock::new(None),
            on_save: None,
            on_update: None,
            on_delete: None,
            config,
        }
    }

    pub fn with_save_hook(mut self, hook: Arc<dyn SaveHook>) -> Self {
        self.on_save = Some(hook);
        self
    }

    pub fn with_update_hook(mut self, hook: Arc<dyn UpdateHook>) -> Self {
        self.on_update = Some(hook);
        self
    }

    pub fn with_delete_hook(mut self, hook: Arc<dyn DeleteHook>) -> Self {
        self.on_delete = Some(hook);
        self
    }

    /// Drop both caches; the next read goes back to the network
    pub async fn clear_caches(&self) {
        self.snapshot_cache.write().await.clear();
        *self.index_cache.write().await = None;
    }

    fn snapshot_url(&self, id: &str) -> String {
        self.config
            .snapshot_url_pattern
            .replace("{id}", &urlencoding::encode(id))
    }

    /// Fetch and normalize the index. Any failure degrades to an empty
    /// list so list views stay renderable.
    async fn fetch_index(&self) -> Vec<SnapshotSummary> {
        let response = match self.client.get(&self.config.index_url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("index fetch failed: {}", err);
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            tracing::warn!("index fetch returned {}", response.status());
            return Vec::new();
        }
        let document: IndexDocument = match response.json().await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!("index document is unreadable: {}", err);
                return Vec::new();
            }
        };

        let mut summaries: Vec<SnapshotSummary> = document
            .snapshots
            .into_iter()
            .map(normalize_entry)
            .collect();
        sort_summaries_newest_first(&mut summaries);
        summaries
    }
}

#[async_trait]
impl SnapshotStore for RemoteStore {
    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>> {
        if let Some(hit) = self.snapshot_cache.write().await.get(id) {
            return Ok(Some(hit.clone()));
        }

        let url = self.snapshot_url(id);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("snapshot fetch for {} failed: {}", id, err);
                return Ok(None);
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::warn!("snapshot fetch for {} returned {}", id, response.status());
            return Ok(None);
        }

        match response.json::<Snapshot>().await {
            Ok(snapshot) => {
                self.snapshot_cache
                    .write()
                    .await
                    .put(id.to_string(), snapshot.clone());
                Ok(Some(snapshot))
            }
            Err(err) => {
                tracing::warn!("snapshot document {} is unreadable: {}", id, err);
                Ok(None)
            }
        }
    }

    async fn get_all_summaries(&self) -> Result<Vec<SnapshotSummary>> {
        if let Some(cached) = self.index_cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let summaries = self.fetch_index().await;
        if !summaries.is_empty() {
            *self.index_cache.write().await = Some(summaries.clone());
        }
        Ok(summaries)
    }

    async fn get_all_snapshots(&self) -> Result<Vec<Snapshot>> {
        let summaries = self.get_all_summaries().await?;

        // One fetch per summary; a failed fetch omits that snapshot
        let fetches = summaries
            .iter()
            .map(|summary| self.get_snapshot(&summary.id));
        let results = join_all(fetches).await;

        Ok(results
            .into_iter()
            .filter_map(|result| result.unwrap_or_else(|err| {
                tracing::warn!("dropping snapshot from batch: {}", err);
                None
            }))
            .collect())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly {
                operation: "save_snapshot",
            });
        }
        if let Some(hook) = &self.on_save {
            hook.save(snapshot).await?;
        }
        self.clear_caches().await;
        Ok(())
    }

    async fn update_snapshot(&self, id: &str, update: SnapshotUpdate) -> Result<Option<Snapshot>> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly {
                operation: "update_snapshot",
            });
        }
        let mut updated = None;
        if let Some(hook) = &self.on_update {
            updated = hook.update(id, &update).await?;
        }
        self.clear_caches().await;
        Ok(updated)
    }

    async fn delete_snapshot(&self, id: &str) -> Result<bool> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly {
                operation: "delete_snapshot",
            });
        }
        let mut deleted = false;
        if let Some(hook) = &self.on_delete {
            deleted = hook.delete(id).await?;
        }
        self.clear_caches().await;
        Ok(deleted)
    }

    async fn export_all(&self) -> Result<ExportData> {
        Ok(ExportData::new(self.get_all_snapshots().await?))
    }

    async fn import(&self, data: ExportData) -> Result<ImportReport> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly { operation: "import" });
        }
        let mut report = ImportReport::default();
        for snapshot in &data.snapshots {
            if self.get_snapshot(&snapshot.id).await?.is_some() {
                report.skipped += 1;
            } else if let Some(hook) = &self.on_save {
                hook.save(snapshot).await?;
                report.imported += 1;
            }
        }
        self.clear_caches().await;
        Ok(report)
    }

    fn is_read_only(&self) -> bool {
        !(self.on_save.is_some() && self.on_update.is_some() && self.on_delete.is_some())
    }

    fn asset_url(&self, path: &str) -> Option<String> {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        Some(format!("{}/{}", self.config.base_url, encoded.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal canned-response HTTP server for exercising the client paths
    async fn spawn_server(
        routes: Vec<(&'static str, u16, String)>,
        hits: Arc<AtomicUsize>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();

                    let (status, body) = routes
                        .iter()
                        .find(|(route, _, _)| *route == path)
                        .map(|(_, status, body)| (*status, body.clone()))
                        .unwrap_or((404, String::new()));

                    let reason = if status == 200 { "OK" } else { "Not Found" };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn sample(id: &str) -> Snapshot {
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
        snapshot
    }

    struct CountingSaveHook(AtomicUsize);

    #[async_trait]
    impl SaveHook for CountingSaveHook {
        async fn save(&self, _snapshot: &Snapshot) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoopUpdateHook;

    #[async_trait]
    impl UpdateHook for NoopUpdateHook {
        async fn update(&self, _id: &str, _update: &SnapshotUpdate) -> Result<Option<Snapshot>> {
            Ok(None)
        }
    }

    struct NoopDeleteHook;

    #[async_trait]
    impl DeleteHook for NoopDeleteHook {
        async fn delete(&self, _id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_store_without_hooks_is_read_only() {
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url("http://localhost:1"));
        assert!(store.is_read_only());

        let err = store.save_snapshot(&sample("a")).await.unwrap_err();
        assert!(err.is_read_only());
        assert!(store
            .update_snapshot("a", SnapshotUpdate::default())
            .await
            .unwrap_err()
            .is_read_only());
        assert!(store.delete_snapshot("a").await.unwrap_err().is_read_only());
    }

    #[tokio::test]
    async fn test_partial_hooks_still_read_only() {
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url("http://localhost:1"))
            .with_save_hook(Arc::new(CountingSaveHook(AtomicUsize::new(0))));
        assert!(store.is_read_only());
    }

    #[tokio::test]
    async fn test_all_hooks_enable_writes() {
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url("http://localhost:1"))
            .with_save_hook(Arc::new(CountingSaveHook(AtomicUsize::new(0))))
            .with_update_hook(Arc::new(NoopUpdateHook))
            .with_delete_hook(Arc::new(NoopDeleteHook));

        assert!(!store.is_read_only());
        store.save_snapshot(&sample("a")).await.unwrap();
        assert!(store
            .update_snapshot("a", SnapshotUpdate::default())
            .await
            .unwrap()
            .is_none());
        assert!(store.delete_snapshot("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_snapshot_resolves_to_none() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(vec![], hits).await;
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url(&base));

        assert!(store.get_snapshot("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_snapshot_fetches_and_caches() {
        let snapshot = sample("a");
        let body = serde_json::to_string(&snapshot).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(vec![("/snapshots/a.json", 200, body)], hits.clone()).await;
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url(&base));

        let first = store.get_snapshot("a").await.unwrap().unwrap();
        assert_eq!(first.html, "<p>a</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Second read comes from the cache
        let second = store.get_snapshot("a").await.unwrap().unwrap();
        assert_eq!(second.id, "a");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        store.clear_caches().await;
        store.get_snapshot("a").await.unwrap().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_empty_list() {
        // Nothing listens on this port
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url("http://127.0.0.1:1"));

        let summaries = store.get_all_summaries().await.unwrap();
        assert!(summaries.is_empty());
        assert!(store.get_snapshot("any").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_normalization_promotes_minimal_entries() {
        let full = sample("full").summary();
        let index = serde_json::json!({
            "version": 1,
            "snapshots": [full, { "id": "bare", "url": "https://example.com/bare" }]
        });
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(vec![("/index.json", 200, index.to_string())], hits).await;
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url(&base));

        let summaries = store.get_all_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);

        let bare = summaries.iter().find(|s| s.id == "bare").unwrap();
        assert_eq!(bare.status, SnapshotStatus::Pending);
        assert_eq!(bare.text_annotation_count, 0);
        assert_eq!(bare.question_count, 0);
        assert_eq!(bare.url, "https://example.com/bare");

        // The full entry sorts first: it has a real capture timestamp
        assert_eq!(summaries[0].id, "full");
    }

    #[tokio::test]
    async fn test_get_all_snapshots_drops_unfetchable_items() {
        let a = sample("a");
        let index = serde_json::json!({
            "snapshots": [{ "id": "a" }, { "id": "gone" }]
        });
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(
            vec![
                ("/index.json", 200, index.to_string()),
                ("/snapshots/a.json", 200, serde_json::to_string(&a).unwrap()),
            ],
            hits,
        )
        .await;
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url(&base));

        let snapshots = store.get_all_snapshots().await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].id, "a");
    }

    #[test]
    fn test_config_conversion() {
        let app_config = crate::config::Config::default();
        let config = RemoteStoreConfig::from(&app_config);
        assert_eq!(config.cache_capacity, app_config.cache.max_snapshots);
        assert!(config.snapshot_url_pattern.contains("{id}"));
    }

    #[test]
    fn test_asset_url_resolves_against_base() {
        let store = RemoteStore::new(RemoteStoreConfig::for_base_url("http://host/viewer/"));
        assert_eq!(
            store.asset_url("css/app.css").unwrap(),
            "http://host/viewer/css/app.css"
        );
        assert_eq!(
            store.asset_url("a b.png").unwrap(),
            "http://host/viewer/a%20b.png"
        );
    }
}
