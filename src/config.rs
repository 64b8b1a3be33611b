//! Configuration management for the Refine Page core

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite URL for the local key-value backend
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Remote,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL snapshots and assets are served from
    pub base_url: String,
    /// URL of the index document
    pub index_url: String,
    /// URL pattern for individual snapshot documents; `{id}` is substituted
    pub snapshot_url_pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of full snapshots held by the remote provider's cache
    pub max_snapshots: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                backend: StorageBackend::Local,
                database_url: "sqlite:./refine.db".to_string(),
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8080".to_string(),
                index_url: "http://localhost:8080/index.json".to_string(),
                snapshot_url_pattern: "http://localhost:8080/snapshots/{id}.json".to_string(),
            },
            cache: CacheConfig { max_snapshots: 50 },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let base_url =
            env::var("REFINE_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        Config {
            storage: StorageConfig {
                backend: match env::var("REFINE_STORAGE")
                    .unwrap_or_else(|_| "local".to_string())
                    .as_str()
                {
                    "remote" => StorageBackend::Remote,
                    "memory" => StorageBackend::Memory,
                    _ => StorageBackend::Local,
                },
                database_url: env::var("REFINE_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./refine.db".to_string()),
            },
            remote: RemoteConfig {
                index_url: env::var("REFINE_INDEX_URL")
                    .unwrap_or_else(|_| format!("{}/index.json", base_url)),
                snapshot_url_pattern: env::var("REFINE_SNAPSHOT_URL_PATTERN")
                    .unwrap_or_else(|_| format!("{}/snapshots/{{id}}.json", base_url)),
                base_url,
            },
            cache: CacheConfig {
                max_snapshots: env::var("REFINE_CACHE_MAX_SNAPSHOTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
            },
        }
    }
}
