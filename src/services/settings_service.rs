use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use sqlx::Row;
use tokio::sync::RwLock;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// Immutable view of the site settings at a point in time. Handlers receive
/// the snapshot explicitly; nothing reads settings through global mutable
/// state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SettingsSnapshot {
    pub values: Map<String, Value>,
}

struct CachedSnapshot {
    snapshot: Arc<SettingsSnapshot>,
    loaded_at: Instant,
}

/// Site-settings reader with a bounded-TTL snapshot cache. Writes go
/// straight to the database and invalidate the cache, so a stale snapshot
/// can outlive a write by at most `settings_cache_seconds`.
pub struct SettingsService {
    cache: Arc<RwLock<Option<CachedSnapshot>>>,
}

impl SettingsService {
    pub fn instance() -> &'static SettingsService {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<SettingsService> = OnceLock::new();
        INSTANCE.get_or_init(|| SettingsService {
            cache: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn snapshot(&self) -> Result<Arc<SettingsSnapshot>, ApiError> {
        let ttl = Duration::from_secs(config::config().security.settings_cache_seconds);

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.loaded_at.elapsed() < ttl {
                    return Ok(cached.snapshot.clone());
                }
            }
        }

        let snapshot = Arc::new(self.load().await?);

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedSnapshot {
                snapshot: snapshot.clone(),
                loaded_at: Instant::now(),
            });
        }

        Ok(snapshot)
    }

    /// Upsert the given keys and drop the cached snapshot immediately.
    pub async fn upsert(&self, entries: Map<String, Value>) -> Result<(), ApiError> {
        let pool = DatabaseManager::main_pool().await?;

        for (key, value) in &entries {
            sqlx::query(
                "INSERT INTO site_settings (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = now()",
            )
            .bind(key)
            .bind(value)
            .execute(&pool)
            .await?;
        }

        self.invalidate().await;
        Ok(())
    }

    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    async fn load(&self) -> Result<SettingsSnapshot, ApiError> {
        let pool = DatabaseManager::main_pool().await?;
        let rows = sqlx::query("SELECT key, value FROM site_settings")
            .fetch_all(&pool)
            .await?;

        let mut values = Map::new();
        for row in rows {
            values.insert(row.get("key"), row.get("value"));
        }

        Ok(SettingsSnapshot { values })
    }
}
