use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use super::cache::{CachedTrailer, TrailerCache, TrailerCacheKey};
use crate::error::AppResult;

/// Trailer cache persisted as a single JSON object on disk
///
/// The whole map is rewritten on every `put`, via a temporary file that is
/// renamed over the original so readers never see a partial file.
pub struct JsonFileCache {
    path: PathBuf,
    ttl: chrono::Duration,
    entries: RwLock<HashMap<String, CachedTrailer>>,
}

impl JsonFileCache {
    /// Loads the cache file; a missing or unreadable file starts empty
    pub async fn open(path: impl Into<PathBuf>, ttl: chrono::Duration) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<String, CachedTrailer>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Trailer cache file is corrupt, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read trailer cache file, starting empty"
                );
                HashMap::new()
            }
        };

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "Trailer file cache loaded"
        );

        Self {
            path,
            ttl,
            entries: RwLock::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops `name` only if it is still stale once the write lock is held
    async fn evict_if_expired(&self, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        let expired = entries
            .get(name)
            .is_some_and(|entry| !entry.is_fresh(self.ttl, Utc::now()));
        if expired {
            entries.remove(name);
        }
        expired
    }

    async fn persist(&self, entries: &HashMap<String, CachedTrailer>) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TrailerCache for JsonFileCache {
    async fn get(&self, key: &TrailerCacheKey) -> AppResult<Option<CachedTrailer>> {
        let name = key.to_string();
        {
            let entries = self.entries.read().await;
            match entries.get(&name) {
                None => return Ok(None),
                Some(entry) if entry.is_fresh(self.ttl, Utc::now()) => {
                    return Ok(Some(entry.clone()))
                }
                Some(_) => {}
            }
        }

        // expired: drop it so the next put rewrites a smaller file
        if self.evict_if_expired(&name).await {
            tracing::debug!(key = %name, "Trailer cache entry expired");
        }
        Ok(None)
    }

    async fn put(&self, key: &TrailerCacheKey, entry: CachedTrailer) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        self.persist(&entries).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
