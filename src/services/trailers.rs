use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::{CachedTrailer, TrailerCache, TrailerCacheKey},
    models::MediaKind,
    services::providers::TrailerProvider,
};

/// Cached, time-boxed trailer lookups
///
/// Every lookup outcome is written back to the cache, including "no trailer"
/// and upstream failures, so a title is asked about at most once per cache
/// lifetime. Failures never propagate; they degrade to `None`.
#[derive(Clone)]
pub struct TrailerService {
    provider: Arc<dyn TrailerProvider>,
    cache: Arc<dyn TrailerCache>,
    timeout: Duration,
}

impl TrailerService {
    pub fn new(
        provider: Arc<dyn TrailerProvider>,
        cache: Arc<dyn TrailerCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            timeout,
        }
    }

    /// Trailer id for one title, consulting the cache first
    pub async fn trailer_for(&self, media_id: u64, kind: MediaKind) -> Option<String> {
        let key = TrailerCacheKey::new(media_id, kind);

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                tracing::debug!(key = %key, "Trailer cache hit");
                return entry.trailer_id;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Trailer cache read failed");
            }
        }

        let trailer_id =
            match tokio::time::timeout(self.timeout, self.provider.fetch_trailer_id(media_id, kind))
                .await
            {
                Ok(Ok(trailer_id)) => trailer_id,
                Ok(Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "Trailer lookup failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        key = %key,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Trailer lookup timed out"
                    );
                    None
                }
            };

        if let Err(e) = self
            .cache
            .put(&key, CachedTrailer::new(trailer_id.clone(), kind))
            .await
        {
            tracing::warn!(key = %key, error = %e, "Trailer cache write failed");
        }

        trailer_id
    }

    /// Looks up several titles concurrently; output order matches `items`
    pub async fn trailers_for(&self, items: &[(u64, MediaKind)]) -> Vec<Option<String>> {
        let tasks: Vec<_> = items
            .iter()
            .map(|&(media_id, kind)| {
                let service = self.clone();
                tokio::spawn(async move { service.trailer_for(media_id, kind).await })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(trailer_id) => results.push(trailer_id),
                Err(e) => {
                    tracing::error!(error = %e, "Trailer task join error");
                    results.push(None);
                }
            }
        }
        results
    }
}
