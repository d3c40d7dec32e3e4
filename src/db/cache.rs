use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

use crate::error::AppResult;
use crate::models::MediaKind;

/// Identifies one trailer lookup: `{media_id}_{KIND}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrailerCacheKey {
    pub media_id: u64,
    pub kind: MediaKind,
}

impl TrailerCacheKey {
    pub fn new(media_id: u64, kind: MediaKind) -> Self {
        Self { media_id, kind }
    }
}

impl Display for TrailerCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.media_id, self.kind.as_str())
    }
}

/// A remembered trailer lookup
///
/// `trailer_id` is `None` when the lookup found nothing or failed; that
/// outcome is cached just like a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTrailer {
    pub trailer_id: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub media_type: MediaKind,
}

impl CachedTrailer {
    pub fn new(trailer_id: Option<String>, media_type: MediaKind) -> Self {
        Self {
            trailer_id,
            timestamp: Utc::now(),
            media_type,
        }
    }

    pub fn is_fresh(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < ttl
    }
}

/// RFC 3339 timestamps, or naive ISO timestamps read as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Persistent store for trailer lookups
///
/// Implementations only return entries that are still fresh; expired
/// entries behave as misses.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrailerCache: Send + Sync {
    async fn get(&self, key: &TrailerCacheKey) -> AppResult<Option<CachedTrailer>>;

    async fn put(&self, key: &TrailerCacheKey, entry: CachedTrailer) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
