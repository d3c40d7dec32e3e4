//! Trailer metadata sources
//!
//! Providers only answer "which YouTube video is the trailer for this
//! title"; caching, timeouts and fan-out live in `services::trailers`.
use crate::{error::AppResult, models::MediaKind};

pub mod anilist;

pub use anilist::AniListProvider;

/// Looks up trailer ids for catalog items
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrailerProvider: Send + Sync {
    /// YouTube video id of the title's trailer
    ///
    /// `Ok(None)` means the upstream has no YouTube trailer for the title.
    async fn fetch_trailer_id(&self, media_id: u64, kind: MediaKind) -> AppResult<Option<String>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
