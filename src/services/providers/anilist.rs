/// AniList GraphQL provider
///
/// Issues a single `Media(id, type) { trailer { id site } }` query per title
/// and only accepts trailers hosted on YouTube.
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::MediaKind,
    services::providers::TrailerProvider,
};

const TRAILER_QUERY: &str = r#"
query ($id: Int, $type: MediaType) {
    Media (id: $id, type: $type) {
        trailer {
            id
            site
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<MediaData>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<MediaTrailer>,
}

#[derive(Debug, Deserialize)]
struct MediaTrailer {
    trailer: Option<Trailer>,
}

#[derive(Debug, Deserialize)]
struct Trailer {
    id: Option<String>,
    site: Option<String>,
}

impl GraphQlResponse {
    fn youtube_trailer_id(self) -> Option<String> {
        let trailer = self.data?.media?.trailer?;
        if trailer.site.as_deref() != Some("youtube") {
            return None;
        }
        trailer.id.filter(|id| !id.is_empty())
    }
}

#[derive(Clone)]
pub struct AniListProvider {
    http_client: HttpClient,
    api_url: String,
}

impl AniListProvider {
    /// Creates a provider whose requests give up after `timeout`
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl TrailerProvider for AniListProvider {
    async fn fetch_trailer_id(&self, media_id: u64, kind: MediaKind) -> AppResult<Option<String>> {
        let body = json!({
            "query": TRAILER_QUERY,
            "variables": { "id": media_id, "type": kind.as_str() },
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "AniList returned status {}: {}",
                status, body
            )));
        }

        let parsed: GraphQlResponse = response.json().await?;
        let trailer_id = parsed.youtube_trailer_id();

        tracing::debug!(
            media_id,
            kind = %kind,
            found = trailer_id.is_some(),
            provider = "anilist",
            "Trailer lookup completed"
        );

        Ok(trailer_id)
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}
