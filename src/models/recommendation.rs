use serde::{Deserialize, Serialize};

use super::MediaKind;

/// Studio name paired with its AniList page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudioLink {
    pub name: String,
    pub link: Option<String>,
}

/// Display-ready recommendation row returned to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub id: u64,
    pub kind: MediaKind,
    /// Position of the record in the catalog and similarity matrix
    pub catalog_index: usize,

    pub display_title: String,
    pub formatted_title: String,
    pub title_romaji: String,
    pub title_english: String,
    pub title_native: String,

    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub studios: Vec<StudioLink>,

    /// Average score on a 0-10 scale
    pub score: f32,
    pub popularity: u64,
    pub favourites: u64,

    pub status: String,
    pub source: String,
    pub format: String,
    pub season: String,
    pub start_date: String,
    pub end_date: String,
    pub episodes_display: String,
    pub chapters_display: String,
    pub volumes_display: String,
    pub relations: String,
    pub description: String,

    pub similarity_score: f64,

    pub cover_image: String,
    pub banner_image: String,
    pub anilist_url: String,
    pub trailer_id: Option<String>,
    pub trailer_thumbnail: Option<String>,
    pub trailer_url: String,
}

/// Outcome of resolving a free-text query to a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedTitle {
    pub matched_alias: String,
    pub score: f64,
    pub id: u64,
    pub display_title: String,
}

/// Response body for the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub matched_title: String,
    pub match_score: f64,
    pub source_id: u64,
    pub results: Vec<ResultRecord>,
}
