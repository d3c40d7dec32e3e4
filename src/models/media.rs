use serde::{Deserialize, Deserializer, Serialize};

use super::{MediaFormat, MediaKind, MediaStatus};

/// A single anime or manga entry of the catalog
///
/// Records are deserialized once from the catalog file and never mutated.
/// Field aliases accept the column names of the upstream AniList export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    /// AniList identifier
    pub id: u64,
    #[serde(alias = "fetched_type")]
    pub kind: MediaKind,

    #[serde(default)]
    pub display_title: String,
    #[serde(default)]
    pub title_romaji: Option<String>,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_native: Option<String>,

    #[serde(default, deserialize_with = "list_or_csv")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub tags: Vec<String>,

    /// Average user score on a 0-100 scale
    #[serde(default)]
    pub average_score: Option<f32>,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub favourites: Option<u64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub chapters: Option<u32>,
    #[serde(default)]
    pub volumes: Option<u32>,

    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default)]
    pub format: MediaFormat,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub relations: Option<String>,

    #[serde(default, alias = "studio", deserialize_with = "list_or_csv")]
    pub studios: Vec<String>,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub studio_links: Vec<String>,

    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub start_month: Option<u32>,
    #[serde(default)]
    pub start_day: Option<u32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub end_month: Option<u32>,
    #[serde(default)]
    pub end_day: Option<u32>,

    #[serde(default, alias = "coverImage")]
    pub cover_image: Option<String>,
    #[serde(default, alias = "bannerImage")]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub trailer_thumbnail: Option<String>,
}

impl MediaRecord {
    /// Creates a record with only the identifying fields set
    pub fn new(id: u64, kind: MediaKind, display_title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            display_title: display_title.into(),
            title_romaji: None,
            title_english: None,
            title_native: None,
            genres: Vec::new(),
            tags: Vec::new(),
            average_score: None,
            popularity: None,
            favourites: None,
            episodes: None,
            chapters: None,
            volumes: None,
            status: MediaStatus::Unknown,
            format: MediaFormat::Unknown,
            source: None,
            season: None,
            description: None,
            relations: None,
            studios: Vec::new(),
            studio_links: Vec::new(),
            start_year: None,
            start_month: None,
            start_day: None,
            end_year: None,
            end_month: None,
            end_day: None,
            cover_image: None,
            banner_image: None,
            trailer_thumbnail: None,
        }
    }

    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_format(mut self, format: MediaFormat) -> Self {
        self.format = format;
        self
    }

    /// All title variants in alias order: display, romaji, English, native
    pub fn title_variants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_title.as_str())
            .chain(self.title_romaji.as_deref())
            .chain(self.title_english.as_deref())
            .chain(self.title_native.as_deref())
    }
}

/// Accepts either a JSON list of strings or a single comma separated string
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<Option<String>>),
        Csv(String),
        Null,
    }

    let items = match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items.into_iter().flatten().collect(),
        ListOrCsv::Csv(text) => text.split(',').map(str::to_string).collect(),
        ListOrCsv::Null => Vec::new(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
