use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod media;
pub mod recommendation;

pub use media::MediaRecord;
pub use recommendation::{
    RecommendationResponse, ResolvedTitle, ResultRecord, StudioLink,
};

/// Kind of media a catalog entry describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Anime, MediaKind::Manga];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Anime => "ANIME",
            MediaKind::Manga => "MANGA",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANIME" => Ok(MediaKind::Anime),
            "MANGA" => Ok(MediaKind::Manga),
            other => Err(format!("unknown media kind '{}'", other)),
        }
    }
}

/// Publication or airing status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Releasing,
    Finished,
    NotYetReleased,
    Cancelled,
    Hiatus,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MediaStatus {
    /// Whether new episodes or chapters are still coming out
    pub fn is_releasing(&self) -> bool {
        matches!(self, MediaStatus::Releasing)
    }

    /// Human readable label used in result rows
    pub fn label(&self) -> &'static str {
        match self {
            MediaStatus::Releasing => "Releasing",
            MediaStatus::Finished => "Finished",
            MediaStatus::NotYetReleased => "Not Yet Released",
            MediaStatus::Cancelled => "Cancelled",
            MediaStatus::Hiatus => "Hiatus",
            MediaStatus::Unknown => "N/A",
        }
    }
}

/// Release format, shared by anime (TV, MOVIE, ...) and manga (MANGA, NOVEL, ...)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    Manga,
    Novel,
    OneShot,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Tv => "TV",
            MediaFormat::TvShort => "TV_SHORT",
            MediaFormat::Movie => "MOVIE",
            MediaFormat::Special => "SPECIAL",
            MediaFormat::Ova => "OVA",
            MediaFormat::Ona => "ONA",
            MediaFormat::Music => "MUSIC",
            MediaFormat::Manga => "MANGA",
            MediaFormat::Novel => "NOVEL",
            MediaFormat::OneShot => "ONE_SHOT",
            MediaFormat::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive comparison against a user supplied format name
    pub fn matches(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name.trim())
    }
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
