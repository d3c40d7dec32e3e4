use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// JSON file holding the media catalog
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Precomputed similarity matrix (`.json` rows or binary f32)
    #[serde(default = "default_similarity_path")]
    pub similarity_path: PathBuf,

    /// Optional JSON object of extra shorthand aliases
    #[serde(default)]
    pub aliases_path: Option<PathBuf>,

    /// JSON file backing the trailer cache when Redis is not configured
    #[serde(default = "default_trailer_cache_path")]
    pub trailer_cache_path: PathBuf,

    /// Redis connection URL; selects the Redis trailer cache when set
    #[serde(default)]
    pub redis_url: Option<String>,

    /// AniList GraphQL endpoint
    #[serde(default = "default_anilist_api_url")]
    pub anilist_api_url: String,

    /// Timeout for a single trailer lookup
    #[serde(default = "default_trailer_timeout_secs")]
    pub trailer_timeout_secs: u64,

    /// Trailer cache entry lifetime
    #[serde(default = "default_trailer_cache_ttl_days")]
    pub trailer_cache_ttl_days: i64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip)]
    pub policy: RecommenderPolicy,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.json")
}

fn default_similarity_path() -> PathBuf {
    PathBuf::from("data/similarity.bin")
}

fn default_trailer_cache_path() -> PathBuf {
    PathBuf::from("trailer_cache.json")
}

fn default_anilist_api_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_trailer_timeout_secs() -> u64 {
    5
}

fn default_trailer_cache_ttl_days() -> i64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Policy values are read from `POLICY_`-prefixed variables, e.g.
    /// `POLICY_HEAD_SIZE=6`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.policy = envy::prefixed("POLICY_")
            .from_env::<RecommenderPolicy>()
            .map_err(|e| anyhow::anyhow!("Failed to load recommender policy: {}", e))?;
        config.policy.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Tunable constants of the re-ranking policy
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RecommenderPolicy {
    /// Weight of the raw genre overlap count
    #[serde(default = "default_genre_weight")]
    pub genre_weight: f64,

    /// Weight of the raw tag overlap count
    #[serde(default = "default_tag_weight")]
    pub tag_weight: f64,

    /// Weight of the precomputed embedding similarity
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,

    /// Genre-matched candidates guaranteed a place at the top
    #[serde(default = "default_head_size")]
    pub head_size: usize,

    /// Extra candidates pulled past `top_n` for re-ranking
    #[serde(default = "default_overshoot")]
    pub overshoot: usize,

    /// Minimum fuzzy score (0-100) for a title to count as found
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    #[serde(default = "default_min_top_n")]
    pub min_top_n: usize,

    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

fn default_genre_weight() -> f64 {
    0.4
}

fn default_tag_weight() -> f64 {
    0.2
}

fn default_similarity_weight() -> f64 {
    0.4
}

fn default_head_size() -> usize {
    4
}

fn default_overshoot() -> usize {
    20
}

fn default_match_threshold() -> f64 {
    60.0
}

fn default_min_top_n() -> usize {
    5
}

fn default_max_top_n() -> usize {
    30
}

fn default_top_n() -> usize {
    15
}

impl Default for RecommenderPolicy {
    fn default() -> Self {
        Self {
            genre_weight: default_genre_weight(),
            tag_weight: default_tag_weight(),
            similarity_weight: default_similarity_weight(),
            head_size: default_head_size(),
            overshoot: default_overshoot(),
            match_threshold: default_match_threshold(),
            min_top_n: default_min_top_n(),
            max_top_n: default_max_top_n(),
            default_top_n: default_top_n(),
        }
    }
}

impl RecommenderPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_top_n == 0 || self.min_top_n > self.max_top_n {
            anyhow::bail!(
                "Invalid top_n bounds: min {} max {}",
                self.min_top_n,
                self.max_top_n
            );
        }
        if !(self.min_top_n..=self.max_top_n).contains(&self.default_top_n) {
            anyhow::bail!(
                "Default top_n {} outside [{}, {}]",
                self.default_top_n,
                self.min_top_n,
                self.max_top_n
            );
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            anyhow::bail!("Match threshold {} outside [0, 100]", self.match_threshold);
        }
        Ok(())
    }
}
