use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

use super::catalog::{Catalog, CatalogSubset};
use super::fuzzy;
use crate::error::RecommendError;

/// Shorthand queries substituted before fuzzy matching
#[derive(Debug, Clone, PartialEq)]
pub struct ManualAliases {
    table: HashMap<String, String>,
}

impl Default for ManualAliases {
    fn default() -> Self {
        let table = [
            ("aot", "attack on titan"),
            ("jjk", "jujutsu kaisen"),
            ("opm", "one punch man"),
            ("hxh", "hunter x hunter"),
            ("nrt", "naruto"),
        ]
        .into_iter()
        .map(|(short, full)| (short.to_string(), full.to_string()))
        .collect();
        Self { table }
    }
}

impl ManualAliases {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Adds or replaces a shorthand; both sides are normalized
    pub fn with_alias(mut self, short: &str, full: &str) -> Self {
        self.table
            .insert(normalize_query(short), normalize_query(full));
        self
    }

    /// Default table extended with a JSON object of `{"short": "full title"}` pairs
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read aliases at {}", path.display()))?;
        let extra: HashMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse aliases at {}", path.display()))?;
        Ok(extra
            .iter()
            .fold(Self::default(), |aliases, (short, full)| {
                aliases.with_alias(short, full)
            }))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Exact-match substitution of an already normalized query
    pub fn substitute(&self, normalized: &str) -> String {
        self.table
            .get(normalized)
            .cloned()
            .unwrap_or_else(|| normalized.to_string())
    }
}

/// Trims and lower-cases a query or alias
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Normalized alias -> catalog index for one catalog subset
///
/// Entries iterate in first-insertion order of each distinct alias; when two
/// records share an alias the later record wins.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entries: Vec<(String, usize)>,
    positions: HashMap<String, usize>,
}

impl AliasIndex {
    pub fn build(catalog: &Catalog, subset: &CatalogSubset) -> Self {
        let mut index = Self::default();
        for record_index in subset.indices() {
            for alias in catalog.aliases(record_index) {
                index.insert(alias, record_index);
            }
        }
        index
    }

    fn insert(&mut self, alias: &str, record_index: usize) {
        match self.positions.get(alias) {
            Some(&pos) => self.entries[pos].1 = record_index,
            None => {
                self.positions.insert(alias.to_string(), self.entries.len());
                self.entries.push((alias.to_string(), record_index));
            }
        }
    }

    pub fn get(&self, alias: &str) -> Option<usize> {
        self.positions.get(alias).map(|&pos| self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(alias, idx)| (alias.as_str(), *idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Best alias found for a query
#[derive(Debug, Clone, PartialEq)]
pub struct TitleMatch {
    pub alias: String,
    /// Fuzzy score on a 0-100 scale
    pub score: f64,
    pub index: usize,
}

/// Resolves free-text queries to catalog indices
#[derive(Debug, Clone)]
pub struct TitleResolver {
    manual_aliases: ManualAliases,
    threshold: f64,
}

impl TitleResolver {
    pub fn new(manual_aliases: ManualAliases, threshold: f64) -> Self {
        Self {
            manual_aliases,
            threshold,
        }
    }

    /// Normalized query after manual alias substitution
    pub fn prepare_query(&self, query: &str) -> String {
        self.manual_aliases.substitute(&normalize_query(query))
    }

    /// Finds the single best-scoring alias for `query`
    ///
    /// Ties keep the first alias encountered. Scores below the threshold
    /// (or an empty index) yield `NoTitleMatch`.
    pub fn resolve(&self, query: &str, index: &AliasIndex) -> Result<TitleMatch, RecommendError> {
        let prepared = self.prepare_query(query);

        let mut best: Option<TitleMatch> = None;
        for (alias, record_index) in index.iter() {
            let score = fuzzy::weighted_ratio(&prepared, alias);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(TitleMatch {
                    alias: alias.to_string(),
                    score,
                    index: record_index,
                });
            }
        }

        match best {
            Some(found) if found.score >= self.threshold => {
                tracing::debug!(
                    query = %query,
                    alias = %found.alias,
                    score = found.score,
                    "Resolved title"
                );
                Ok(found)
            }
            other => {
                tracing::info!(
                    query = %query,
                    best_score = other.map(|b| b.score).unwrap_or(0.0),
                    "No title above match threshold"
                );
                Err(RecommendError::NoTitleMatch {
                    query: query.to_string(),
                })
            }
        }
    }
}
