use anyhow::Context;
use std::path::Path;

use crate::models::{MediaKind, MediaRecord};

/// Immutable table of media records
///
/// Record positions are the row/column indices of the similarity matrix and
/// are never renumbered; filtering produces a [`CatalogSubset`] mask instead
/// of a compacted copy.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<MediaRecord>,
    /// Normalized title variants per record, in display/romaji/English/native order
    aliases: Vec<Vec<String>>,
}

impl Catalog {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        let aliases = records.iter().map(normalized_aliases).collect();
        Self { records, aliases }
    }

    /// Reads a whole JSON array of records from disk
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog at {}", path.display()))?;
        let records: Vec<MediaRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog at {}", path.display()))?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    pub fn aliases(&self, index: usize) -> &[String] {
        self.aliases.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Marks every record accepted by `filter`, keeping original indices
    pub fn subset(&self, filter: &CatalogFilter) -> CatalogSubset {
        let mask: Vec<bool> = self.records.iter().map(|r| filter.matches(r)).collect();
        CatalogSubset::from_mask(mask)
    }
}

/// Lower-cased, trimmed, non-empty title variants of a record
pub fn normalized_aliases(record: &MediaRecord) -> Vec<String> {
    record
        .title_variants()
        .map(|title| title.trim().to_lowercase())
        .filter(|alias| !alias.is_empty())
        .collect()
}

/// Media kind plus optional sub-format restriction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFilter {
    pub kind: MediaKind,
    pub sub_format: Option<String>,
}

impl CatalogFilter {
    /// Builds a filter; the sub-format only narrows manga and `ALL` disables it
    pub fn new(kind: MediaKind, sub_format: Option<&str>) -> Self {
        let sub_format = sub_format
            .map(str::trim)
            .filter(|f| kind == MediaKind::Manga && !f.is_empty() && !f.eq_ignore_ascii_case("ALL"))
            .map(str::to_uppercase);
        Self { kind, sub_format }
    }

    pub fn matches(&self, record: &MediaRecord) -> bool {
        record.kind == self.kind
            && self
                .sub_format
                .as_deref()
                .map_or(true, |format| record.format.matches(format))
    }

    /// Human readable form used in `NoCatalogMatch` errors
    pub fn describe(&self) -> String {
        match &self.sub_format {
            Some(format) => format!("{}/{}", self.kind, format),
            None => self.kind.to_string(),
        }
    }
}

/// Bitmap of the catalog indices active for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSubset {
    mask: Vec<bool>,
    count: usize,
}

impl CatalogSubset {
    pub fn from_mask(mask: Vec<bool>) -> Self {
        let count = mask.iter().filter(|&&active| active).count();
        Self { mask, count }
    }

    /// Subset containing every index below `len`
    pub fn full(len: usize) -> Self {
        Self::from_mask(vec![true; len])
    }

    pub fn contains(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Active original indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(index, &active)| active.then_some(index))
    }
}
