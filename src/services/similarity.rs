use anyhow::Context;
use std::cmp::Ordering;
use std::path::Path;

use super::catalog::CatalogSubset;

pub const MATRIX_FORMAT_VERSION: u32 = 1;
pub const MATRIX_HEADER_SIZE: usize = 8;
const BYTES_PER_F32: usize = 4;

/// Dense N x N matrix of precomputed pairwise similarities, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    dim: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn new(dim: usize, values: Vec<f32>) -> anyhow::Result<Self> {
        let Some(cells) = dim.checked_mul(dim) else {
            anyhow::bail!("Similarity matrix dimension {} is too large", dim);
        };
        if values.len() != cells {
            anyhow::bail!(
                "Similarity matrix of dimension {} needs {} values, got {}",
                dim,
                cells,
                values.len()
            );
        }
        Ok(Self { dim, values })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> anyhow::Result<Self> {
        let dim = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != dim) {
            anyhow::bail!(
                "Similarity matrix row {} has {} columns, expected {}",
                i,
                row.len(),
                dim
            );
        }
        Ok(Self {
            dim,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Loads the matrix in one read; `.json` files hold rows, anything else the binary layout
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read similarity matrix at {}", path.display()))?;

        if is_json {
            let rows: Vec<Vec<f32>> = serde_json::from_slice(&bytes).with_context(|| {
                format!("Failed to parse similarity matrix at {}", path.display())
            })?;
            Self::from_rows(rows)
        } else {
            Self::from_bytes(&bytes)
                .with_context(|| format!("Invalid similarity matrix at {}", path.display()))
        }
    }

    /// Parses `[u32 version][u32 dim][dim * dim f32]`, all little-endian
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() < MATRIX_HEADER_SIZE {
            anyhow::bail!(
                "Invalid matrix header: expected {} bytes, got {}",
                MATRIX_HEADER_SIZE,
                bytes.len()
            );
        }
        let version = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if version != MATRIX_FORMAT_VERSION {
            anyhow::bail!("Unsupported matrix format version {}", version);
        }
        let dim = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

        let body = &bytes[MATRIX_HEADER_SIZE..];
        let Some(expected) = dim
            .checked_mul(dim)
            .and_then(|cells| cells.checked_mul(BYTES_PER_F32))
        else {
            anyhow::bail!("Matrix dimension {} in header is too large", dim);
        };
        if body.len() != expected {
            anyhow::bail!(
                "Matrix body has {} bytes, expected {} for dimension {}",
                body.len(),
                expected,
                dim
            );
        }

        let values = body
            .chunks_exact(BYTES_PER_F32)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(dim, values)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MATRIX_HEADER_SIZE + self.values.len() * BYTES_PER_F32);
        bytes.extend_from_slice(&MATRIX_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        for value in &self.values {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        (index < self.dim).then(|| &self.values[index * self.dim..(index + 1) * self.dim])
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.row(row).and_then(|r| r.get(col).copied())
    }
}

/// A candidate produced by the similarity ranker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarHit {
    pub index: usize,
    pub score: f32,
}

/// Orders a matrix row into a bounded candidate window
#[derive(Debug, Clone, Copy)]
pub struct SimilarityRanker {
    overshoot: usize,
}

impl SimilarityRanker {
    pub fn new(overshoot: usize) -> Self {
        Self { overshoot }
    }

    /// Returns up to `top_n + overshoot` candidates for `source`
    ///
    /// The full row is sorted first (score descending, index ascending on
    /// ties, non-finite scores last) and only then narrowed to `subset`, so
    /// the order never depends on the filter. The source itself is dropped.
    pub fn rank(
        &self,
        source: usize,
        matrix: &SimilarityMatrix,
        subset: &CatalogSubset,
        top_n: usize,
    ) -> Vec<SimilarHit> {
        let Some(row) = matrix.row(source) else {
            return Vec::new();
        };

        let mut hits: Vec<SimilarHit> = row
            .iter()
            .enumerate()
            .map(|(index, &score)| SimilarHit { index, score })
            .collect();
        hits.sort_by(compare_hits);

        hits.into_iter()
            .filter(|hit| subset.contains(hit.index))
            .filter(|hit| hit.index != source)
            .take(top_n + self.overshoot)
            .collect()
    }
}

fn compare_hits(a: &SimilarHit, b: &SimilarHit) -> Ordering {
    sortable(b.score)
        .total_cmp(&sortable(a.score))
        .then(a.index.cmp(&b.index))
}

fn sortable(score: f32) -> f32 {
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}
