use std::collections::HashSet;

use super::catalog::Catalog;
use super::similarity::SimilarHit;
use crate::config::RecommenderPolicy;
use crate::models::MediaRecord;

/// A candidate annotated with its overlap counts and blended score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub index: usize,
    pub similarity: f32,
    pub genre_overlap: usize,
    pub tag_overlap: usize,
    /// Blended score; `None` for head-slice entries, which are never blended
    pub combined: Option<f64>,
}

impl RankedCandidate {
    pub fn is_head(&self) -> bool {
        self.combined.is_none()
    }
}

/// Re-ranks similarity candidates by genre and tag overlap
///
/// The first `head_size` genre-matched candidates (in similarity order) are
/// kept at the top unconditionally. Every other candidate is ranked by
/// `genre_weight * genre_overlap + tag_weight * tag_overlap +
/// similarity_weight * similarity`, where the overlaps are raw counts.
#[derive(Debug, Clone)]
pub struct HybridScorer {
    genre_weight: f64,
    tag_weight: f64,
    similarity_weight: f64,
    head_size: usize,
}

impl HybridScorer {
    pub fn from_policy(policy: &RecommenderPolicy) -> Self {
        Self {
            genre_weight: policy.genre_weight,
            tag_weight: policy.tag_weight,
            similarity_weight: policy.similarity_weight,
            head_size: policy.head_size,
        }
    }

    pub fn combined_score(&self, genre_overlap: usize, tag_overlap: usize, similarity: f32) -> f64 {
        self.genre_weight * genre_overlap as f64
            + self.tag_weight * tag_overlap as f64
            + self.similarity_weight * f64::from(similarity)
    }

    /// Selects at most `top_n` candidates: head slice first, then the best blended remainder
    pub fn score_and_select(
        &self,
        candidates: &[SimilarHit],
        source: &MediaRecord,
        catalog: &Catalog,
        top_n: usize,
    ) -> Vec<RankedCandidate> {
        let source_genres = string_set(&source.genres);
        let source_tags = string_set(&source.tags);

        let annotated: Vec<RankedCandidate> = candidates
            .iter()
            .filter_map(|hit| {
                let record = catalog.get(hit.index)?;
                Some(RankedCandidate {
                    index: hit.index,
                    similarity: hit.score,
                    genre_overlap: overlap(&source_genres, &record.genres),
                    tag_overlap: overlap(&source_tags, &record.tags),
                    combined: None,
                })
            })
            .collect();

        let head_len = self.head_size.min(top_n);
        let mut head = Vec::with_capacity(head_len);
        let mut remainder = Vec::with_capacity(annotated.len());
        for candidate in annotated {
            if candidate.genre_overlap > 0 && head.len() < head_len {
                head.push(candidate);
            } else {
                let combined = self.combined_score(
                    candidate.genre_overlap,
                    candidate.tag_overlap,
                    candidate.similarity,
                );
                remainder.push(RankedCandidate {
                    combined: Some(combined),
                    ..candidate
                });
            }
        }

        // sort_by is stable: equal blends keep similarity order
        remainder.sort_by(|a, b| {
            b.combined
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.combined.unwrap_or(f64::NEG_INFINITY))
        });

        let fill = top_n.saturating_sub(head.len());
        tracing::debug!(
            head = head.len(),
            remainder = remainder.len(),
            fill,
            "Hybrid re-ranking"
        );

        head.into_iter()
            .chain(remainder.into_iter().take(fill))
            .collect()
    }
}

fn string_set(items: &[String]) -> HashSet<&str> {
    items.iter().map(String::as_str).collect()
}

fn overlap(source: &HashSet<&str>, items: &[String]) -> usize {
    string_set(items).intersection(source).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    fn hit(index: usize, score: f32) -> SimilarHit {
        SimilarHit { index, score }
    }

    fn scorer() -> HybridScorer {
        HybridScorer::from_policy(&RecommenderPolicy::default())
    }

    /// index 0 is the source; odd indices share a genre with it
    fn catalog() -> Catalog {
        let mut records = vec![MediaRecord::new(0, MediaKind::Anime, "Source")
            .with_genres(&["Action", "Drama"])
            .with_tags(&["Ninja", "Shounen", "Rivalry"])];
        for i in 1..=10u64 {
            let record = MediaRecord::new(i, MediaKind::Anime, format!("Title {}", i));
            let record = if i % 2 == 1 {
                record.with_genres(&["Action"])
            } else {
                record.with_genres(&["Romance"])
            };
            records.push(record);
        }
        Catalog::new(records)
    }

    #[test]
    fn test_combined_score_uses_raw_counts() {
        let score = scorer().combined_score(2, 3, 0.5);
        assert!((score - (0.8 + 0.6 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_head_slice_comes_first_regardless_of_blend() {
        let catalog = catalog();
        let source = catalog.get(0).unwrap().clone();
        let candidates: Vec<SimilarHit> =
            (1..=10).map(|i| hit(i, 1.0 - i as f32 * 0.05)).collect();

        let selected = scorer().score_and_select(&candidates, &source, &catalog, 6);
        let indices: Vec<usize> = selected.iter().map(|c| c.index).collect();

        // first four genre matches in similarity order, then best blends
        assert_eq!(&indices[..4], &[1, 3, 5, 7]);
        assert!(selected[..4].iter().all(RankedCandidate::is_head));
        assert!(selected[4..].iter().all(|c| !c.is_head()));
        // index 9 still has a genre match so it outranks the non-matching ones
        assert_eq!(indices[4], 9);
        assert_eq!(indices[5], 2);
        assert_eq!(selected.len(), 6);
    }

    #[test]
    fn test_remainder_sorted_by_blend_with_stable_ties() {
        let mut catalog_records = catalog().records().to_vec();
        catalog_records[2].tags = vec!["Ninja".to_string(), "Rivalry".to_string()];
        let catalog = Catalog::new(catalog_records);
        let source = catalog.get(0).unwrap().clone();

        let candidates = vec![hit(4, 0.9), hit(6, 0.9), hit(2, 0.1), hit(8, 0.9)];
        let selected = scorer().score_and_select(&candidates, &source, &catalog, 5);
        let indices: Vec<usize> = selected.iter().map(|c| c.index).collect();

        // 2 gains 0.4 from tags; 4, 6 and 8 tie and keep their input order
        assert_eq!(indices, vec![2, 4, 6, 8]);
        assert_eq!(selected[0].tag_overlap, 2);
    }

    #[test]
    fn test_head_capped_by_top_n() {
        let catalog = catalog();
        let source = catalog.get(0).unwrap().clone();
        let candidates: Vec<SimilarHit> = (1..=10).map(|i| hit(i, 0.5)).collect();
        let selected = scorer().score_and_select(&candidates, &source, &catalog, 2);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(RankedCandidate::is_head));
    }

    #[test]
    fn test_no_genre_matches_means_no_head() {
        let catalog = catalog();
        let source = catalog.get(0).unwrap().clone();
        let candidates = vec![hit(2, 0.3), hit(4, 0.8)];
        let selected = scorer().score_and_select(&candidates, &source, &catalog, 5);
        assert_eq!(
            selected.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![4, 2]
        );
        assert!(selected.iter().all(|c| !c.is_head()));
    }

    #[test]
    fn test_duplicate_genres_count_once() {
        let mut records = catalog().records().to_vec();
        records[1].genres = vec!["Action".to_string(), "Action".to_string(), "Drama".to_string()];
        let catalog = Catalog::new(records);
        let source = catalog.get(0).unwrap().clone();
        let selected = scorer().score_and_select(&[hit(1, 0.5)], &source, &catalog, 5);
        assert_eq!(selected[0].genre_overlap, 2);
    }
}
