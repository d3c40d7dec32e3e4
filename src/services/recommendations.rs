use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use super::catalog::{Catalog, CatalogFilter, CatalogSubset};
use super::formatter::{attach_trailer, ResultFormatter};
use super::scoring::{HybridScorer, RankedCandidate};
use super::similarity::{SimilarityMatrix, SimilarityRanker};
use super::title_search::{AliasIndex, ManualAliases, TitleMatch, TitleResolver};
use super::trailers::TrailerService;
use crate::config::RecommenderPolicy;
use crate::error::{AppResult, RecommendError};
use crate::models::{MediaKind, RecommendationResponse, ResolvedTitle};

/// A single recommendation query
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub query: String,
    /// Falls back to the policy default when absent
    pub top_n: Option<usize>,
    pub kind: MediaKind,
    /// Manga sub-format such as `NOVEL`; ignored for anime
    pub sub_format: Option<String>,
}

impl RecommendationRequest {
    pub fn new(query: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            query: query.into(),
            top_n: None,
            kind,
            sub_format: None,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn with_sub_format(mut self, sub_format: impl Into<String>) -> Self {
        self.sub_format = Some(sub_format.into());
        self
    }
}

/// Resolved source title plus its ranked neighbours
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub source_index: usize,
    pub matched: TitleMatch,
    pub candidates: Vec<RankedCandidate>,
}

/// The synchronous ranking core
///
/// Owns the immutable catalog and matrix and precomputes one subset and
/// alias index per media kind. Requests with a sub-format build theirs on the
/// fly.
pub struct Recommender {
    catalog: Arc<Catalog>,
    matrix: Arc<SimilarityMatrix>,
    policy: RecommenderPolicy,
    resolver: TitleResolver,
    ranker: SimilarityRanker,
    scorer: HybridScorer,
    by_kind: HashMap<MediaKind, (CatalogSubset, AliasIndex)>,
}

impl Recommender {
    /// # Errors
    ///
    /// Fails when the matrix dimension differs from the catalog length
    pub fn new(
        catalog: Arc<Catalog>,
        matrix: Arc<SimilarityMatrix>,
        manual_aliases: ManualAliases,
        policy: RecommenderPolicy,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            matrix.dim() == catalog.len(),
            "similarity matrix is {0}x{0} but the catalog has {1} records",
            matrix.dim(),
            catalog.len()
        );

        let by_kind = MediaKind::ALL
            .iter()
            .map(|&kind| {
                let subset = catalog.subset(&CatalogFilter::new(kind, None));
                let aliases = AliasIndex::build(&catalog, &subset);
                tracing::info!(
                    kind = %kind,
                    records = subset.len(),
                    aliases = aliases.len(),
                    "Alias index built"
                );
                (kind, (subset, aliases))
            })
            .collect();

        Ok(Self {
            resolver: TitleResolver::new(manual_aliases, policy.match_threshold),
            ranker: SimilarityRanker::new(policy.overshoot),
            scorer: HybridScorer::from_policy(&policy),
            catalog,
            matrix,
            policy,
            by_kind,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Applies the default and rejects values outside the allowed range
    pub fn validate_top_n(&self, top_n: Option<usize>) -> Result<usize, RecommendError> {
        let top_n = top_n.unwrap_or(self.policy.default_top_n);
        if top_n < self.policy.min_top_n || top_n > self.policy.max_top_n {
            return Err(RecommendError::InvalidInput(format!(
                "top_n must be between {} and {}, got {}",
                self.policy.min_top_n, self.policy.max_top_n, top_n
            )));
        }
        Ok(top_n)
    }

    fn subset_and_aliases(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Cow<'_, CatalogSubset>, Cow<'_, AliasIndex>), RecommendError> {
        let (subset, aliases) = match (filter.sub_format.is_some(), self.by_kind.get(&filter.kind)) {
            (false, Some((subset, aliases))) => (Cow::Borrowed(subset), Cow::Borrowed(aliases)),
            _ => {
                let subset = self.catalog.subset(filter);
                let aliases = AliasIndex::build(&self.catalog, &subset);
                (Cow::Owned(subset), Cow::Owned(aliases))
            }
        };

        if subset.is_empty() {
            return Err(RecommendError::NoCatalogMatch {
                filter: filter.describe(),
            });
        }
        Ok((subset, aliases))
    }

    /// Resolves `query` within the kind/sub-format subset
    pub fn resolve(
        &self,
        query: &str,
        kind: MediaKind,
        sub_format: Option<&str>,
    ) -> Result<TitleMatch, RecommendError> {
        let filter = CatalogFilter::new(kind, sub_format);
        let (_, aliases) = self.subset_and_aliases(&filter)?;
        self.resolver.resolve(query, &aliases)
    }

    /// Runs filter, resolution, similarity ranking and hybrid re-ranking
    ///
    /// An empty filtered catalog is reported before the query is looked at.
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendation, RecommendError> {
        let top_n = self.validate_top_n(request.top_n)?;
        let filter = CatalogFilter::new(request.kind, request.sub_format.as_deref());
        let (subset, aliases) = self.subset_and_aliases(&filter)?;

        let matched = self.resolver.resolve(&request.query, &aliases)?;
        let source_index = matched.index;
        let source = self.catalog.get(source_index).ok_or_else(|| {
            RecommendError::NoTitleMatch {
                query: request.query.clone(),
            }
        })?;

        let hits = self
            .ranker
            .rank(source_index, &self.matrix, &subset, top_n);
        let candidates = self
            .scorer
            .score_and_select(&hits, source, &self.catalog, top_n);

        tracing::info!(
            query = %request.query,
            filter = %filter.describe(),
            source_id = source.id,
            window = hits.len(),
            results = candidates.len(),
            "Recommendations ranked"
        );

        Ok(Recommendation {
            source_index,
            matched,
            candidates,
        })
    }
}

/// Ranking core plus formatting and trailer enrichment
pub struct RecommendationService {
    recommender: Recommender,
    formatter: ResultFormatter,
    trailers: TrailerService,
}

impl RecommendationService {
    pub fn new(recommender: Recommender, formatter: ResultFormatter, trailers: TrailerService) -> Self {
        Self {
            recommender,
            formatter,
            trailers,
        }
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    /// Ranked, formatted results with trailer data attached
    ///
    /// Trailer lookups run concurrently after ranking; a failed lookup only
    /// leaves that row without a trailer.
    pub async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> AppResult<RecommendationResponse> {
        let recommendation = self.recommender.recommend(request)?;
        let catalog = self.recommender.catalog();

        let mut results = Vec::with_capacity(recommendation.candidates.len());
        let mut lookups = Vec::with_capacity(recommendation.candidates.len());
        for candidate in &recommendation.candidates {
            if let Some(record) = catalog.get(candidate.index) {
                results.push(
                    self.formatter
                        .format_record(record, candidate.index, candidate.similarity),
                );
                lookups.push((record.id, record.kind));
            }
        }

        let trailer_ids = self.trailers.trailers_for(&lookups).await;
        for (row, trailer_id) in results.iter_mut().zip(trailer_ids) {
            attach_trailer(row, trailer_id);
        }

        let (matched_title, source_id) = catalog
            .get(recommendation.source_index)
            .map(|r| (r.display_title.clone(), r.id))
            .unwrap_or_default();

        Ok(RecommendationResponse {
            query: request.query.clone(),
            matched_title,
            match_score: recommendation.matched.score,
            source_id,
            results,
        })
    }

    /// Resolves a query without ranking
    pub fn resolve_title(
        &self,
        query: &str,
        kind: MediaKind,
        sub_format: Option<&str>,
    ) -> AppResult<ResolvedTitle> {
        let matched = self.recommender.resolve(query, kind, sub_format)?;
        let (id, display_title) = self
            .recommender
            .catalog()
            .get(matched.index)
            .map(|r| (r.id, r.display_title.clone()))
            .unwrap_or_default();
        Ok(ResolvedTitle {
            matched_alias: matched.alias,
            score: matched.score,
            id,
            display_title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MockTrailerCache;
    use crate::error::AppError;
    use crate::models::{MediaFormat, MediaRecord};
    use crate::services::providers::MockTrailerProvider;
    use std::collections::HashSet;
    use std::time::Duration;

    /// indices: 0 Naruto, 1 Bleach, 2 Clannad, 3 One Piece, 4 Toradora,
    /// 5 Berserk (manga), 6 Monster (manga)
    fn catalog() -> Catalog {
        Catalog::new(vec![
            MediaRecord::new(20, MediaKind::Anime, "Naruto")
                .with_genres(&["Action", "Adventure"])
                .with_tags(&["Ninja", "Shounen"]),
            MediaRecord::new(269, MediaKind::Anime, "Bleach")
                .with_genres(&["Action", "Supernatural"])
                .with_tags(&["Shounen"]),
            MediaRecord::new(2167, MediaKind::Anime, "Clannad")
                .with_genres(&["Drama", "Romance"]),
            MediaRecord::new(21, MediaKind::Anime, "One Piece")
                .with_genres(&["Action", "Adventure"])
                .with_tags(&["Pirates", "Shounen"]),
            MediaRecord::new(4224, MediaKind::Anime, "Toradora!")
                .with_genres(&["Romance", "Comedy"]),
            MediaRecord::new(30002, MediaKind::Manga, "Berserk")
                .with_genres(&["Action", "Drama"])
                .with_format(MediaFormat::Manga),
            MediaRecord::new(30001, MediaKind::Manga, "Monster")
                .with_genres(&["Drama", "Mystery"])
                .with_format(MediaFormat::Manga),
        ])
    }

    fn matrix() -> SimilarityMatrix {
        SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.6, 0.7, 0.5, 0.65, 0.95, 0.1],
            vec![0.6, 1.0, 0.2, 0.4, 0.1, 0.3, 0.2],
            vec![0.7, 0.2, 1.0, 0.1, 0.8, 0.3, 0.4],
            vec![0.5, 0.4, 0.1, 1.0, 0.2, 0.3, 0.1],
            vec![0.65, 0.1, 0.8, 0.2, 1.0, 0.1, 0.2],
            vec![0.95, 0.3, 0.3, 0.3, 0.1, 1.0, 0.6],
            vec![0.1, 0.2, 0.4, 0.1, 0.2, 0.6, 1.0],
        ])
        .unwrap()
    }

    fn policy() -> RecommenderPolicy {
        RecommenderPolicy {
            min_top_n: 1,
            ..RecommenderPolicy::default()
        }
    }

    fn recommender() -> Recommender {
        Recommender::new(
            Arc::new(catalog()),
            Arc::new(matrix()),
            ManualAliases::default(),
            policy(),
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_matrix_rejected() {
        let small = SimilarityMatrix::from_rows(vec![vec![1.0]]).unwrap();
        let result = Recommender::new(
            Arc::new(catalog()),
            Arc::new(small),
            ManualAliases::default(),
            policy(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_naruto_top_three_genre_matches_first() {
        let request = RecommendationRequest::new("Naruto", MediaKind::Anime).with_top_n(3);
        let rec = recommender().recommend(&request).unwrap();

        assert_eq!(rec.source_index, 0);
        assert_eq!(rec.matched.score, 100.0);
        let indices: Vec<usize> = rec.candidates.iter().map(|c| c.index).collect();
        // Bleach and One Piece share genres; Clannad and Toradora do not,
        // and the Berserk manga is outside the anime subset
        assert_eq!(indices, vec![1, 3, 2]);
        assert!(rec.candidates[0].is_head());
        assert!(rec.candidates[1].is_head());
        assert!(!rec.candidates[2].is_head());
    }

    #[test]
    fn test_results_distinct_and_exclude_source() {
        let request = RecommendationRequest::new("naruto", MediaKind::Anime).with_top_n(10);
        let rec = recommender().recommend(&request).unwrap();
        let indices: HashSet<usize> = rec.candidates.iter().map(|c| c.index).collect();
        assert_eq!(indices.len(), rec.candidates.len());
        assert!(!indices.contains(&0));
        assert_eq!(rec.candidates.len(), 4);
    }

    #[test]
    fn test_kind_filter_never_leaks_other_kind() {
        let r = recommender();
        let request = RecommendationRequest::new("Berserk", MediaKind::Manga).with_top_n(5);
        let rec = r.recommend(&request).unwrap();
        assert_eq!(rec.source_index, 5);
        for candidate in &rec.candidates {
            assert_eq!(r.catalog().get(candidate.index).unwrap().kind, MediaKind::Manga);
        }
        // indices stay original catalog positions
        assert_eq!(
            rec.candidates.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![6]
        );
    }

    #[test]
    fn test_anime_query_does_not_resolve_to_manga() {
        let request = RecommendationRequest::new("Berserk", MediaKind::Anime).with_top_n(5);
        let err = recommender().recommend(&request).unwrap_err();
        assert!(matches!(err, RecommendError::NoTitleMatch { .. }));
    }

    #[test]
    fn test_garbage_query_no_title_match() {
        let request = RecommendationRequest::new("zzzzzznotarealtitle", MediaKind::Anime);
        let err = recommender().recommend(&request).unwrap_err();
        assert_eq!(
            err,
            RecommendError::NoTitleMatch {
                query: "zzzzzznotarealtitle".to_string()
            }
        );
    }

    #[test]
    fn test_novel_filter_without_novels_is_no_catalog_match() {
        // the query would resolve if matching ran; the filter must fail first
        let request = RecommendationRequest::new("Berserk", MediaKind::Manga).with_sub_format("NOVEL");
        let err = recommender().recommend(&request).unwrap_err();
        assert_eq!(
            err,
            RecommendError::NoCatalogMatch {
                filter: "MANGA/NOVEL".to_string()
            }
        );
    }

    #[test]
    fn test_sub_format_all_is_ignored() {
        let request = RecommendationRequest::new("Monster", MediaKind::Manga)
            .with_top_n(5)
            .with_sub_format("all");
        let rec = recommender().recommend(&request).unwrap();
        assert_eq!(rec.source_index, 6);
    }

    #[test]
    fn test_top_n_out_of_range_rejected() {
        let strict = Recommender::new(
            Arc::new(catalog()),
            Arc::new(matrix()),
            ManualAliases::default(),
            RecommenderPolicy::default(),
        )
        .unwrap();
        for top_n in [4, 31] {
            let request = RecommendationRequest::new("Naruto", MediaKind::Anime).with_top_n(top_n);
            assert!(matches!(
                strict.recommend(&request),
                Err(RecommendError::InvalidInput(_))
            ));
        }
        assert_eq!(strict.validate_top_n(None).unwrap(), 15);
    }

    #[test]
    fn test_manual_alias_same_as_full_title() {
        let catalog = Catalog::new(vec![
            MediaRecord::new(16498, MediaKind::Anime, "Attack on Titan").with_genres(&["Action"]),
            MediaRecord::new(20, MediaKind::Anime, "Naruto").with_genres(&["Action"]),
        ]);
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
        let r = Recommender::new(Arc::new(catalog), Arc::new(matrix), ManualAliases::default(), policy())
            .unwrap();

        let short = r
            .recommend(&RecommendationRequest::new("aot", MediaKind::Anime).with_top_n(5))
            .unwrap();
        let full = r
            .recommend(&RecommendationRequest::new("attack on titan", MediaKind::Anime).with_top_n(5))
            .unwrap();
        assert_eq!(short, full);
    }

    fn service(provider: MockTrailerProvider, cache: MockTrailerCache) -> RecommendationService {
        let trailers = TrailerService::new(Arc::new(provider), Arc::new(cache), Duration::from_millis(200));
        RecommendationService::new(recommender(), ResultFormatter::new().unwrap(), trailers)
    }

    #[tokio::test]
    async fn test_service_formats_and_attaches_trailers() {
        let mut provider = MockTrailerProvider::new();
        provider.expect_fetch_trailer_id().returning(|id, _| {
            if id == 269 {
                Ok(Some("bleachTrailer".to_string()))
            } else {
                Err(AppError::UpstreamUnavailable("timeout".to_string()))
            }
        });
        let mut cache = MockTrailerCache::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_put().returning(|_, _| Ok(()));

        let request = RecommendationRequest::new("Naruto", MediaKind::Anime).with_top_n(3);
        let response = service(provider, cache)
            .get_recommendations(&request)
            .await
            .unwrap();

        assert_eq!(response.matched_title, "Naruto");
        assert_eq!(response.source_id, 20);
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].id, 269);
        assert_eq!(response.results[0].trailer_id.as_deref(), Some("bleachTrailer"));
        assert_eq!(
            response.results[0].trailer_url,
            "https://www.youtube.com/watch?v=bleachTrailer"
        );
        // failed lookups leave the row without a trailer
        assert_eq!(response.results[1].trailer_id, None);
        assert!(response.results[1].trailer_url.contains("search_query="));
        assert_eq!(response.results[0].similarity_score, 0.6);
    }

    #[tokio::test]
    async fn test_service_errors_skip_trailer_lookups() {
        let mut provider = MockTrailerProvider::new();
        provider.expect_fetch_trailer_id().never();
        let mut cache = MockTrailerCache::new();
        cache.expect_get().never();

        let request = RecommendationRequest::new("zzzzzznotarealtitle", MediaKind::Anime);
        let err = service(provider, cache)
            .get_recommendations(&request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Recommend(RecommendError::NoTitleMatch { .. })
        ));
    }

    #[test]
    fn test_resolve_title() {
        let svc = service(MockTrailerProvider::new(), MockTrailerCache::new());
        let resolved = svc.resolve_title("one piece", MediaKind::Anime, None).unwrap();
        assert_eq!(resolved.id, 21);
        assert_eq!(resolved.display_title, "One Piece");
        assert_eq!(resolved.matched_alias, "one piece");
    }
}
