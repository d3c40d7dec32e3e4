use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use anisense_api::{
    config::RecommenderPolicy,
    db::JsonFileCache,
    error::AppResult,
    models::{MediaFormat, MediaKind, MediaRecord},
    routes::{create_router, AppState},
    services::{
        providers::TrailerProvider, Catalog, ManualAliases, RecommendationService, Recommender,
        ResultFormatter, SimilarityMatrix, TrailerService,
    },
};

/// Returns a trailer only for Bleach
struct StubProvider;

#[async_trait::async_trait]
impl TrailerProvider for StubProvider {
    async fn fetch_trailer_id(&self, media_id: u64, _kind: MediaKind) -> AppResult<Option<String>> {
        Ok((media_id == 269).then(|| "bleachTrailer".to_string()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn catalog() -> Catalog {
    let mut naruto = MediaRecord::new(20, MediaKind::Anime, "Naruto")
        .with_genres(&["Action", "Adventure"])
        .with_tags(&["Ninja", "Shounen"]);
    naruto.average_score = Some(79.0);

    Catalog::new(vec![
        naruto,
        MediaRecord::new(269, MediaKind::Anime, "Bleach")
            .with_genres(&["Action", "Supernatural"])
            .with_tags(&["Shounen"]),
        MediaRecord::new(2167, MediaKind::Anime, "Clannad").with_genres(&["Drama", "Romance"]),
        MediaRecord::new(21, MediaKind::Anime, "One Piece")
            .with_genres(&["Action", "Adventure"])
            .with_tags(&["Pirates", "Shounen"]),
        MediaRecord::new(4224, MediaKind::Anime, "Toradora!").with_genres(&["Romance", "Comedy"]),
        MediaRecord::new(30002, MediaKind::Manga, "Berserk")
            .with_genres(&["Action", "Drama"])
            .with_format(MediaFormat::Manga),
    ])
}

fn matrix() -> SimilarityMatrix {
    SimilarityMatrix::from_rows(vec![
        vec![1.0, 0.6, 0.7, 0.5, 0.65, 0.95],
        vec![0.6, 1.0, 0.2, 0.4, 0.1, 0.3],
        vec![0.7, 0.2, 1.0, 0.1, 0.8, 0.3],
        vec![0.5, 0.4, 0.1, 1.0, 0.2, 0.3],
        vec![0.65, 0.1, 0.8, 0.2, 1.0, 0.1],
        vec![0.95, 0.3, 0.3, 0.3, 0.1, 1.0],
    ])
    .unwrap()
}

async fn create_test_server(dir: &tempfile::TempDir) -> TestServer {
    let policy = RecommenderPolicy {
        min_top_n: 1,
        ..RecommenderPolicy::default()
    };
    let recommender = Recommender::new(
        Arc::new(catalog()),
        Arc::new(matrix()),
        ManualAliases::default(),
        policy,
    )
    .unwrap();

    let cache =
        JsonFileCache::open(dir.path().join("trailer_cache.json"), chrono::Duration::days(30)).await;
    let trailers = TrailerService::new(
        Arc::new(StubProvider),
        Arc::new(cache),
        Duration::from_secs(1),
    );
    let service =
        RecommendationService::new(recommender, ResultFormatter::new().unwrap(), trailers);

    TestServer::new(create_router(AppState::new(service))).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_for_exact_title() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "Naruto")
        .add_query_param("top_n", 3)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["matched_title"], "Naruto");
    assert_eq!(body["source_id"], 20);
    assert_eq!(body["match_score"], 100.0);

    let results = body["results"].as_array().unwrap();
    let ids: Vec<u64> = results.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![269, 21, 2167]);

    assert_eq!(results[0]["trailer_id"], "bleachTrailer");
    assert_eq!(
        results[0]["trailer_thumbnail"],
        "https://i.ytimg.com/vi/bleachTrailer/hqdefault.jpg"
    );
    assert!(results[1]["trailer_id"].is_null());
    assert_eq!(results[1]["anilist_url"], "https://anilist.co/anime/21");
    assert_eq!(results[0]["kind"], "ANIME");
}

#[tokio::test]
async fn test_trailer_lookups_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    server
        .get("/api/v1/recommendations")
        .add_query_param("q", "naruto")
        .add_query_param("top_n", 2)
        .await
        .assert_status_ok();

    let raw = std::fs::read_to_string(dir.path().join("trailer_cache.json")).unwrap();
    let cache: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(cache["269_ANIME"]["trailer_id"], "bleachTrailer");
    assert!(cache["21_ANIME"]["trailer_id"].is_null());
}

#[tokio::test]
async fn test_manual_alias_query() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "nrt")
        .add_query_param("top_n", 3)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["source_id"], 20);
}

#[tokio::test]
async fn test_unknown_title_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "zzzzzznotarealtitle")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "no_title_match");
    assert_eq!(body["message"], "No close match found for 'zzzzzznotarealtitle'.");
}

#[tokio::test]
async fn test_empty_sub_format_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "Berserk")
        .add_query_param("kind", "manga")
        .add_query_param("format", "NOVEL")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "no_catalog_match");
}

#[tokio::test]
async fn test_invalid_inputs_are_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "Naruto")
        .add_query_param("top_n", 99)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "Naruto")
        .add_query_param("kind", "novel")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_query_strings_are_json_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("q", "Naruto")
        .add_query_param("top_n", "abc")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");
    assert!(body["message"].as_str().unwrap().starts_with("Invalid input:"));

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("top_n", -3)
        .add_query_param("q", "Naruto")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");

    let response = server.get("/api/v1/recommendations").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");
    assert!(body["message"].as_str().unwrap().contains("missing field `q`"));

    let response = server
        .get("/api/v1/titles/resolve")
        .add_query_param("kind", "anime")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_resolve_title() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/api/v1/titles/resolve")
        .add_query_param("q", "berserk")
        .add_query_param("kind", "MANGA")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], 30002);
    assert_eq!(body["display_title"], "Berserk");
    assert_eq!(body["score"], 100.0);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_test_server(&dir).await;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-42");

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
