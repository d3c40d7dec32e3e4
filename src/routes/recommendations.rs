use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::{parse_kind, AppState};
use crate::{
    error::AppResult, models::RecommendationResponse, services::RecommendationRequest,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub q: String,
    pub top_n: Option<usize>,
    /// `ANIME` (default) or `MANGA`, case-insensitive
    pub kind: Option<String>,
    /// Manga sub-format, e.g. `NOVEL`
    pub format: Option<String>,
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    query: Result<Query<RecommendationParams>, QueryRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Query(params) = query?;
    let request = RecommendationRequest {
        kind: parse_kind(params.kind.as_deref())?,
        query: params.q,
        top_n: params.top_n,
        sub_format: params.format,
    };
    let response = state.service.get_recommendations(&request).await?;
    Ok(Json(response))
}
