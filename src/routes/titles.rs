use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::{parse_kind, AppState};
use crate::{error::AppResult, models::ResolvedTitle};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    q: String,
    kind: Option<String>,
    format: Option<String>,
}

/// Handler for the title resolution endpoint
pub async fn resolve(
    State(state): State<AppState>,
    query: Result<Query<ResolveQuery>, QueryRejection>,
) -> AppResult<Json<ResolvedTitle>> {
    let Query(params) = query?;
    let kind = parse_kind(params.kind.as_deref())?;
    let resolved = state
        .service
        .resolve_title(&params.q, kind, params.format.as_deref())?;
    Ok(Json(resolved))
}
