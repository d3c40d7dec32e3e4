use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors raised by the recommendation pipeline
///
/// Each of these aborts a single request and is reported back to the caller
/// as data; none of them is fatal to the process.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No items match the selected filter ({filter}).")]
    NoCatalogMatch { filter: String },

    #[error("No close match found for '{query}'.")]
    NoTitleMatch { query: String },
}

impl RecommendError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::InvalidInput(_) => "invalid_input",
            RecommendError::NoCatalogMatch { .. } => "no_catalog_match",
            RecommendError::NoTitleMatch { .. } => "no_title_match",
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Recommend(e) => e.kind(),
            AppError::UpstreamUnavailable(_) | AppError::HttpClient(_) => "upstream_unavailable",
            _ => "internal",
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Recommend(RecommendError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Recommend(RecommendError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Recommend(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
