use http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::news_provider::NewsProviderError;
use crate::external::price_provider::PriceProviderError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),
    #[error("External error: {0}")]
    External(String),
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Machine-readable kind carried in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::RateLimited => "rate_limited",
            AppError::PriceUnavailable(_) => "price_unavailable",
            AppError::External(_) => "external_error",
            AppError::Store(StoreError::PortfolioNotFound(_)) => "not_found",
            AppError::Store(_) => "persistence_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::PriceUnavailable(_) | AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(StoreError::PortfolioNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (kind, message) = match &self {
            AppError::Store(StoreError::PortfolioNotFound(_)) => (self.kind(), self.to_string()),
            AppError::Store(_) => (self.kind(), "Internal server error".to_string()),
            AppError::Validation(msg)
            | AppError::InvalidFilter(msg)
            | AppError::NotFound(msg)
            | AppError::PriceUnavailable(msg)
            | AppError::External(msg) => (self.kind(), msg.clone()),
            AppError::Unauthorized | AppError::RateLimited => (self.kind(), self.to_string()),
        };
        let body = Json(json!({ "error": kind, "message": message }));

        if let AppError::RateLimited = self {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", HeaderValue::from_static("60"));
            return (status, headers, body).into_response();
        }
        (status, body).into_response()
    }
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        match value {
            PriceProviderError::RateLimited => AppError::RateLimited,
            PriceProviderError::InvalidRequest(msg) => AppError::Validation(msg),
            other => AppError::External(other.to_string()),
        }
    }
}

impl From<NewsProviderError> for AppError {
    fn from(value: NewsProviderError) -> Self {
        match value {
            NewsProviderError::RateLimited => AppError::RateLimited,
            other => AppError::External(other.to_string()),
        }
    }
}
