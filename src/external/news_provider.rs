use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewsArticle, NewsSearch};

#[derive(Debug, Error)]
pub enum NewsProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("news provider error: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Trait for news providers
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self, search: &NewsSearch) -> Result<Vec<NewsArticle>, NewsProviderError>;
}
