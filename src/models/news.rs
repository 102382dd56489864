use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub snippet: Option<String>,
    pub image_url: Option<String>,
}

/// Request parameters for fetching news
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQueryParams {
    /// Search phrase (default: "stocks")
    pub query: Option<String>,
    /// ISO-8601 lower bound on publication time
    pub from: Option<String>,
    /// ISO-8601 upper bound on publication time
    pub to: Option<String>,
    /// publishedAt | relevancy | popularity
    pub sort_by: Option<String>,
    pub language: Option<String>,
    /// Narrow the query to the tickers this user holds
    pub user_id: Option<String>,
}

/// Validated search sent to a news provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsSearch {
    pub query: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort_by: String,
    pub language: String,
    pub page_size: u32,
}
