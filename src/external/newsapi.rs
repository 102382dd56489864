use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::external::news_provider::{NewsProvider, NewsProviderError};
use crate::models::{NewsArticle, NewsSearch};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// NewsAPI.org `everything` endpoint.
pub struct NewsApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiProvider {
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: NewsApiSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    async fn fetch_news(&self, search: &NewsSearch) -> Result<Vec<NewsArticle>, NewsProviderError> {
        let url = format!("{}/v2/everything", self.base_url);
        let page_size = search.page_size.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("q", search.query.as_str()),
            ("sortBy", search.sort_by.as_str()),
            ("language", search.language.as_str()),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(from) = &search.from {
            query.push(("from", from.as_str()));
        }
        if let Some(to) = &search.to {
            query.push(("to", to.as_str()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| NewsProviderError::Network(e.to_string()))?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(NewsProviderError::RateLimited);
        }

        let body: NewsApiResponse = resp
            .json()
            .await
            .map_err(|e| NewsProviderError::Parse(e.to_string()))?;

        if body.status != "ok" {
            return Err(NewsProviderError::BadResponse(
                body.message.unwrap_or_else(|| format!("API returned status: {}", body.status)),
            ));
        }

        // NewsAPI pads results with "[Removed]" stubs that have no url or date
        let articles = body
            .articles
            .into_iter()
            .filter_map(|a| {
                let published_at = a
                    .published_at
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|d| d.with_timezone(&Utc));
                match (a.title, a.url, published_at) {
                    (Some(title), Some(url), Some(published_at)) => Some(NewsArticle {
                        title,
                        url,
                        source: a.source.name.unwrap_or_else(|| "unknown".to_string()),
                        published_at,
                        snippet: a.description,
                        image_url: a.url_to_image,
                    }),
                    _ => {
                        warn!("Skipping incomplete news article");
                        None
                    }
                }
            })
            .collect();

        Ok(articles)
    }
}
