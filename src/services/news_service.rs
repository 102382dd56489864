use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info};

use crate::errors::AppError;
use crate::external::news_provider::NewsProvider;
use crate::models::{NewsArticle, NewsQueryParams, NewsSearch};
use crate::services::holding_service;
use crate::store::PortfolioStore;

pub const DEFAULT_QUERY: &str = "stocks";
pub const DEFAULT_SORT: &str = "publishedAt";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const PAGE_SIZE: u32 = 50;

const SORT_ORDERS: [&str; 3] = ["publishedAt", "relevancy", "popularity"];

fn iso8601() -> &'static Regex {
    static ISO8601: OnceLock<Regex> = OnceLock::new();
    ISO8601.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}:\d{2}(\.\d{1,3})?(Z|[+-]\d{2}:\d{2})?)?$")
            .expect("Invalid regex pattern")
    })
}

fn validate_bound(name: &str, value: Option<&str>) -> Result<Option<String>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if iso8601().is_match(v) => Ok(Some(v.to_string())),
        Some(v) => Err(AppError::Validation(format!(
            "Invalid ISO 8601 format for '{}' parameter: {}",
            name, v
        ))),
        None => Ok(None),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Applies defaults and validates a news request. When `tickers` is non-empty
/// the query is narrowed to those tickers.
pub fn build_search(params: &NewsQueryParams, tickers: &[String]) -> Result<NewsSearch, AppError> {
    let from = validate_bound("from", params.from.as_deref())?;
    let to = validate_bound("to", params.to.as_deref())?;

    let sort_by = non_empty(&params.sort_by).unwrap_or(DEFAULT_SORT);
    if !SORT_ORDERS.contains(&sort_by) {
        return Err(AppError::Validation(format!(
            "Invalid sortBy '{}', expected one of {}",
            sort_by,
            SORT_ORDERS.join(", ")
        )));
    }

    let query = if tickers.is_empty() {
        non_empty(&params.query).unwrap_or(DEFAULT_QUERY).to_string()
    } else {
        tickers.join(" OR ")
    };

    Ok(NewsSearch {
        query,
        from,
        to,
        sort_by: sort_by.to_string(),
        language: non_empty(&params.language).unwrap_or(DEFAULT_LANGUAGE).to_lowercase(),
        page_size: PAGE_SIZE,
    })
}

/// Fetches news, narrowed to the user's tickers when `userId` is given.
pub async fn fetch(
    store: &dyn PortfolioStore,
    provider: &dyn NewsProvider,
    params: &NewsQueryParams,
) -> Result<Vec<NewsArticle>, AppError> {
    let tickers = match params.user_id.as_deref() {
        Some(raw) => {
            let user_id = holding_service::parse_user_id(Some(raw))?;
            holding_service::list_tickers(store, user_id).await?
        }
        None => Vec::new(),
    };

    let search = build_search(params, &tickers)?;
    info!("Fetching news for query '{}'", search.query);

    provider.fetch_news(&search).await.map_err(|e| {
        error!("News lookup failed for '{}': {}", search.query, e);
        AppError::from(e)
    })
}
