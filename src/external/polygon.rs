use crate::external::price_provider::{
    validate_series_request, validate_ticker, Granularity, PriceProvider, PriceProviderError,
};
use crate::models::{PricePoint, TickerDetails, TickerMatch};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Polygon.io aggregates and reference-data client.
pub struct PolygonProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PolygonProvider {
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, PriceProviderError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {}", status)));
            }
            _ => {}
        }

        let body = resp
            .json::<T>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;
        Ok(Some(body))
    }
}

#[derive(Debug, Deserialize)]
struct PolygonAggsResponse {
    #[serde(default)]
    results: Option<Vec<PolygonBar>>,
}

#[derive(Debug, Deserialize)]
struct PolygonBar {
    /// Close price
    c: f64,
    /// Bar start, unix milliseconds
    t: i64,
}

#[derive(Debug, Deserialize)]
struct PolygonTickerResponse {
    results: Option<PolygonTicker>,
}

#[derive(Debug, Deserialize)]
struct PolygonTicker {
    ticker: String,
    name: String,
    locale: Option<String>,
    market_cap: Option<f64>,
    phone_number: Option<String>,
    description: Option<String>,
    homepage_url: Option<String>,
    total_employees: Option<u64>,
    list_date: Option<String>,
    share_class_shares_outstanding: Option<f64>,
    weighted_shares_outstanding: Option<f64>,
    round_lot: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PolygonSearchResponse {
    #[serde(default)]
    results: Vec<PolygonSearchMatch>,
}

#[derive(Debug, Deserialize)]
struct PolygonSearchMatch {
    ticker: String,
    name: String,
    market: Option<String>,
    primary_exchange: Option<String>,
    currency_name: Option<String>,
}

// Drops non-positive closes and orders bars oldest first.
fn to_price_points(bars: Vec<PolygonBar>) -> Result<Vec<PricePoint>, PriceProviderError> {
    let mut points = bars
        .into_iter()
        .filter(|bar| bar.c > 0.0)
        .map(|bar| {
            DateTime::<Utc>::from_timestamp_millis(bar.t)
                .map(|timestamp| PricePoint::new(timestamp, bar.c))
                .ok_or_else(|| PriceProviderError::Parse(format!("invalid bar timestamp {}", bar.t)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

#[async_trait]
impl PriceProvider for PolygonProvider {
    async fn latest_close(&self, ticker: &str) -> Result<Option<PricePoint>, PriceProviderError> {
        validate_ticker(ticker)?;
        let url = format!("{}/v2/aggs/ticker/{}/prev", self.base_url, ticker);

        let body: Option<PolygonAggsResponse> = self.get_json(&url, &[("adjusted", "true")]).await?;
        let bars = body.and_then(|b| b.results).unwrap_or_default();

        Ok(to_price_points(bars)?.pop())
    }

    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        validate_series_request(ticker, from, to)?;
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/{}/{}/{}",
            self.base_url,
            ticker,
            granularity,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
        );

        let body: Option<PolygonAggsResponse> = self
            .get_json(&url, &[("adjusted", "true"), ("sort", "asc"), ("limit", "50000")])
            .await?;
        let bars = body.and_then(|b| b.results).unwrap_or_default();

        to_price_points(bars)
    }

    async fn ticker_details(&self, ticker: &str) -> Result<Option<TickerDetails>, PriceProviderError> {
        validate_ticker(ticker)?;
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, ticker);

        let body: Option<PolygonTickerResponse> = self.get_json(&url, &[]).await?;
        Ok(body.and_then(|b| b.results).map(|t| TickerDetails {
            ticker: t.ticker,
            name: t.name,
            locale: t.locale,
            market_cap: t.market_cap,
            phone_number: t.phone_number,
            description: t.description,
            homepage_url: t.homepage_url,
            total_employees: t.total_employees,
            list_date: t.list_date,
            share_class_shares_outstanding: t.share_class_shares_outstanding,
            weighted_shares_outstanding: t.weighted_shares_outstanding,
            round_lot: t.round_lot,
        }))
    }

    async fn search_tickers(&self, keyword: &str) -> Result<Vec<TickerMatch>, PriceProviderError> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v3/reference/tickers", self.base_url);

        let body: Option<PolygonSearchResponse> = self
            .get_json(&url, &[("search", keyword), ("active", "true"), ("limit", "10")])
            .await?;

        Ok(body
            .map(|b| b.results)
            .unwrap_or_default()
            .into_iter()
            .map(|m| TickerMatch {
                symbol: m.ticker,
                name: m.name,
                market: m.market,
                primary_exchange: m.primary_exchange,
                currency: m.currency_name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(request_path: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_latest_close_reads_previous_day_bar() {
        let body = r#"{
            "ticker": "AAPL",
            "status": "OK",
            "resultsCount": 1,
            "results": [{"T": "AAPL", "c": 189.84, "o": 187.15, "t": 1704229200000}]
        }"#;
        let server = create_mock_server("/v2/aggs/ticker/AAPL/prev", 200, body).await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        let point = provider.latest_close("AAPL").await.unwrap().unwrap();

        assert_eq!(point.close, 189.84);
        assert_eq!(point.timestamp.timestamp_millis(), 1704229200000);
    }

    #[tokio::test]
    async fn test_latest_close_without_results_is_no_data() {
        let body = r#"{"ticker": "ZZZZ", "status": "OK", "resultsCount": 0}"#;
        let server = create_mock_server("/v2/aggs/ticker/ZZZZ/prev", 200, body).await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        assert!(provider.latest_close("ZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_series_sorts_and_drops_non_positive_closes() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"c": 151.0, "t": 1704326400000},
                {"c": 0.0, "t": 1704412800000},
                {"c": 149.5, "t": 1704240000000}
            ]
        }"#;
        let server =
            create_mock_server("/v2/aggs/ticker/AAPL/range/1/day/2024-01-03/2024-01-05", 200, body).await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        let points = provider
            .price_series(
                "AAPL",
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                Granularity::Day,
            )
            .await
            .unwrap();

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![149.5, 151.0]);
    }

    #[tokio::test]
    async fn test_rate_limit_status_maps_to_rate_limited() {
        let server = create_mock_server("/v2/aggs/ticker/AAPL/prev", 429, "{}").await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        let result = provider.latest_close("AAPL").await;
        assert!(matches!(result, Err(PriceProviderError::RateLimited)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_bad_response() {
        let server = create_mock_server("/v2/aggs/ticker/AAPL/prev", 500, "oops").await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        let result = provider.latest_close("AAPL").await;
        assert!(matches!(result, Err(PriceProviderError::BadResponse(_))));
    }

    #[tokio::test]
    async fn test_ticker_details_maps_reference_fields() {
        let body = r#"{
            "status": "OK",
            "results": {
                "ticker": "MSFT",
                "name": "Microsoft Corp",
                "locale": "us",
                "market_cap": 3100000000000.0,
                "homepage_url": "https://www.microsoft.com",
                "total_employees": 221000,
                "list_date": "1986-03-13",
                "round_lot": 100
            }
        }"#;
        let server = create_mock_server("/v3/reference/tickers/MSFT", 200, body).await;

        let provider = PolygonProvider::new(&server.uri(), "test-key".into());
        let details = provider.ticker_details("MSFT").await.unwrap().unwrap();
        assert_eq!(details.name, "Microsoft Corp");
        assert_eq!(details.total_employees, Some(221000));
        assert_eq!(details.round_lot, Some(100));
        assert!(details.description.is_none());
    }

    #[tokio::test]
    async fn test_search_with_empty_keyword_skips_request() {
        let provider = PolygonProvider::new("http://127.0.0.1:9", "test-key".into());
        assert!(provider.search_tickers("  ").await.unwrap().is_empty());
    }
}
