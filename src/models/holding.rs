use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One recorded stock position. Holdings form an append-only ledger per user:
/// purchases append, disposals shrink `amount` and close the holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,
    pub ticker: String,
    pub amount: f64,
    pub acquisition_price: f64,
    pub acquisition_date: NaiveDate,
    pub disposal_date: Option<NaiveDate>,
}

impl Holding {
    pub fn new(ticker: &str, amount: f64, acquisition_price: f64, acquisition_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.trim().to_uppercase(),
            amount,
            acquisition_price,
            acquisition_date,
            disposal_date: None,
        }
    }

    /// Active holdings take part in valuation.
    pub fn is_active(&self) -> bool {
        self.amount > 0.0 && self.disposal_date.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPosition {
    pub ticker: Option<String>,
    pub amount: Option<f64>,
    pub user_id: Option<String>,
    #[serde(alias = "buyDate")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellPosition {
    pub ticker: Option<String>,
    pub amount: Option<f64>,
    pub user_id: Option<String>,
    #[serde(alias = "sellDate")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPositionResponse {
    pub message: String,
    pub holding: Holding,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellPositionResponse {
    pub message: String,
    pub remaining_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserTickers {
    pub tickers: Vec<String>,
}
