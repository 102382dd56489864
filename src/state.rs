use std::sync::Arc;

use crate::config::ValuationConfig;
use crate::external::news_provider::NewsProvider;
use crate::external::price_provider::PriceProvider;
use crate::store::PortfolioStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PortfolioStore>,
    pub price_provider: Arc<dyn PriceProvider>,
    pub news_provider: Arc<dyn NewsProvider>,
    pub valuation: ValuationConfig,
    pub jwt_secret: Arc<str>,
}
