pub mod history_service;
pub mod holding_service;
pub mod market_service;
pub mod news_service;
pub mod notification_service;
pub mod pricing_service;
pub mod valuation_service;
