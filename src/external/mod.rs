pub mod news_provider;
pub mod newsapi;
pub mod polygon;
pub mod price_provider;
