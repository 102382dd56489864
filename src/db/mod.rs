pub mod history_queries;
pub mod holding_queries;
pub mod notification_queries;
pub mod portfolio_queries;
