mod history;
mod holding;
mod news;
mod notification;
mod price_point;
mod ticker;
mod valuation;

pub use history::{AppendSnapshot, HistoryPoint, HistoryQuery, HistorySnapshot};
pub use holding::{AddPosition, AddPositionResponse, Holding, SellPosition, SellPositionResponse, UserTickers};
pub use news::{NewsArticle, NewsQueryParams, NewsSearch};
pub use notification::{MarkSeenRequest, MarkSeenResponse, Notification, NotificationKind, UserQuery};
pub use price_point::{ChartPoint, PriceChange, PriceChangeQuery, PricePoint, QuoteSummary, SearchQuery, SeriesQuery};
pub use ticker::{TickerDetails, TickerMatch};
pub use valuation::{DashboardSummary, PortfolioValuation, PositionValuation};
