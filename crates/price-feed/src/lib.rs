//! ETH/USD price sampling across independent feeds
//!
//! Features:
//! - Concurrent fan-out to every configured feed
//! - Per-feed timeout isolation
//! - Median with outlier rejection
//! - Exact rational arithmetic throughout

pub mod aggregator;
pub mod feeds;

pub use aggregator::{AggregatorConfig, FeedAggregator};
pub use feeds::{build_feeds, CoinGeckoFeed, ExternalFeed, FeedKind, FeedSettings};
