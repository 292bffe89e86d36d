//! External ETH/USD price feeds

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use num_rational::BigRational;
use serde::Deserialize;
use serde_json::Number;
use tracing::{debug, warn};

use pixel_pricer_core::{parse_rational, PriceFeedError, PriceFeedResult};

/// Default CoinGecko simple price endpoint for ETH in USD
pub const COINGECKO_ENDPOINT: &str =
    "https://api.coingecko.com/api/v3/simple/price?vs_currencies=usd&ids=ethereum";

/// A source answering "what is one ETH worth in USD right now".
///
/// Callers bound the call with a timeout; dropping the future cancels it.
#[async_trait]
pub trait ExternalFeed: Send + Sync {
    fn name(&self) -> &str;

    async fn current_price(&self) -> PriceFeedResult<BigRational>;
}

/// Known feed identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    CoinGecko,
}

impl FeedKind {
    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::CoinGecko => "coingecko",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coingecko" => Ok(FeedKind::CoinGecko),
            other => Err(format!("provided feed '{other}' is not valid")),
        }
    }
}

/// `{"ethereum":{"usd":1925.43}}`
///
/// `Number` keeps the literal text of the price, so it never goes through
/// `f64` on its way to a rational.
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    ethereum: Option<UsdQuote>,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: Option<Number>,
}

/// Endpoints for the concrete feeds
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub coingecko_url: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            coingecko_url: COINGECKO_ENDPOINT.to_string(),
        }
    }
}

/// Resolve a comma-separated list of feed identifiers.
///
/// Unknown and empty identifiers are logged and skipped; the caller decides
/// whether an empty result is fatal.
pub fn build_feeds(
    ids: &str,
    settings: &FeedSettings,
    http: reqwest::Client,
) -> Vec<Arc<dyn ExternalFeed>> {
    let mut feeds: Vec<Arc<dyn ExternalFeed>> = Vec::new();

    for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        match id.parse::<FeedKind>() {
            Ok(FeedKind::CoinGecko) => {
                feeds.push(Arc::new(CoinGeckoFeed::with_endpoint(
                    http.clone(),
                    settings.coingecko_url.clone(),
                )));
            }
            Err(e) => warn!("{}", e),
        }
    }

    feeds
}

/// CoinGecko simple price feed
#[derive(Debug, Clone)]
pub struct CoinGeckoFeed {
    http: reqwest::Client,
    endpoint: String,
}

impl CoinGeckoFeed {
    pub fn with_endpoint(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    /// Extract `ethereum.usd` from a simple price payload
    fn parse_response(body: &str) -> PriceFeedResult<BigRational> {
        let prices: SimplePriceResponse = serde_json::from_str(body)
            .map_err(|e| PriceFeedError::InvalidMessage(e.to_string()))?;

        let usd = prices
            .ethereum
            .and_then(|quote| quote.usd)
            .ok_or_else(|| PriceFeedError::InvalidMessage("missing ethereum.usd".to_string()))?;

        parse_rational(&usd.to_string()).map_err(|e| PriceFeedError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl ExternalFeed for CoinGeckoFeed {
    fn name(&self) -> &str {
        FeedKind::CoinGecko.name()
    }

    async fn current_price(&self) -> PriceFeedResult<BigRational> {
        let res = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(PriceFeedError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let price = Self::parse_response(&body)?;
        debug!("coingecko ETHUSD={}", price);
        Ok(price)
    }
}
