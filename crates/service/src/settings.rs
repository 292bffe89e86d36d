//! Operator settings from flags, environment and `.env`

use std::time::Duration;

use clap::Parser;

use pixel_price_feed::feeds::COINGECKO_ENDPOINT;
use pixel_pricer_core::{CoreError, CoreResult, PricingConfig, DEFAULT_PRICE_DELTA, DEFAULT_PRICE_PER_MILLION};
use pixel_publisher::{node_address, DEFAULT_NODE_HOST, DEFAULT_NODE_PORT};

/// Changes a node's pixel pricing based on the current ETH/USD exchange rate
#[derive(Debug, Clone, Parser)]
#[command(name = "pixel-pricer", version, about)]
pub struct Settings {
    /// CLI webserver address of the node
    #[arg(long, env = "PRICER_NODE", default_value = "")]
    pub node: String,

    /// USD price per MILLION pixels as a decimal string
    #[arg(long, env = "PRICER_PRICE", default_value = DEFAULT_PRICE_PER_MILLION)]
    pub price: String,

    /// Comma-separated price feeds to use
    #[arg(long, env = "PRICER_FEED", default_value = "coingecko")]
    pub feed: String,

    /// ETH/USD move, as a fraction, required before the node price is updated
    #[arg(long, env = "PRICER_PRICE_DELTA", default_value = DEFAULT_PRICE_DELTA)]
    pub price_delta: String,

    /// Seconds between ETH/USD polls
    #[arg(long, env = "PRICER_POLLING_INTERVAL", default_value_t = 3600)]
    pub polling_interval: u64,

    /// Seconds a single feed may take to answer
    #[arg(long, env = "PRICER_FEED_TIMEOUT", default_value_t = 5)]
    pub feed_timeout: u64,

    /// Failed polls in a row before giving up, 0 retries forever
    #[arg(long, env = "PRICER_MAX_CONSECUTIVE_FAILURES", default_value_t = 24)]
    pub max_consecutive_failures: u32,

    /// CoinGecko simple price endpoint
    #[arg(long, env = "PRICER_COINGECKO_URL", default_value = COINGECKO_ENDPOINT)]
    pub coingecko_url: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "PRICER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "PRICER_LOG_JSON")]
    pub log_json: bool,
}

/// Validated settings ready for wiring
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub node_url: String,
    pub pricing: PricingConfig,
    pub feeds: String,
    pub polling_interval: Duration,
    pub feed_timeout: Duration,
    pub max_consecutive_failures: u32,
    pub coingecko_url: String,
}

impl Settings {
    pub fn resolve(&self) -> CoreResult<ResolvedSettings> {
        let pricing = PricingConfig::from_strings(&self.price, &self.price_delta)?;

        if self.polling_interval == 0 {
            return Err(CoreError::InvalidConfig(
                "polling interval must be at least one second".to_string(),
            ));
        }
        if self.feed_timeout == 0 {
            return Err(CoreError::InvalidConfig(
                "feed timeout must be at least one second".to_string(),
            ));
        }

        Ok(ResolvedSettings {
            node_url: node_address(&self.node, DEFAULT_NODE_HOST, DEFAULT_NODE_PORT),
            pricing,
            feeds: self.feed.clone(),
            polling_interval: Duration::from_secs(self.polling_interval),
            feed_timeout: Duration::from_secs(self.feed_timeout),
            max_consecutive_failures: self.max_consecutive_failures,
            coingecko_url: self.coingecko_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_pricer_core::ratio;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["pixel-pricer"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let resolved = parse(&[]).resolve().unwrap();
        assert_eq!(resolved.node_url, "http://127.0.0.1:7935");
        assert_eq!(resolved.pricing, PricingConfig::default());
        assert_eq!(resolved.feeds, "coingecko");
        assert_eq!(resolved.polling_interval, Duration::from_secs(3600));
        assert_eq!(resolved.feed_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_flags() {
        let resolved = parse(&[
            "--node",
            ":8935",
            "--price",
            "3",
            "--price-delta",
            "0.1",
            "--polling-interval",
            "60",
        ])
        .resolve()
        .unwrap();

        assert_eq!(resolved.node_url, "http://127.0.0.1:8935");
        assert_eq!(resolved.pricing.base_price_usd, ratio(3, 1_000_000));
        assert_eq!(resolved.pricing.min_update_delta, ratio(1, 10));
        assert_eq!(resolved.polling_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_are_fatal() {
        assert!(parse(&["--price", "lots"]).resolve().is_err());
        assert!(parse(&["--price-delta", "5%"]).resolve().is_err());
        assert!(parse(&["--polling-interval", "0"]).resolve().is_err());
        assert!(parse(&["--feed-timeout", "0"]).resolve().is_err());
    }
}
