//! Pixel pricer service
//!
//! Wires settings, feeds, the node publisher and the pricing engine together

pub mod logging;
pub mod settings;
pub mod shutdown;

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use pixel_price_feed::{build_feeds, AggregatorConfig, FeedAggregator, FeedSettings};
use pixel_pricer::{EngineConfig, PricingEngine};
use pixel_publisher::{NodePublisher, PublisherConfig};

pub use settings::{ResolvedSettings, Settings};

/// Resolve feeds, discover the node role and build the engine.
///
/// Every failure here is fatal: no feeds, or a node that cannot be reached
/// or does not say what it is.
pub async fn build_engine(settings: &ResolvedSettings) -> anyhow::Result<PricingEngine> {
    let http = reqwest::Client::new();

    let feed_settings = FeedSettings {
        coingecko_url: settings.coingecko_url.clone(),
    };
    let feeds = build_feeds(&settings.feeds, &feed_settings, http.clone());
    let aggregator = FeedAggregator::new(
        AggregatorConfig {
            feed_timeout: settings.feed_timeout,
            ..Default::default()
        },
        feeds,
    );
    if aggregator.feed_count() == 0 {
        bail!("No feeds to fetch price from");
    }
    info!("Using {} price feed(s)", aggregator.feed_count());

    let publisher = NodePublisher::connect(
        PublisherConfig::default().with_node_url(settings.node_url.clone()),
        http,
    )
    .await
    .context("Unable to start feeder")?;

    let config = EngineConfig::new(settings.pricing.clone())
        .with_polling_interval(settings.polling_interval)
        .with_max_consecutive_failures(settings.max_consecutive_failures);

    Ok(PricingEngine::new(config, Arc::new(aggregator), Arc::new(publisher)))
}
