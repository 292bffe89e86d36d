//! Main pricing loop

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use num_rational::BigRational;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use pixel_price_feed::FeedAggregator;
use pixel_pricer_core::{
    band, format_fixed, unit_price, ConversionResult, PriceFeedResult, PricerError, PricerResult,
    PricingConfig,
};
use pixel_publisher::Publisher;

use crate::handle::EngineHandle;

/// Where the engine gets one fresh ETH/USD price per round
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn sample(&self) -> PriceFeedResult<BigRational>;
}

#[async_trait]
impl PriceSource for FeedAggregator {
    async fn sample(&self) -> PriceFeedResult<BigRational> {
        FeedAggregator::sample(self).await
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// USD charged per pixel
    pub base_price_usd: BigRational,
    /// Relative ETH/USD move below which nothing is published
    pub min_update_delta: BigRational,
    pub polling_interval: Duration,
    /// Failed rounds in a row before the engine gives up, 0 never gives up
    pub max_consecutive_failures: u32,
}

impl EngineConfig {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            base_price_usd: pricing.base_price_usd,
            min_update_delta: pricing.min_update_delta,
            ..Default::default()
        }
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_max_consecutive_failures(mut self, rounds: u32) -> Self {
        self.max_consecutive_failures = rounds;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pricing = PricingConfig::default();
        Self {
            base_price_usd: pricing.base_price_usd,
            min_update_delta: pricing.min_update_delta,
            polling_interval: Duration::from_secs(60 * 60),
            max_consecutive_failures: 24,
        }
    }
}

/// Lifecycle of an engine; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

/// Whether `new` lies inside `[last·(1-delta), last·(1+delta)]`.
///
/// Both ends are inclusive, so a move of exactly `delta` is not an update.
pub fn is_within_delta(new: &BigRational, last: &BigRational, delta: &BigRational) -> bool {
    let (low, high) = band(delta);
    *new >= last * low && *new <= last * high
}

/// Keeps the node's pixel price pegged to a USD amount
pub struct PricingEngine {
    config: EngineConfig,
    source: Arc<dyn PriceSource>,
    publisher: Arc<dyn Publisher>,
    state: watch::Sender<EngineState>,
}

impl PricingEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn PriceSource>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            config,
            source,
            publisher,
            state,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Wei per pixel for the given ETH/USD price
    pub fn unit_price(&self, usd_price: &BigRational) -> ConversionResult<BigRational> {
        unit_price(&self.config.base_price_usd, usd_price)
    }

    /// Run on a new task, returning a handle to stop and await it
    pub fn spawn(self) -> EngineHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = self.subscribe_state();
        let task = tokio::spawn(async move { self.run(shutdown_rx).await });
        EngineHandle::new(shutdown_tx, state, task)
    }

    /// Fetch the initial price, then poll until `shutdown` fires or its
    /// sender is dropped.
    ///
    /// Fails if the initial fetch fails or if feeds stay unavailable for
    /// `max_consecutive_failures` rounds.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) -> PricerResult<()> {
        let result = self.run_loop(&mut shutdown).await;
        self.state.send_replace(EngineState::Stopped);
        result
    }

    async fn run_loop(&self, shutdown: &mut oneshot::Receiver<()>) -> PricerResult<()> {
        info!("Starting pricing engine");

        let mut last = self
            .source
            .sample()
            .await
            .map_err(PricerError::InitialFetch)?;
        info!("Initial ETHUSD price {}", format_fixed(&last, 2));
        self.state.send_replace(EngineState::Running);

        let period = self.config.polling_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut failures = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = &mut *shutdown => {
                    info!("Pricing engine shutdown requested");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.poll(&mut last, &mut failures).await?;
                }
            }
        }
    }

    /// One round. Only an exhausted failure budget is an error.
    async fn poll(&self, last: &mut BigRational, failures: &mut u32) -> PricerResult<()> {
        let price = match self.source.sample().await {
            Ok(price) => {
                *failures = 0;
                price
            }
            Err(e) => {
                *failures += 1;
                let limit = self.config.max_consecutive_failures;
                if limit > 0 && *failures >= limit {
                    error!("No ETHUSD price for {} rounds, giving up", failures);
                    return Err(PricerError::FeedsUnavailable {
                        rounds: *failures,
                        last: e,
                    });
                }
                warn!(failures = *failures, "ETHUSD round failed, retrying next tick: {}", e);
                return Ok(());
            }
        };

        if is_within_delta(&price, last, &self.config.min_update_delta) {
            debug!(
                "ETHUSD {} within delta of {}",
                format_fixed(&price, 2),
                format_fixed(last, 2)
            );
            return Ok(());
        }

        info!(
            "ETHUSD price change last={} new={}",
            format_fixed(last, 2),
            format_fixed(&price, 2)
        );
        // last follows the fetched price even if publishing below fails
        *last = price;

        let pixel_price = match self.unit_price(last) {
            Ok(p) => p,
            Err(e) => {
                error!("Unable to compute pixel price: {}", e);
                return Ok(());
            }
        };

        if let Err(e) = self.publisher.publish(&pixel_price).await {
            error!("Price update failed: {}", e);
        }

        Ok(())
    }
}
