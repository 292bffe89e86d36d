//! Price feed aggregator - coordinates multiple feeds
//!
//! Every round asks all feeds at once, drops the ones that fail or time out,
//! takes the median, throws away samples more than the tolerance away from
//! it and takes the median of what is left.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use num_rational::BigRational;
use tracing::{debug, info, warn};

use pixel_pricer_core::{band, ratio, PriceFeedError, PriceFeedResult};

use crate::feeds::ExternalFeed;

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound for a single feed call
    pub feed_timeout: Duration,
    /// Allowed relative distance from the first-pass median
    pub outlier_tolerance: BigRational,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(5),
            outlier_tolerance: ratio(5, 100),
        }
    }
}

/// Robust ETH/USD price across independent feeds
pub struct FeedAggregator {
    config: AggregatorConfig,
    feeds: Vec<Arc<dyn ExternalFeed>>,
}

impl FeedAggregator {
    pub fn new(config: AggregatorConfig, feeds: Vec<Arc<dyn ExternalFeed>>) -> Self {
        Self { config, feeds }
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Ask every feed concurrently, each under its own timeout.
    ///
    /// Results come back in feed order; nothing outlives the call.
    pub async fn sample_feeds(&self) -> Vec<PriceFeedResult<BigRational>> {
        let timeout = self.config.feed_timeout;

        let calls = self.feeds.iter().map(|feed| {
            let feed = Arc::clone(feed);
            async move {
                match tokio::time::timeout(timeout, feed.current_price()).await {
                    Ok(result) => result,
                    Err(_) => Err(PriceFeedError::Timeout(timeout)),
                }
            }
        });

        join_all(calls).await
    }

    /// One polling round: fan out, isolate failures, median, reject
    /// outliers, median again.
    pub async fn sample(&self) -> PriceFeedResult<BigRational> {
        let results = self.sample_feeds().await;

        let mut prices = Vec::with_capacity(results.len());
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(price) => prices.push(price),
                Err(e) => warn!(feed = feed.name(), error = %e, "Unable to get price"),
            }
        }

        let total = prices.len();
        let first_pass = median(&mut prices).ok_or(PriceFeedError::NoSamples)?;

        let mut cleaned = reject_outliers(&prices, &first_pass, &self.config.outlier_tolerance);
        let rejected = total - cleaned.len();
        if rejected > 0 {
            info!(
                "Discarded {} of {} samples around median {}",
                rejected, total, first_pass
            );
        }

        let price = median(&mut cleaned).ok_or(PriceFeedError::NoConsensus(total))?;
        debug!("Round price {} from {} samples", price, cleaned.len());
        Ok(price)
    }
}

/// Median of `prices`, sorting them in place.
///
/// Even counts yield the exact mean of the two middle values. `None` for an
/// empty slice.
pub fn median(prices: &mut [BigRational]) -> Option<BigRational> {
    if prices.is_empty() {
        return None;
    }

    prices.sort();

    let mid = prices.len() / 2;
    if prices.len() % 2 == 1 {
        return Some(prices[mid].clone());
    }

    Some((&prices[mid - 1] + &prices[mid]) * ratio(1, 2))
}

/// Whether `value` lies strictly outside `[median·(1-tol), median·(1+tol)]`
pub fn is_outlier(value: &BigRational, median: &BigRational, tolerance: &BigRational) -> bool {
    let (low, high) = band(tolerance);
    *value < median * low || *value > median * high
}

/// Samples within the tolerance band of `median`, in their original order
pub fn reject_outliers(
    prices: &[BigRational],
    median: &BigRational,
    tolerance: &BigRational,
) -> Vec<BigRational> {
    prices
        .iter()
        .filter(|p| !is_outlier(p, median, tolerance))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pixel_pricer_core::parse_rational;
    use proptest::prelude::*;

    fn r(s: &str) -> BigRational {
        parse_rational(s).unwrap()
    }

    fn tol() -> BigRational {
        ratio(5, 100)
    }

    enum MockFeed {
        Price(BigRational),
        Fails,
        Hangs,
    }

    #[async_trait]
    impl ExternalFeed for MockFeed {
        fn name(&self) -> &str {
            "mock"
        }

        async fn current_price(&self) -> PriceFeedResult<BigRational> {
            match self {
                MockFeed::Price(p) => Ok(p.clone()),
                MockFeed::Fails => Err(PriceFeedError::BadStatus {
                    status: 500,
                    body: "down".to_string(),
                }),
                MockFeed::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(ratio(1, 1))
                }
            }
        }
    }

    fn aggregator(feeds: Vec<MockFeed>) -> FeedAggregator {
        let feeds = feeds
            .into_iter()
            .map(|f| Arc::new(f) as Arc<dyn ExternalFeed>)
            .collect();
        FeedAggregator::new(AggregatorConfig::default(), feeds)
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [r("3"), r("1"), r("2")]), Some(r("2")));
        assert_eq!(median(&mut [r("4"), r("1"), r("3"), r("2")]), Some(r("2.5")));
        assert_eq!(median(&mut [r("7")]), Some(r("7")));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_median_even_is_exact() {
        assert_eq!(median(&mut [r("1"), r("2")]), Some(ratio(3, 2)));
        assert_eq!(median(&mut [r("1/3"), r("1/6")]), Some(ratio(1, 4)));
    }

    #[test]
    fn test_outlier_boundaries() {
        let m = r("100");
        assert!(!is_outlier(&r("95"), &m, &tol()));
        assert!(is_outlier(&r("94.999"), &m, &tol()));
        assert!(!is_outlier(&r("105"), &m, &tol()));
        assert!(is_outlier(&r("105.001"), &m, &tol()));
        assert!(!is_outlier(&r("100"), &m, &tol()));
    }

    #[test]
    fn test_rejection_is_idempotent_on_clean_set() {
        let mut prices = vec![r("90"), r("100"), r("104"), r("105"), r("200")];
        let m = median(&mut prices).unwrap();
        assert_eq!(m, r("104"));

        let mut cleaned = reject_outliers(&prices, &m, &tol());
        assert_eq!(cleaned, vec![r("100"), r("104"), r("105")]);

        let m2 = median(&mut cleaned).unwrap();
        let again = reject_outliers(&cleaned, &m2, &tol());
        assert_eq!(again, cleaned);
    }

    #[tokio::test]
    async fn test_end_to_end_rejects_bad_feed() {
        let agg = aggregator(vec![
            MockFeed::Price(r("1900")),
            MockFeed::Price(r("1950")),
            MockFeed::Price(r("4000")),
        ]);
        assert_eq!(agg.feed_count(), 3);
        assert_eq!(agg.sample().await.unwrap(), r("1925"));
    }

    #[tokio::test]
    async fn test_failed_feed_is_isolated() {
        let agg = aggregator(vec![
            MockFeed::Price(r("2000")),
            MockFeed::Fails,
            MockFeed::Price(r("2010")),
        ]);
        assert_eq!(agg.sample().await.unwrap(), r("2005"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_feed_is_isolated() {
        let agg = aggregator(vec![
            MockFeed::Price(r("2000")),
            MockFeed::Hangs,
            MockFeed::Price(r("2010")),
        ]);

        let results = agg.sample_feeds().await;
        assert!(matches!(results[1], Err(PriceFeedError::Timeout(_))));
        assert_eq!(agg.sample().await.unwrap(), r("2005"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_feeds_down() {
        let agg = aggregator(vec![MockFeed::Hangs, MockFeed::Hangs, MockFeed::Hangs]);
        assert!(matches!(agg.sample().await, Err(PriceFeedError::NoSamples)));

        let agg = aggregator(vec![]);
        assert_eq!(agg.feed_count(), 0);
        assert!(matches!(agg.sample().await, Err(PriceFeedError::NoSamples)));
    }

    #[tokio::test]
    async fn test_no_consensus_between_two_feeds() {
        let agg = aggregator(vec![MockFeed::Price(r("1")), MockFeed::Price(r("100"))]);
        assert!(matches!(agg.sample().await, Err(PriceFeedError::NoConsensus(2))));
    }

    proptest! {
        #[test]
        fn prop_median_splits_samples(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..40)) {
            let mut prices: Vec<BigRational> = values.iter().map(|v| ratio(*v, 100)).collect();
            let m = median(&mut prices).unwrap();

            let below = prices.iter().filter(|p| **p <= m).count();
            let above = prices.iter().filter(|p| **p >= m).count();
            prop_assert!(below * 2 >= prices.len());
            prop_assert!(above * 2 >= prices.len());
            prop_assert!(prices.first().unwrap() <= &m && &m <= prices.last().unwrap());
        }

        // Samples within 2% of a common center are within 5% of any median
        // of theirs, so repeated passes must keep every one of them.
        #[test]
        fn prop_clean_set_survives_repeated_rejection(
            center in 100_000i64..10_000_000,
            offsets in prop::collection::vec(-200i64..=200, 1..25),
        ) {
            let mut prices: Vec<BigRational> = offsets
                .iter()
                .map(|o| ratio(center, 1) * ratio(10_000 + o, 10_000))
                .collect();

            for _ in 0..3 {
                let m = median(&mut prices).unwrap();
                let cleaned = reject_outliers(&prices, &m, &tol());
                prop_assert_eq!(&cleaned, &prices);
                prices = cleaned;
            }
        }

        #[test]
        fn prop_rejection_against_same_median_is_stable(
            values in prop::collection::vec(1i64..1_000_000, 1..40),
        ) {
            let mut prices: Vec<BigRational> = values.iter().map(|v| ratio(*v, 100)).collect();
            let m = median(&mut prices).unwrap();

            let once = reject_outliers(&prices, &m, &tol());
            let twice = reject_outliers(&once, &m, &tol());
            prop_assert_eq!(once, twice);
        }
    }
}
