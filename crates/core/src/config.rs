//! Configuration types

use num_rational::BigRational;
use num_traits::Signed;

use crate::errors::{CoreError, CoreResult};
use crate::types::{parse_rational, ratio};

/// Operators quote their price per this many pixels
pub const PIXELS_PER_QUOTE: i64 = 1_000_000;

/// Default USD price per million pixels
pub const DEFAULT_PRICE_PER_MILLION: &str = "0.0002";

/// Default minimum ETH/USD move that triggers an update
pub const DEFAULT_PRICE_DELTA: &str = "0.05";

/// Validated pricing parameters, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// USD charged per pixel
    pub base_price_usd: BigRational,
    /// Fraction of the last price inside which no update is sent
    pub min_update_delta: BigRational,
}

impl PricingConfig {
    /// Build from operator strings: a USD price per million pixels and a
    /// delta fraction such as `"0.05"`.
    pub fn from_strings(price_per_million: &str, min_update_delta: &str) -> CoreResult<Self> {
        let per_million = parse_rational(price_per_million).map_err(|e| {
            CoreError::InvalidConfig(format!("provided price is not a valid float string: {e}"))
        })?;
        if per_million.is_negative() {
            return Err(CoreError::InvalidConfig(format!(
                "price must not be negative: {price_per_million}"
            )));
        }

        let delta = parse_rational(min_update_delta).map_err(|e| {
            CoreError::InvalidConfig(format!("provided price delta is not a valid float string: {e}"))
        })?;
        if delta.is_negative() {
            return Err(CoreError::InvalidConfig(format!(
                "price delta must not be negative: {min_update_delta}"
            )));
        }

        Ok(Self {
            base_price_usd: per_million * ratio(1, PIXELS_PER_QUOTE),
            min_update_delta: delta,
        })
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price_usd: ratio(2, 10_000) * ratio(1, PIXELS_PER_QUOTE),
            min_update_delta: ratio(5, 100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_default_strings() {
        let parsed = PricingConfig::from_strings(DEFAULT_PRICE_PER_MILLION, DEFAULT_PRICE_DELTA).unwrap();
        assert_eq!(parsed, PricingConfig::default());
    }

    #[test]
    fn test_price_is_per_pixel() {
        let config = PricingConfig::from_strings("2", "0.1").unwrap();
        assert_eq!(config.base_price_usd, ratio(2, 1_000_000));
        assert_eq!(config.min_update_delta, ratio(1, 10));
    }

    #[test]
    fn test_invalid_strings() {
        assert!(matches!(
            PricingConfig::from_strings("cheap", "0.05"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            PricingConfig::from_strings("0.0002", "five"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(PricingConfig::from_strings("-1", "0.05").is_err());
        assert!(PricingConfig::from_strings("1", "-0.05").is_err());
    }
}
