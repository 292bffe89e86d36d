//! Error types

use std::time::Duration;

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid number {input:?}: {reason}")]
    InvalidNumber { input: String, reason: String },
}

/// Decimal to smallest-unit conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("USD price is zero")]
    ZeroPrice,

    #[error("submitted value {0} is not a valid float")]
    NotAFloat(String),

    #[error("submitted value has more than {max} decimals")]
    TooManyDecimals { max: usize },

    #[error("unable to convert {0} into an integer")]
    Unparseable(String),
}

/// Price feed errors
#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Timeout after {0:?} waiting for data")]
    Timeout(Duration),

    #[error("No feed returned a price")]
    NoSamples,

    #[error("All {0} samples were rejected as outliers")]
    NoConsensus(usize),
}

/// Node publishing errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Node responded with status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("Role discovery response is not a JSON boolean: {0}")]
    InvalidRole(String),
}

/// Pricing engine errors
#[derive(Debug, Error)]
pub enum PricerError {
    #[error("Initial price fetch failed: {0}")]
    InitialFetch(#[source] PriceFeedError),

    #[error("No price for {rounds} consecutive rounds, last error: {last}")]
    FeedsUnavailable {
        rounds: u32,
        #[source]
        last: PriceFeedError,
    },

    #[error("Engine task failed: {0}")]
    Task(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type ConversionResult<T> = Result<T, ConversionError>;
pub type PriceFeedResult<T> = Result<T, PriceFeedError>;
pub type PublishResult<T> = Result<T, PublishError>;
pub type PricerResult<T> = Result<T, PricerError>;
