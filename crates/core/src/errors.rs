//! Error types

use thiserror::Error;

use crate::Pair;

/// Data errors, carried inside a [`Point`](crate::Point) rather than returned
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("data point is not set")]
    NotSet,

    #[error("data point is expired: {age_secs}s old, expiry is {expiry_secs}s")]
    Expired { age_secs: u64, expiry_secs: u64 },

    #[error("data point is older than the cached one")]
    Outdated,

    #[error("node has no child")]
    NoChild,

    #[error("value is not set")]
    MissingValue,

    #[error("time is not set")]
    MissingTime,

    #[error("invalid pair: {0}")]
    InvalidPair(String),

    #[error("invalid tick: {0}")]
    InvalidTick(String),

    #[error("invalid number: {0}")]
    InvalidNumber(f64),

    #[error("unexpected value: expected {expected}, got {got}")]
    UnexpectedValue { expected: &'static str, got: String },

    #[error("not enough values: got {got}, need at least {min}")]
    NotEnoughValues { got: usize, min: usize },

    #[error("pair mismatch: expected {expected}, got {got}")]
    PairMismatch { expected: Pair, got: Pair },

    #[error("hops are not contiguous: {left} and {right}")]
    NotContiguous { left: Pair, right: Pair },

    #[error("deviation {deviation} exceeds threshold {threshold}")]
    DeviationExceeded { deviation: f64, threshold: f64 },

    #[error("deviation of {reference} from {value} is undefined")]
    UndefinedDeviation { value: f64, reference: f64 },

    #[error("origin error: {0}")]
    Origin(String),
}

/// Graph construction errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{node} node accepts at most {max} children")]
    Arity { node: &'static str, max: usize },

    #[error("{0} node does not accept children after construction")]
    Sealed(&'static str),

    #[error("minimum number of values must be greater than zero")]
    InvalidMin,

    #[error("freshness threshold {freshness_secs}s exceeds expiry threshold {expiry_secs}s")]
    InvalidThreshold { freshness_secs: u64, expiry_secs: u64 },

    #[error("cycle detected: {0}")]
    Cycle(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model defined more than once: {0}")]
    DuplicateModel(String),

    #[error("invalid graph configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unable to parse graph definition: {0}")]
    Parse(String),

    #[error("unsupported graph definition format: {0}")]
    UnsupportedFormat(String),

    #[error("unable to read graph definition: {0}")]
    Io(#[from] std::io::Error),
}

/// Origin transport and runtime errors
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("fetch timed out after {0}ms")]
    Timeout(u64),

    #[error("origin panicked: {0}")]
    Panicked(String),
}

/// Updater input contract errors
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("origin not registered: {0}")]
    UnknownOrigin(String),
}

/// Provider call errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("pair/model not found: {0}")]
    ModelNotFound(String),

    #[error("update failed: {0}")]
    Update(#[from] UpdateError),
}

/// Result type alias
pub type DataResult<T> = Result<T, DataError>;
pub type GraphResult<T> = Result<T, GraphError>;
pub type OriginResult<T> = Result<T, OriginError>;
pub type UpdateResult<T> = Result<T, UpdateError>;
pub type ProviderResult<T> = Result<T, ProviderError>;
