/// Error taxonomy for the fetch pipeline and the watchlist.
///
/// Expected upstream failures (rate limiting, connectivity, bad payloads)
/// never escape to the consumer as errors: the fetch pipeline degrades them
/// into stale or pending outcomes. Only configuration-class errors, where a
/// retry cannot help, are surfaced as `Err`.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Upstream answered HTTP 429. Retried a bounded number of times by the
    /// resource fetcher before counting as a failure.
    #[error("rate limited by upstream")]
    RateLimited,

    /// Transport-level failure (connect, TLS, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-2xx status other than 429.
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The response body did not match the expected schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The requested blockchain network is not in the registry. Fails fast:
    /// no retry, no cache fallback.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The scheduler dropped the completion channel before settling it.
    #[error("request dropped before completion: {0}")]
    Canceled(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }

    /// Configuration-class errors where retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::UnsupportedNetwork(_))
    }
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("coin already tracked: {0}")]
    Duplicate(String),

    #[error("invalid contract address for network {network}: {contract}")]
    InvalidContract { network: String, contract: String },

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("invalid url in field {field}: {value}")]
    InvalidUrl { field: String, value: String },

    #[error("watchlist io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watchlist parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
