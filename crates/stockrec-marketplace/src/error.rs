use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials were rejected, or a request was still unauthorized after
    /// one token renewal.
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited on {endpoint} (retry after {retry_after_secs}s)")]
    RateLimited {
        endpoint: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed {context}: {reason}")]
    MalformedRecord { context: String, reason: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("invalid date \"{input}\": expected DD/MM/YYYY or YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("pagination limit reached for {endpoint}: exceeded {max_pages} pages")]
    PaginationLimit { endpoint: String, max_pages: usize },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl MarketplaceError {
    /// Connection failures and timeouts. These surface to the caller as-is;
    /// only rate limiting and expired credentials are retried internally.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            MarketplaceError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
