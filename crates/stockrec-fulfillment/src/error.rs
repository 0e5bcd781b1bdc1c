use thiserror::Error;

/// Errors returned by the fulfillment inventory client.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint refused the refresh token, or a request was still
    /// rejected after renewing the access token.
    #[error("fulfillment authentication failed: {reason}")]
    Authentication { reason: String },

    /// HTTP 429 from the inventory endpoint.
    #[error("fulfillment API rate limited; reset in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    /// `nextToken` kept coming back after `max_pages` pages.
    #[error("inventory pagination did not terminate after {max_pages} pages")]
    PaginationLimit { max_pages: usize },
}

impl FulfillmentError {
    /// `true` for timeouts and connection failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
