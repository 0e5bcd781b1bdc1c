//! Authenticated HTTP session for the marketplace REST API.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use stockrec_core::MarketplaceCredentials;

use crate::auth::TokenManager;
use crate::error::MarketplaceError;
use crate::rate_limit::retry_once_when_rate_limited;
use crate::shipments::ShipmentCostCache;

/// Wait assumed when a 429 response carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Maximum number of offset pages fetched by any paginated listing.
pub(crate) const MAX_PAGES: usize = 400;

/// One marketplace session.
///
/// Owns the HTTP connection pool, the bearer token cell and the shipment
/// cost cache, so nothing leaks between sessions. Create one per command run
/// and share it by reference across concurrent lookups.
pub struct MarketplaceClient {
    pub(crate) http: Client,
    pub(crate) base_url: Url,
    pub(crate) seller_id: String,
    pub(crate) tokens: TokenManager,
    pub(crate) shipment_cache: ShipmentCostCache,
    pub(crate) shipment_timeout: Duration,
    pub(crate) shipment_concurrency: usize,
    max_rate_limit_wait_secs: u64,
}

impl MarketplaceClient {
    /// Builds a session against `credentials.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`MarketplaceError::InvalidBaseUrl`] if the
    /// configured base URL does not parse.
    pub fn new(
        credentials: &MarketplaceCredentials,
        user_agent: &str,
    ) -> Result<Self, MarketplaceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(credentials.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", credentials.base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|e| MarketplaceError::InvalidBaseUrl {
                base_url: credentials.base_url.clone(),
                reason: e.to_string(),
            })?;
        let token_url = join(&base_url, "oauth/token")?;

        Ok(Self {
            tokens: TokenManager::new(
                http.clone(),
                token_url,
                &credentials.client_id,
                &credentials.client_secret,
            ),
            http,
            base_url,
            seller_id: credentials.seller_id.clone(),
            shipment_cache: ShipmentCostCache::new(Duration::from_secs(
                credentials.shipment_cache_ttl_secs,
            )),
            shipment_timeout: Duration::from_secs(credentials.shipment_timeout_secs),
            shipment_concurrency: credentials.shipment_concurrency.max(1),
            max_rate_limit_wait_secs: credentials.max_rate_limit_wait_secs,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, MarketplaceError> {
        join(&self.base_url, path)
    }

    /// Authorized GET returning a decoded JSON body.
    ///
    /// A 401 renews the token once (single-flight) and repeats the request;
    /// a 429 waits for the reset hint and repeats the whole exchange once.
    /// `timeout` overrides the session-wide request timeout.
    ///
    /// # Errors
    ///
    /// - [`MarketplaceError::Authentication`] if still unauthorized after renewal.
    /// - [`MarketplaceError::RateLimited`] if the retry is rate limited as well.
    /// - [`MarketplaceError::NotFound`] / [`MarketplaceError::UnexpectedStatus`]
    ///   for other non-2xx statuses.
    /// - [`MarketplaceError::Http`] on network failure or timeout.
    /// - [`MarketplaceError::Deserialize`] if the body does not match `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
        timeout: Option<Duration>,
    ) -> Result<T, MarketplaceError> {
        retry_once_when_rate_limited(self.max_rate_limit_wait_secs, || {
            self.authorized_get(url, context, timeout)
        })
        .await
    }

    async fn authorized_get<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
        timeout: Option<Duration>,
    ) -> Result<T, MarketplaceError> {
        let (token, generation) = self.tokens.current().await?;
        let response = self.send(url, &token, timeout).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response, url, context).await;
        }

        let (token, _) = self.tokens.renew(generation).await?;
        let response = self.send(url, &token, timeout).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(MarketplaceError::Authentication {
                reason: format!("{context} still unauthorized after token renewal"),
            });
        }
        decode(response, url, context).await
    }

    async fn send(
        &self,
        url: &Url,
        token: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, MarketplaceError> {
        let mut request = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        Ok(request.send().await?)
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    url: &Url,
    context: &str,
) -> Result<T, MarketplaceError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(MarketplaceError::RateLimited {
            endpoint: url.path().to_owned(),
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(MarketplaceError::NotFound {
            url: url.to_string(),
        });
    }

    if !status.is_success() {
        return Err(MarketplaceError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| MarketplaceError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

fn join(base: &Url, path: &str) -> Result<Url, MarketplaceError> {
    base.join(path)
        .map_err(|e| MarketplaceError::InvalidBaseUrl {
            base_url: base.to_string(),
            reason: format!("cannot join \"{path}\": {e}"),
        })
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
