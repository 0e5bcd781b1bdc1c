//! HTTP client for the fulfillment inventory API.
//!
//! Wraps `reqwest` with token handling, throttling and typed response
//! decoding. Use [`FulfillmentClient::new`] with credentials from
//! configuration; tests point `base_url` and `auth_url` at a mock server.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use stockrec_core::{FulfillmentCredentials, StockRow};

use crate::auth::TokenManager;
use crate::error::FulfillmentError;
use crate::inventory::normalize_inventory;
use crate::retry::retry_with_backoff;
use crate::types::{InventorySummariesResponse, InventorySummary};

const SUMMARIES_PATH: &str = "fba/inventory/v1/summaries";
const ACCESS_TOKEN_HEADER: &str = "x-amz-access-token";
const RATE_LIMIT_LIMIT_HEADER: &str = "x-amzn-ratelimit-limit";
const RATE_LIMIT_RESET_HEADER: &str = "x-amzn-ratelimit-reset";

/// Limit assumed when the response carries no rate-limit header.
const DEFAULT_RATE_LIMIT: f64 = 15.0;
/// Reset hint assumed when the response carries none.
const DEFAULT_RESET_SECS: u64 = 2;
/// Below this advertised limit the client pauses before the next request.
const LOW_RATE_LIMIT: f64 = 5.0;

const MAX_PAGES: usize = 200;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Client for the fulfillment inventory API.
pub struct FulfillmentClient {
    http: Client,
    base_url: Url,
    marketplace_id: String,
    tokens: TokenManager,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl FulfillmentClient {
    /// Creates a client from configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FulfillmentError::InvalidBaseUrl`] if
    /// `base_url` or `auth_url` does not parse.
    pub fn new(
        credentials: &FulfillmentCredentials,
        user_agent: &str,
    ) -> Result<Self, FulfillmentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(credentials.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends the API path.
        let normalised = format!("{}/", credentials.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| FulfillmentError::InvalidBaseUrl {
            base_url: credentials.base_url.clone(),
            reason: e.to_string(),
        })?;
        let auth_url =
            Url::parse(&credentials.auth_url).map_err(|e| FulfillmentError::InvalidBaseUrl {
                base_url: credentials.auth_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            tokens: TokenManager::new(
                http.clone(),
                auth_url,
                &credentials.client_id,
                &credentials.client_secret,
                &credentials.refresh_token,
            ),
            http,
            base_url,
            marketplace_id: credentials.marketplace_id.clone(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Overrides the retry budget and back-off base.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Current FBA stock as canonical rows.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`FulfillmentClient::fetch_inventory_summaries`].
    pub async fn fetch_stock(&self) -> Result<Vec<StockRow>, FulfillmentError> {
        let summaries = self.fetch_inventory_summaries().await?;
        let rows = normalize_inventory(&summaries);
        tracing::info!(
            summaries = summaries.len(),
            rows = rows.len(),
            "fulfillment stock fetched"
        );
        Ok(rows)
    }

    /// Every inventory summary for the configured marketplace, following
    /// `nextToken` until the listing is exhausted.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::Authentication`] if the token cannot be renewed
    ///   or the request is still rejected after renewal.
    /// - [`FulfillmentError::RateLimited`] / [`FulfillmentError::UnexpectedStatus`]
    ///   once retries are exhausted.
    /// - [`FulfillmentError::PaginationLimit`] if pagination never ends.
    pub async fn fetch_inventory_summaries(
        &self,
    ) -> Result<Vec<InventorySummary>, FulfillmentError> {
        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let url = self.summaries_url(next_token.as_deref())?;
            let response: InventorySummariesResponse =
                retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                    self.authorized_get(&url)
                })
                .await?;
            let (batch, next) = response.into_parts();
            tracing::debug!(page, count = batch.len(), "fetched inventory page");
            summaries.extend(batch);

            match next {
                Some(token) => next_token = Some(token),
                None => return Ok(summaries),
            }
        }

        Err(FulfillmentError::PaginationLimit {
            max_pages: MAX_PAGES,
        })
    }

    fn summaries_url(&self, next_token: Option<&str>) -> Result<Url, FulfillmentError> {
        let mut url =
            self.base_url
                .join(SUMMARIES_PATH)
                .map_err(|e| FulfillmentError::InvalidBaseUrl {
                    base_url: self.base_url.to_string(),
                    reason: e.to_string(),
                })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("granularityType", "Marketplace");
            pairs.append_pair("granularityId", &self.marketplace_id);
            pairs.append_pair("marketplaceIds", &self.marketplace_id);
            pairs.append_pair("details", "true");
            if let Some(token) = next_token {
                pairs.append_pair("nextToken", token);
            }
        }
        Ok(url)
    }

    /// GET with the access token header. A 401 or 403 renews the token once
    /// and repeats the request.
    async fn authorized_get(
        &self,
        url: &Url,
    ) -> Result<InventorySummariesResponse, FulfillmentError> {
        let (token, generation) = self.tokens.current().await?;
        let response = self.send(url, &token).await?;
        if !is_auth_rejection(response.status()) {
            return decode(response, url).await;
        }

        let (token, _) = self.tokens.renew(generation).await?;
        let response = self.send(url, &token).await?;
        if is_auth_rejection(response.status()) {
            return Err(FulfillmentError::Authentication {
                reason: format!("inventory request still rejected with HTTP {}", response.status()),
            });
        }
        decode(response, url).await
    }

    async fn send(&self, url: &Url, token: &str) -> Result<reqwest::Response, FulfillmentError> {
        Ok(self
            .http
            .get(url.clone())
            .header(ACCESS_TOKEN_HEADER, token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?)
    }
}

async fn decode(
    response: reqwest::Response,
    url: &Url,
) -> Result<InventorySummariesResponse, FulfillmentError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FulfillmentError::RateLimited {
            retry_after_secs: reset_secs(response.headers()),
        });
    }
    if !status.is_success() {
        return Err(FulfillmentError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    throttle(response.headers()).await;

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| FulfillmentError::Deserialize {
        context: "inventory summaries".to_owned(),
        source: e,
    })
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Advertised request rate; may be fractional.
fn rate_limit(headers: &HeaderMap) -> f64 {
    header_str(headers, RATE_LIMIT_LIMIT_HEADER)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

fn reset_secs(headers: &HeaderMap) -> u64 {
    header_str(headers, RATE_LIMIT_RESET_HEADER)
        .or_else(|| header_str(headers, reqwest::header::RETRY_AFTER.as_str()))
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RESET_SECS)
}

/// Pauses for the reset window plus one second when the advertised rate
/// drops below [`LOW_RATE_LIMIT`].
async fn throttle(headers: &HeaderMap) {
    if rate_limit(headers) >= LOW_RATE_LIMIT {
        return;
    }
    let wait = reset_secs(headers) + 1;
    tracing::warn!(wait_secs = wait, "fulfillment rate limit low; pausing");
    tokio::time::sleep(Duration::from_secs(wait)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn credentials(base_url: &str) -> FulfillmentCredentials {
        FulfillmentCredentials {
            client_id: "id".to_owned(),
            client_secret: "secret".to_owned(),
            refresh_token: "refresh".to_owned(),
            marketplace_id: "A2Q3Y263D00KWC".to_owned(),
            base_url: base_url.to_owned(),
            auth_url: "https://auth.example.com/o2/token".to_owned(),
            timeout_secs: 5,
        }
    }

    fn test_client(base_url: &str) -> FulfillmentClient {
        FulfillmentClient::new(&credentials(base_url), "stockrec-test/0.1")
            .expect("client construction should not fail")
    }

    #[test]
    fn summaries_url_carries_marketplace_params() {
        let client = test_client("https://sellingpartnerapi-na.amazon.com");
        let url = client.summaries_url(None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sellingpartnerapi-na.amazon.com/fba/inventory/v1/summaries\
             ?granularityType=Marketplace&granularityId=A2Q3Y263D00KWC\
             &marketplaceIds=A2Q3Y263D00KWC&details=true"
        );
    }

    #[test]
    fn summaries_url_appends_encoded_next_token() {
        let client = test_client("https://sellingpartnerapi-na.amazon.com/");
        let url = client.summaries_url(Some("a+b/c=")).unwrap();
        assert!(
            url.as_str().ends_with("&nextToken=a%2Bb%2Fc%3D"),
            "next token should be percent-encoded: {url}"
        );
    }

    #[test]
    fn invalid_auth_url_is_rejected() {
        let mut creds = credentials("https://sellingpartnerapi-na.amazon.com");
        creds.auth_url = "not a url".to_owned();
        let result = FulfillmentClient::new(&creds, "ua");
        assert!(matches!(result, Err(FulfillmentError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn rate_limit_headers_fall_back_to_defaults() {
        let empty = HeaderMap::new();
        assert!((rate_limit(&empty) - DEFAULT_RATE_LIMIT).abs() < f64::EPSILON);
        assert_eq!(reset_secs(&empty), DEFAULT_RESET_SECS);

        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from_static("2.0"));
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("7"));
        assert!((rate_limit(&headers) - 2.0).abs() < f64::EPSILON);
        assert_eq!(reset_secs(&headers), 7);

        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from_static("lots"));
        assert!((rate_limit(&headers) - DEFAULT_RATE_LIMIT).abs() < f64::EPSILON);
    }
}
