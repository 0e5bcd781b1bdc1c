//! Access token cell for the fulfillment API.
//!
//! The long-lived refresh token comes from configuration; access tokens are
//! minted from it on first use and again whenever a request is rejected.
//! As with the marketplace session, renewal is keyed on a generation counter
//! so concurrent rejections trigger one token request.

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::FulfillmentError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    generation: u64,
}

pub(crate) struct TokenManager {
    http: Client,
    auth_url: Url,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub(crate) fn new(
        http: Client,
        auth_url: Url,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Self {
        Self {
            http,
            auth_url,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            refresh_token: refresh_token.to_owned(),
            state: Mutex::new(TokenState::default()),
        }
    }

    pub(crate) async fn current(&self) -> Result<(String, u64), FulfillmentError> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.access_token {
            return Ok((token.clone(), state.generation));
        }
        self.refresh(&mut state).await
    }

    /// Replaces the token of generation `observed` unless another caller
    /// already did.
    pub(crate) async fn renew(&self, observed: u64) -> Result<(String, u64), FulfillmentError> {
        let mut state = self.state.lock().await;
        if state.generation != observed {
            if let Some(token) = &state.access_token {
                return Ok((token.clone(), state.generation));
            }
        }
        tracing::warn!(generation = observed, "fulfillment access token rejected; renewing");
        self.refresh(&mut state).await
    }

    async fn refresh(&self, state: &mut TokenState) -> Result<(String, u64), FulfillmentError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let response = self
            .http
            .post(self.auth_url.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "fulfillment token renewal failed");
            return Err(FulfillmentError::Authentication {
                reason: format!("token endpoint returned HTTP {status}"),
            });
        }

        let body = response.text().await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| FulfillmentError::Deserialize {
                context: "token response".to_owned(),
                source: e,
            })?;

        state.generation += 1;
        state.access_token = Some(token.access_token.clone());
        tracing::info!("fulfillment access token renewed");
        Ok((token.access_token, state.generation))
    }
}
