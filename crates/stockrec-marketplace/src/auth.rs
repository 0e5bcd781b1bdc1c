//! Bearer token cell for the marketplace API.
//!
//! One [`TokenManager`] is owned by each client session. The token is
//! acquired lazily with the `client_credentials` grant and renewed in place
//! with the `refresh_token` grant when a request comes back unauthorized.
//!
//! Renewal is single-flight: every token handed out carries the generation it
//! belongs to, and [`TokenManager::renew`] only talks to the token endpoint if
//! no other caller has already replaced that generation. Concurrent callers
//! queue on the same lock and pick up the freshly renewed token.

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::MarketplaceError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    generation: u64,
}

pub(crate) struct TokenManager {
    http: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub(crate) fn new(http: Client, token_url: Url, client_id: &str, client_secret: &str) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Returns the current access token and its generation, authenticating
    /// first if no token is held yet.
    pub(crate) async fn current(&self) -> Result<(String, u64), MarketplaceError> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.access_token {
            return Ok((token.clone(), state.generation));
        }
        self.authenticate(&mut state).await
    }

    /// Replaces the token of generation `observed`.
    ///
    /// If the generation already moved on, the newer token is returned
    /// without another round-trip to the token endpoint.
    pub(crate) async fn renew(&self, observed: u64) -> Result<(String, u64), MarketplaceError> {
        let mut state = self.state.lock().await;
        if state.generation != observed {
            if let Some(token) = &state.access_token {
                return Ok((token.clone(), state.generation));
            }
        }

        let Some(refresh_token) = state.refresh_token.clone() else {
            tracing::info!("no refresh token held; re-authenticating");
            return self.authenticate(&mut state).await;
        };

        tracing::warn!(generation = observed, "access token rejected; renewing");
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let response = self.request_token(&form).await?;
        Ok(Self::store(&mut state, response))
    }

    async fn authenticate(
        &self,
        state: &mut TokenState,
    ) -> Result<(String, u64), MarketplaceError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self.request_token(&form).await?;
        tracing::info!("marketplace authentication succeeded");
        Ok(Self::store(state, response))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, MarketplaceError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "token endpoint rejected credentials");
            return Err(MarketplaceError::Authentication {
                reason: format!("token endpoint returned HTTP {status}"),
            });
        }
        let body = response.text().await?;
        serde_json::from_str::<TokenResponse>(&body).map_err(|e| MarketplaceError::Deserialize {
            context: "token response".to_owned(),
            source: e,
        })
    }

    fn store(state: &mut TokenState, response: TokenResponse) -> (String, u64) {
        state.generation += 1;
        state.access_token = Some(response.access_token.clone());
        if response.refresh_token.is_some() {
            state.refresh_token = response.refresh_token;
        }
        (response.access_token, state.generation)
    }
}
