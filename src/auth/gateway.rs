use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::request::{ApiRequest, ApiResponse};
use super::session::Session;
use crate::storage::keys::{ACCESS_TOKEN, REFRESH_TOKEN};
use crate::storage::{KeyValueStore, StorageError};
use crate::util::{resolve_endpoint, EndpointError};

const REFRESH_PATH: &str = "/api/refresh";

// ============================================================================
// Error Types
// ============================================================================

/// Failures that stop a request outright.
///
/// An expired or missing session is not an error: it comes back as
/// [`Outcome::SessionMissing`] or [`Outcome::Unauthorized`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (DNS, connect, TLS, timeout, reset).
    /// Never treated as a 401 and never triggers a refresh.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The local store could not be read or updated
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// The request path or configured base URL is unusable
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
    /// The stored token contains bytes not allowed in a header
    #[error("Stored access token cannot be sent as a header")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
}

/// Why a token refresh did not produce a token.
#[derive(Debug, Error)]
enum RefreshError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Malformed refresh response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Refresh response carried an empty access token")]
    EmptyToken,
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of an authenticated request that reached a conclusion.
#[derive(Debug)]
pub enum Outcome {
    /// The server answered. Either the first response was not a 401, or it
    /// was and this is the single retry after a successful refresh (whatever
    /// its status, including a second 401).
    Completed(ApiResponse),
    /// The server answered 401 and the session could not be recovered. The
    /// stored session has been torn down; this is the original response.
    Unauthorized(ApiResponse),
    /// No access token was stored. The session was torn down and nothing was
    /// sent.
    SessionMissing,
}

impl Outcome {
    /// The server response, if one was received.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Outcome::Completed(r) | Outcome::Unauthorized(r) => Some(r),
            Outcome::SessionMissing => None,
        }
    }

    pub fn into_response(self) -> Option<ApiResponse> {
        match self {
            Outcome::Completed(r) | Outcome::Unauthorized(r) => Some(r),
            Outcome::SessionMissing => None,
        }
    }

    /// True when the caller should prompt for a new login.
    pub fn needs_login(&self) -> bool {
        !matches!(self, Outcome::Completed(_))
    }

    /// True for a completed response with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed(r) if r.is_success())
    }
}

/// What a single send produced, before any recovery.
enum Attempt {
    Accepted(ApiResponse),
    NeedsRefresh(ApiResponse),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

// ============================================================================
// AuthGateway
// ============================================================================

/// Sends requests that need a bearer token and recovers from one expired
/// access token per request.
///
/// A request moves through at most three steps: the initial attempt, a
/// refresh if that attempt was answered with 401, and one retry with the new
/// token. The retry's response is final.
#[derive(Clone)]
pub struct AuthGateway<S> {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) store: S,
}

impl<S: KeyValueStore> AuthGateway<S> {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, store: S) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request` with the stored access token attached.
    ///
    /// # Behavior
    ///
    /// - No stored access token: session torn down, nothing sent,
    ///   `Outcome::SessionMissing`.
    /// - Any status except 401: returned unchanged as `Outcome::Completed`.
    /// - 401 with no stored refresh token, or a failed refresh: session torn
    ///   down, original response returned as `Outcome::Unauthorized`.
    /// - 401 with a successful refresh: the identical request is resent
    ///   once with the new token and that response is `Outcome::Completed`.
    ///
    /// # Errors
    ///
    /// Transport failures surface as `GatewayError::Network` without
    /// touching the session.
    pub async fn send(&self, request: &ApiRequest) -> Result<Outcome, GatewayError> {
        let Some(access_token) = self.stored_secret(ACCESS_TOKEN).await? else {
            tracing::info!(path = %request.path(), "No access token stored, session expired");
            Session::clear(&self.store).await?;
            return Ok(Outcome::SessionMissing);
        };

        let url = resolve_endpoint(&self.base_url, request.path())?;

        let rejected = match self.attempt(request, &url, &access_token).await? {
            Attempt::Accepted(response) => return Ok(Outcome::Completed(response)),
            Attempt::NeedsRefresh(response) => response,
        };

        tracing::debug!(path = %request.path(), "Access token rejected, refreshing");
        let Some(refresh_token) = self.stored_secret(REFRESH_TOKEN).await? else {
            tracing::info!("No refresh token stored, session expired");
            Session::clear(&self.store).await?;
            return Ok(Outcome::Unauthorized(rejected));
        };

        let Some(new_token) = self.refresh_with(&refresh_token).await? else {
            return Ok(Outcome::Unauthorized(rejected));
        };

        // Single retry; its status is not inspected again.
        let response = self.dispatch(request, &url, &new_token).await?;
        tracing::debug!(
            path = %request.path(),
            status = response.status().as_u16(),
            "Retried request after token refresh"
        );
        Ok(Outcome::Completed(response))
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `Ok(None)` (with the session torn down) when no refresh token
    /// is stored or the exchange fails for any reason.
    pub async fn refresh_access_token(&self) -> Result<Option<SecretString>, GatewayError> {
        match self.stored_secret(REFRESH_TOKEN).await? {
            Some(refresh_token) => self.refresh_with(&refresh_token).await,
            None => {
                Session::clear(&self.store).await?;
                Ok(None)
            }
        }
    }

    /// One call to the refresh endpoint. On success the new access token is
    /// persisted (the refresh token is left as is); on any failure the
    /// session is torn down. Never retried.
    async fn refresh_with(
        &self,
        refresh_token: &SecretString,
    ) -> Result<Option<SecretString>, GatewayError> {
        match self.request_access_token(refresh_token).await {
            Ok(token) => {
                self.store
                    .set(ACCESS_TOKEN, token.expose_secret())
                    .await?;
                tracing::debug!("Access token refreshed");
                Ok(Some(token))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                Session::clear(&self.store).await?;
                Ok(None)
            }
        }
    }

    async fn request_access_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<SecretString, RefreshError> {
        let url = resolve_endpoint(&self.base_url, REFRESH_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RefreshError::HttpStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: RefreshResponse = serde_json::from_slice(&body)?;
        if parsed.access_token.is_empty() {
            return Err(RefreshError::EmptyToken);
        }
        Ok(SecretString::from(parsed.access_token))
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: &SecretString,
    ) -> Result<Attempt, GatewayError> {
        let response = self.dispatch(request, url, token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(Attempt::NeedsRefresh(response))
        } else {
            Ok(Attempt::Accepted(response))
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: &SecretString,
    ) -> Result<ApiResponse, GatewayError> {
        let response = request
            .build(&self.client, url.clone(), token)?
            .send()
            .await?;
        Ok(ApiResponse::read(response).await?)
    }

    async fn stored_secret(&self, key: &str) -> Result<Option<SecretString>, StorageError> {
        Ok(self
            .store
            .get(key)
            .await?
            .filter(|value| !value.is_empty())
            .map(SecretString::from))
    }
}
