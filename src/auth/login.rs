use serde::Serialize;
use thiserror::Error;

use super::gateway::AuthGateway;
use super::request::ApiResponse;
use super::session::{Session, TokenGrant};
use crate::storage::{KeyValueStore, StorageError};
use crate::util::{resolve_endpoint, EndpointError};

const LOGIN_PATH: &str = "/api/login";

#[derive(Debug, Error)]
pub enum LoginError {
    /// The server refused the credentials; carries its message.
    #[error("Login failed: {0}")]
    Rejected(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed login response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email_or_username: &'a str,
    password: &'a str,
}

impl<S: KeyValueStore> AuthGateway<S> {
    /// Exchange credentials for a session and persist it.
    pub async fn login(&self, email_or_username: &str, password: &str) -> Result<Session, LoginError> {
        let url = resolve_endpoint(&self.base_url, LOGIN_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&LoginRequest {
                email_or_username,
                password,
            })
            .send()
            .await?;
        let response = ApiResponse::read(response).await?;

        if !response.is_success() {
            let message = response.error_message();
            tracing::info!(status = response.status().as_u16(), "Login rejected");
            return Err(LoginError::Rejected(message));
        }

        let session = Session::from(response.json::<TokenGrant>()?);
        session.save(&self.store).await?;
        tracing::info!(user_id = session.user_id(), "Logged in");
        Ok(session)
    }

    /// Forget the stored session.
    pub async fn logout(&self) -> Result<(), StorageError> {
        Session::clear(&self.store).await
    }

    /// The stored session, if complete.
    pub async fn session(&self) -> Result<Option<Session>, StorageError> {
        Session::load(&self.store).await
    }
}
