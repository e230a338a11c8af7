//! OAuth authorization-code exchange against the billing provider.
//!
//! Every outbound call runs under a hard timeout (`provider.timeout_secs`,
//! 20s by default). When it elapses the in-flight request is dropped and
//! `ProviderError::Timeout` is returned.

use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider request failed: {0}")]
    Network(String),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected provider response: {0}")]
    Parse(String),
}

/// Tokens returned by a successful code exchange.
#[derive(Clone, Deserialize)]
pub struct ProviderTokens {
    pub access_token: SecretString,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<String>,
}

impl std::fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Account owner as reported by the provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderUser {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Accepts string or numeric ids.
fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.and_then(id_string))
}

fn required_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    id_string(Value::deserialize(de)?).ok_or_else(|| serde::de::Error::custom("missing user id"))
}

pub struct ProviderOAuthClient {
    http: reqwest::Client,
    token_url: String,
    user_info_url: String,
    client_id: String,
    client_secret: SecretString,
    timeout: Duration,
}

impl ProviderOAuthClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: config.token_url.clone(),
            user_info_url: config.user_info_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout: config.timeout(),
        }
    }

    /// Overrides the configured call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trades an authorization code for provider tokens.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let request = self.http.post(&self.token_url).form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
        ]);

        self.bounded(async {
            let response = request.send().await.map_err(network)?;
            read_json(response).await
        })
        .await
    }

    /// Fetches the account owner for an access token.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_user_info(
        &self,
        access_token: &SecretString,
    ) -> Result<ProviderUser, ProviderError> {
        let request = self.http.get(&self.user_info_url).header(
            AUTHORIZATION,
            format!("Bearer {}", access_token.expose_secret()),
        );

        self.bounded(async {
            let response = request.send().await.map_err(network)?;
            read_json(response).await
        })
        .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Provider call timed out");
                Err(ProviderError::Timeout(self.timeout))
            }
        }
    }
}

fn network(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.to_string())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}
