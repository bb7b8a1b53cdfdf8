//! REST adapters for the remote backend.
//!
//! Every repository contract is implemented by [`ApiClient`], which attaches
//! the bearer token from the shared [`TokenStore`] and maps HTTP failures onto
//! [`StorageError`].

use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::repository::{MemoryTokenStore, Storage, StorageError, TokenStore};

mod auth;
mod category_repo;
mod flashcard_repo;
mod mapping;
mod session_summary_repo;

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiConfigError {
    #[error("invalid FLASHENG_API_URL value: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid FLASHENG_API_TIMEOUT_SECS value: {0}")]
    InvalidTimeout(String),

    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Connection settings for the REST backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Read `FLASHENG_API_URL` and `FLASHENG_API_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError` when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ApiConfigError> {
        let base_url = env::var("FLASHENG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let timeout = match env::var("FLASHENG_API_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiConfigError::InvalidTimeout(raw.clone()))?;
                if secs == 0 {
                    return Err(ApiConfigError::InvalidTimeout(raw));
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Self::new(base_url, timeout)
    }

    /// Build a config, normalizing the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError::InvalidBaseUrl` unless the URL is http(s).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiConfigError> {
        let raw = base_url.into();
        let trimmed = raw.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiConfigError::InvalidBaseUrl(raw));
        }
        Ok(Self {
            base_url: trimmed.to_owned(),
            timeout,
        })
    }
}

/// HTTP client shared by all REST repositories.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiConfigError::Client` if the TLS backend cannot be initialized.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(self.url(path)))
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.put(self.url(path)))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.delete(self.url(path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StorageError> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, StorageError> {
        let request = request
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().path().to_owned();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;
        tracing::debug!(%method, path = %url, status = status.as_u16(), "api response");

        if status.is_success() {
            return Ok(body.to_vec());
        }
        if status == StatusCode::UNAUTHORIZED {
            // The token is dead either way; drop it so the next check starts clean.
            self.tokens.clear();
        }
        let error = status_error(status, &body);
        tracing::warn!(%method, path = %url, %error, "api request failed");
        Err(error)
    }
}

/// Map a non-2xx response onto a `StorageError`, using the body's `error` message.
fn status_error(status: StatusCode, body: &[u8]) -> StorageError {
    let message = mapping::error_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());
    match status {
        StatusCode::UNAUTHORIZED => StorageError::Unauthorized,
        StatusCode::FORBIDDEN => StorageError::Forbidden,
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict(message),
        // The backend reports duplicate signups as a plain 400.
        StatusCode::BAD_REQUEST if message.contains("already exists") => {
            StorageError::Conflict(message)
        }
        _ => StorageError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

impl Storage {
    /// Build a `Storage` backed by the REST API.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError` if the HTTP client cannot be constructed.
    pub fn http(config: &ApiConfig) -> Result<Self, ApiConfigError> {
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let client = Arc::new(ApiClient::new(config, Arc::clone(&tokens))?);
        Ok(Self {
            categories: client.clone(),
            flashcards: client.clone(),
            session_summaries: client.clone(),
            identity: client,
            tokens,
        })
    }
}
