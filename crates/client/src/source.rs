//! Where a [`SettingsContext`](crate::SettingsContext) reads and writes settings.

use std::collections::BTreeMap;

use async_trait::async_trait;
use domain::models::{BatchUpdateOutcome, SettingEntry, SettingsQuery};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ClientError;

const CSRF_HEADER: &str = "X-CSRF-Token";

/// Backend holding the settings of a session.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Every setting as `key -> raw value`.
    async fn fetch_all(&self, query: &SettingsQuery)
        -> Result<BTreeMap<String, String>, ClientError>;

    async fn batch_update(&self, entries: &[SettingEntry])
        -> Result<BatchUpdateOutcome, ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// [`SettingsSource`] backed by the settings HTTP API.
///
/// The most recent `X-CSRF-Token` response header is remembered and sent with
/// every write. When no token has been seen yet, one is fetched from the
/// liveness endpoint first.
pub struct HttpSettingsSource {
    client: Client,
    base_url: String,
    admin_token: Option<String>,
    csrf_token: RwLock<Option<String>>,
}

impl HttpSettingsSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Uses a preconfigured client, e.g. one with a request timeout.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            admin_token: None,
            csrf_token: RwLock::new(None),
        }
    }

    /// Sends `Authorization: Bearer <token>` on writes.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The last token received from the server, if any.
    pub async fn csrf_token(&self) -> Option<String> {
        self.csrf_token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn remember_csrf_token(&self, response: &Response) {
        let token = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|t| !t.is_empty());

        if let Some(token) = token {
            *self.csrf_token.write().await = Some(token.to_string());
        }
    }

    async fn ensure_csrf_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.csrf_token().await {
            return Ok(token);
        }

        debug!("No CSRF token cached, requesting one");
        let response = self.client.get(self.url("/api/health/live")).send().await?;
        self.remember_csrf_token(&response).await;

        // An empty token is rejected server-side with CSRF_TOKEN_MISSING
        Ok(self.csrf_token().await.unwrap_or_default())
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        self.remember_csrf_token(&response).await;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorEnvelope = response.json().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                code: body.error,
                message: body.message,
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl SettingsSource for HttpSettingsSource {
    async fn fetch_all(
        &self,
        query: &SettingsQuery,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let response = self
            .client
            .get(self.url("/api/v1/settings"))
            .query(query)
            .send()
            .await?;

        self.parse(response).await
    }

    async fn batch_update(
        &self,
        entries: &[SettingEntry],
    ) -> Result<BatchUpdateOutcome, ClientError> {
        let csrf_token = self.ensure_csrf_token().await?;

        let mut request = self
            .client
            .post(self.url("/api/v1/settings/batch"))
            .header(CSRF_HEADER, csrf_token)
            .json(entries);
        if let Some(token) = &self.admin_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        self.parse(response).await
    }
}
