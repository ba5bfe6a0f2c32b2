//! HTTP transport for wizard requests.
//!
//! `WizardTransport` is the seam between the controller and the network;
//! `HttpTransport` is the reqwest-backed implementation. Replies carry raw
//! JSON; normalization happens in the controller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::WizardConfig;
use crate::error::TransportError;

/// Form-encoded key/value payload for a step submission. Field
/// serialization itself is a collaborator concern; the transport only
/// forwards the flat pairs.
pub type FormPayload = Vec<(String, String)>;

pub type TransportResult = Result<Value, TransportError>;

/// The injected HTTP client abstraction. Paths are logical (`data`, `prev`,
/// `goto/b|x`, ...); the implementation resolves them against the configured
/// wizard root.
#[async_trait]
pub trait WizardTransport: Send + Sync {
    async fn get_json(&self, path: &str) -> TransportResult;

    async fn post_json(&self, path: &str, form: Option<&FormPayload>) -> TransportResult;
}

#[async_trait]
impl<T: WizardTransport + ?Sized> WizardTransport for Arc<T> {
    async fn get_json(&self, path: &str) -> TransportResult {
        (**self).get_json(path).await
    }

    async fn post_json(&self, path: &str, form: Option<&FormPayload>) -> TransportResult {
        (**self).post_json(path, form).await
    }
}

/// reqwest-backed transport for the wizard endpoints
pub struct HttpTransport {
    client: Client,
    config: WizardConfig,
}

impl HttpTransport {
    pub fn new(config: WizardConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Init {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    async fn read_reply(path: &str, response: reqwest::Response) -> TransportResult {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| TransportError::Request {
                    path: path.to_string(),
                    message: format!("failed to parse response body: {}", e),
                });
        }

        // Keep whatever body the server sent; rejected step submissions
        // carry structured validation feedback.
        let body = response.json::<Value>().await.ok();
        Err(TransportError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl WizardTransport for HttpTransport {
    async fn get_json(&self, path: &str) -> TransportResult {
        let url = self.config.wizard_url(path);
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Self::read_reply(path, response).await
    }

    async fn post_json(&self, path: &str, form: Option<&FormPayload>) -> TransportResult {
        let url = self.config.wizard_url(path);
        tracing::debug!(url = %url, "POST");

        let mut request = self.client.post(&url);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await.map_err(|e| TransportError::Request {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Self::read_reply(path, response).await
    }
}
