//! HTTP mail provider implementation.
//!
//! Talks to a transactional mail REST API: `POST /v1/messages` to submit
//! and `GET /v1/messages/{id}` for the latest delivery event.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::traits::{DeliveryEvent, MailError, MailSender, Result, SendReceipt, SendRequest};
use crate::config::MailSettings;

/// Submission payload for the provider API.
#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    tracking_id: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

/// Provider response to a submission.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

/// Provider response to a status query.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    last_event: DeliveryEvent,
}

/// Transactional mail provider backed by a REST API.
pub struct HttpMailProvider {
    client: reqwest::Client,
    base_url: String,
    from: String,
}

impl HttpMailProvider {
    /// Creates a provider from settings, reading the API key from the
    /// configured environment variable.
    pub fn from_settings(settings: &MailSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            MailError::Authentication(format!("{} is not set", settings.api_key_env))
        })?;

        let from = match &settings.from_name {
            Some(name) => format!("{} <{}>", name, settings.from_address),
            None => settings.from_address.clone(),
        };

        Self::new(&settings.base_url, &api_key, from, settings.timeout_secs)
    }

    /// Creates a provider with explicit credentials.
    pub fn new(
        base_url: &str,
        api_key: &str,
        from: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| MailError::Authentication("invalid API key".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MailError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            from,
        })
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let message = response.text().await.unwrap_or_default();

        Err(match status.as_u16() {
            401 | 403 => MailError::Authentication(message),
            404 => MailError::NotFound(message),
            422 => MailError::Rejected(message),
            429 => MailError::RateLimited {
                retry_after_secs: retry_after,
            },
            _ => MailError::Provider(format!("{}: {}", status, message)),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailProvider {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt> {
        let payload = MessagePayload {
            from: self.from.clone(),
            to: &request.to,
            subject: &request.subject,
            body: &request.body,
            tracking_id: &request.tracking_id.0,
            tags: request.tags.clone(),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::Connection(e.to_string()))?;

        let response = Self::check_response(response).await?;
        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| MailError::Provider(format!("invalid response: {}", e)))?;

        Ok(SendReceipt {
            message_id: body.id,
        })
    }

    async fn status(&self, message_id: &str) -> Result<DeliveryEvent> {
        let response = self
            .client
            .get(format!("{}/v1/messages/{}", self.base_url, message_id))
            .send()
            .await
            .map_err(|e| MailError::Connection(e.to_string()))?;

        let response = Self::check_response(response).await?;
        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| MailError::Provider(format!("invalid response: {}", e)))?;

        Ok(body.last_event)
    }
}

impl std::fmt::Debug for HttpMailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
