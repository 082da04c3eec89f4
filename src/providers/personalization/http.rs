//! HTTP personalization service implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::traits::{PersonalizationError, PersonalizedEmail, Personalizer, Result};
use crate::config::PersonalizationSettings;
use crate::domain::Contact;

#[derive(Debug, Serialize)]
struct PersonalizeRequest<'a> {
    subject: &'a str,
    body: &'a str,
    contact: &'a Contact,
}

#[derive(Debug, Deserialize)]
struct PersonalizeResponse {
    subject: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct VariantRequest<'a> {
    subject: &'a str,
}

#[derive(Debug, Deserialize)]
struct VariantResponse {
    subject: String,
}

/// Personalization service backed by a REST API.
pub struct HttpPersonalizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPersonalizer {
    /// Creates a client from settings, reading the API key from the
    /// configured environment variable.
    pub fn from_settings(settings: &PersonalizationSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            PersonalizationError::Authentication(format!("{} is not set", settings.api_key_env))
        })?;
        Self::new(&settings.base_url, &api_key, settings.timeout_secs)
    }

    /// Creates a client with explicit credentials.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| PersonalizationError::Authentication("invalid API key".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PersonalizationError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => PersonalizationError::Authentication(message),
            429 => PersonalizationError::RateLimited,
            _ => PersonalizationError::Service(format!("{}: {}", status, message)),
        })
    }
}

#[async_trait]
impl Personalizer for HttpPersonalizer {
    async fn personalize(
        &self,
        subject: &str,
        body: &str,
        contact: &Contact,
    ) -> Result<PersonalizedEmail> {
        let response = self
            .client
            .post(format!("{}/v1/personalize", self.base_url))
            .json(&PersonalizeRequest {
                subject,
                body,
                contact,
            })
            .send()
            .await
            .map_err(|e| PersonalizationError::Connection(e.to_string()))?;

        let response = Self::check_response(response).await?;
        let parsed: PersonalizeResponse = response
            .json()
            .await
            .map_err(|e| PersonalizationError::InvalidResponse(e.to_string()))?;

        Ok(PersonalizedEmail {
            subject: parsed.subject,
            body: parsed.body,
        })
    }

    async fn subject_variant(&self, subject: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/subject-variant", self.base_url))
            .json(&VariantRequest { subject })
            .send()
            .await
            .map_err(|e| PersonalizationError::Connection(e.to_string()))?;

        let response = Self::check_response(response).await?;
        let parsed: VariantResponse = response
            .json()
            .await
            .map_err(|e| PersonalizationError::InvalidResponse(e.to_string()))?;

        Ok(parsed.subject)
    }
}

impl std::fmt::Debug for HttpPersonalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPersonalizer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
