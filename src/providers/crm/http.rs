//! HTTP CRM bridge implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;

use super::traits::{CrmBridge, CrmContact, CrmError, Deal, DealStage, NoteId, Result};
use crate::config::CrmSettings;

#[derive(Debug, Serialize)]
struct NotePayload<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct AssociationPayload<'a> {
    target_id: &'a str,
}

#[derive(Debug, Serialize)]
struct StagePayload {
    stage: DealStage,
}

#[derive(Debug, serde::Deserialize)]
struct NoteResponse {
    id: String,
}

/// CRM bridge backed by a REST API.
pub struct HttpCrmBridge {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCrmBridge {
    /// Creates a bridge from settings, reading the API key from the
    /// configured environment variable.
    pub fn from_settings(settings: &CrmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .map_err(|_| CrmError::Authentication(format!("{} is not set", settings.api_key_env)))?;
        Self::new(&settings.base_url, &api_key, settings.timeout_secs)
    }

    /// Creates a bridge with explicit credentials.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| CrmError::Authentication("invalid API key".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CrmError::Connection(e.to_string()))?;

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
            401 | 403 => CrmError::Authentication(message),
            404 => CrmError::NotFound(message),
            429 => CrmError::RateLimited,
            _ => CrmError::Crm(format!("{}: {}", status, message)),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: String) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| CrmError::Crm(format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl CrmBridge for HttpCrmBridge {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>> {
        match self
            .get_json::<CrmContact>(format!("/v1/contacts?email={}", email))
            .await
        {
            Ok(contact) => Ok(Some(contact)),
            Err(CrmError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_note(&self, text: &str) -> Result<NoteId> {
        let response = self
            .client
            .post(format!("{}/v1/notes", self.base_url))
            .json(&NotePayload { text })
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;
        let response = Self::check_response(response).await?;
        let note: NoteResponse = response
            .json()
            .await
            .map_err(|e| CrmError::Crm(format!("invalid response: {}", e)))?;
        Ok(NoteId(note.id))
    }

    async fn associate_note(&self, note_id: &NoteId, target_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/v1/notes/{}/associations",
                self.base_url, note_id.0
            ))
            .json(&AssociationPayload { target_id })
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn get_deal(&self, deal_id: &str) -> Result<Deal> {
        self.get_json(format!("/v1/deals/{}", deal_id)).await
    }

    async fn update_deal_stage(&self, deal_id: &str, stage: DealStage) -> Result<()> {
        let response = self
            .client
            .patch(format!("{}/v1/deals/{}", self.base_url, deal_id))
            .json(&StagePayload { stage })
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;
        Self::check_response(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpCrmBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCrmBridge")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
