//! Mail provider trait definition.
//!
//! This module defines the [`MailSender`] trait which abstracts over the
//! transactional mail provider. The engine submits messages through it and
//! polls it for delivery-event transitions; everything else about the
//! provider (wire format, retries, timeouts) is the implementation's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DeliveryStatus, TrackingId};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors that can occur during mail provider operations.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// The provider rejected the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Requested message was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider-specific error.
    #[error("provider error: {0}")]
    Provider(String),
}

/// A message handed to the provider for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    /// Recipient address.
    pub to: String,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Tracking identifier embedded for event correlation.
    pub tracking_id: TrackingId,
    /// Provider-side tags (campaign id, step number).
    pub tags: Vec<String>,
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SendReceipt {
    /// Provider-assigned message identifier.
    pub message_id: String,
}

/// The most recent delivery event the provider has observed for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEvent {
    /// Accepted for delivery, nothing further observed.
    Accepted,
    /// Delivered to the recipient server.
    Delivered,
    /// Opened by the recipient.
    Opened,
    /// A tracked link was clicked.
    Clicked,
    /// Hard bounced.
    Bounced,
    /// The recipient replied.
    Replied,
    /// The recipient filed a spam complaint.
    Complained,
}

impl From<DeliveryEvent> for DeliveryStatus {
    fn from(event: DeliveryEvent) -> Self {
        match event {
            DeliveryEvent::Accepted => Self::Sent,
            DeliveryEvent::Delivered => Self::Delivered,
            DeliveryEvent::Opened => Self::Opened,
            DeliveryEvent::Clicked => Self::Clicked,
            DeliveryEvent::Bounced => Self::Bounced,
            DeliveryEvent::Replied => Self::Replied,
            DeliveryEvent::Complained => Self::Complained,
        }
    }
}

/// The transactional mail provider contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Submits a message for delivery.
    ///
    /// An `Err` is a send failure: the executor records it and moves on.
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt>;

    /// Returns the most recent delivery event for a submitted message.
    async fn status(&self, message_id: &str) -> Result<DeliveryEvent>;
}
