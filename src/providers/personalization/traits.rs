//! Personalization service trait definition.
//!
//! The personalization service rewrites a rendered email for a specific
//! contact and produces alternate subject lines for A/B testing. It is
//! strictly optional: every caller falls back to the unmodified template
//! when a call fails, so errors here never block a send.

use async_trait::async_trait;

use crate::domain::Contact;

/// Result type alias for personalization operations.
pub type Result<T> = std::result::Result<T, PersonalizationError>;

/// Errors that can occur during personalization calls.
#[derive(Debug, thiserror::Error)]
pub enum PersonalizationError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The service returned an unusable response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Service-specific error.
    #[error("service error: {0}")]
    Service(String),
}

/// A personalized subject/body pair.
#[derive(Debug, Clone)]
pub struct PersonalizedEmail {
    /// Personalized subject line.
    pub subject: String,
    /// Personalized body.
    pub body: String,
}

/// The personalization service contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Personalizer: Send + Sync {
    /// Rewrites subject and body for the given contact using their
    /// enrichment attributes (company, title, industry).
    async fn personalize(
        &self,
        subject: &str,
        body: &str,
        contact: &Contact,
    ) -> Result<PersonalizedEmail>;

    /// Produces an alternate subject line for A/B testing.
    async fn subject_variant(&self, subject: &str) -> Result<String>;
}
