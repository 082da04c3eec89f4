//! CRM bridge trait definition.
//!
//! The CRM bridge pushes delivery events into an external CRM as notes and
//! advances deal stages when a prospect replies. It is best-effort and
//! failure-isolated: CRM downtime must never block campaign progress, so
//! every caller catches and logs errors instead of propagating them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type alias for CRM operations.
pub type Result<T> = std::result::Result<T, CrmError>;

/// Errors that can occur during CRM operations.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// CRM-specific error.
    #[error("crm error: {0}")]
    Crm(String),
}

/// Pipeline stage of a CRM deal.
///
/// Declaration order is pipeline order: a stage may only ever move to one
/// declared after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    /// Lead identified, no outreach yet.
    Prospecting,
    /// First outreach sent.
    Contacted,
    /// The prospect replied or otherwise engaged.
    Engaged,
    /// Qualified opportunity.
    Qualified,
    /// In active negotiation.
    Negotiation,
    /// Won.
    ClosedWon,
    /// Lost.
    ClosedLost,
}

impl DealStage {
    /// Returns whether this stage is still in the prospecting phase, where
    /// a reply is allowed to advance the deal automatically.
    pub fn is_prospecting(&self) -> bool {
        matches!(self, Self::Prospecting | Self::Contacted)
    }

    /// The stage a deal advances to when the prospect replies.
    pub fn reply_target() -> Self {
        Self::Engaged
    }

    /// Returns the stage a reply should move this deal to, if any.
    ///
    /// Advancement is monotonically forward from prospecting stages only;
    /// a deal already at or past [`DealStage::reply_target`] never regresses.
    pub fn advanced_on_reply(&self) -> Option<Self> {
        let target = Self::reply_target();
        (self.is_prospecting() && *self < target).then_some(target)
    }
}

/// A contact as known to the CRM.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmContact {
    /// CRM-side contact identifier.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Identifier of the contact's primary open deal, if any.
    pub deal_id: Option<String>,
}

/// A deal as known to the CRM.
#[derive(Debug, Clone, Deserialize)]
pub struct Deal {
    /// CRM-side deal identifier.
    pub id: String,
    /// Current pipeline stage.
    pub stage: DealStage,
}

/// Identifier of a created note.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteId(pub String);

/// The CRM bridge contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmBridge: Send + Sync {
    /// Looks up a CRM contact by email address.
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>>;

    /// Creates a free-standing note.
    async fn create_note(&self, text: &str) -> Result<NoteId>;

    /// Associates a note with a contact or deal.
    async fn associate_note(&self, note_id: &NoteId, target_id: &str) -> Result<()>;

    /// Fetches a deal by identifier.
    async fn get_deal(&self, deal_id: &str) -> Result<Deal>;

    /// Moves a deal to a new pipeline stage.
    async fn update_deal_stage(&self, deal_id: &str, stage: DealStage) -> Result<()>;
}
