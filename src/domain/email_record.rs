//! Email delivery record domain types.
//!
//! One [`EmailRecord`] is created per (campaign, recipient, step) send
//! attempt. The status field tracks the message through the provider's
//! delivery event lifecycle; supplementary counters (opens, CRM sync) may
//! still change after a terminal status is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CampaignId, EmailRecordId, TrackingId};

/// Delivery lifecycle status of a sent email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted by the mail provider.
    Sent,
    /// Rejected or errored at submission time.
    Failed,
    /// Confirmed delivered to the recipient's server.
    Delivered,
    /// Recipient opened the message.
    Opened,
    /// Recipient clicked a tracked link.
    Clicked,
    /// Hard bounce; the address is undeliverable.
    Bounced,
    /// Recipient replied.
    Replied,
    /// Recipient filed a spam complaint.
    Complained,
}

impl DeliveryStatus {
    /// Returns whether this status ends the record's delivery lifecycle.
    ///
    /// Terminal records are immutable apart from supplementary counters
    /// and the CRM sync flag.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Bounced | Self::Replied | Self::Complained)
    }

    /// Returns whether this status is pushed to the CRM as an event note.
    pub fn is_crm_syncable(&self) -> bool {
        matches!(
            self,
            Self::Opened | Self::Clicked | Self::Bounced | Self::Replied
        )
    }
}

/// Subject-line variant assigned for first-step A/B testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbVariant {
    A,
    B,
}

/// A record of one email sent (or attempted) to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Unique identifier.
    pub id: EmailRecordId,
    /// Campaign this send belongs to.
    pub campaign_id: CampaignId,
    /// 1-based step number within the campaign.
    pub step_number: u32,
    /// Recipient email address.
    pub recipient: String,
    /// Rendered subject as sent.
    pub subject: String,
    /// Rendered body as sent.
    pub body: String,
    /// Message ID assigned by the mail provider, if submission succeeded.
    pub provider_message_id: Option<String>,
    /// Tracking identifier embedded in the message.
    pub tracking_id: TrackingId,
    /// Current delivery status.
    pub status: DeliveryStatus,
    /// A/B subject variant (step 1 only).
    pub ab_variant: Option<AbVariant>,
    /// Whether the latest syncable event has been pushed to the CRM.
    pub crm_synced: bool,
    /// Cumulative number of opens observed.
    pub open_count: u32,
    /// When the first open was observed.
    pub first_opened_at: Option<DateTime<Utc>>,
    /// When a link click was observed.
    pub clicked_at: Option<DateTime<Utc>>,
    /// Whether the recipient replied (suppresses all later follow-ups).
    pub replied: bool,
    /// Manual marker excluding this contact from later steps.
    pub skip_follow_up: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl EmailRecord {
    /// Creates a record for a send attempt.
    ///
    /// `provider_message_id` is `Some` for accepted sends and `None` for
    /// failures, mirroring the submission outcome in `status`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaign_id: CampaignId,
        step_number: u32,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        tracking_id: TrackingId,
        status: DeliveryStatus,
        provider_message_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EmailRecordId::generate(),
            campaign_id,
            step_number,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            provider_message_id,
            tracking_id,
            status,
            ab_variant: None,
            crm_synced: false,
            open_count: 0,
            first_opened_at: None,
            clicked_at: None,
            replied: false,
            skip_follow_up: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns whether this record blocks re-sending the same
    /// (campaign, recipient, step) triple.
    ///
    /// Only a `Failed` attempt may be retried by a later step execution.
    pub fn blocks_duplicate_send(&self) -> bool {
        self.status != DeliveryStatus::Failed
    }

    /// Records an observed open, stamping the first-open time once.
    pub fn record_open(&mut self, at: DateTime<Utc>) {
        self.open_count = self.open_count.saturating_add(1);
        if self.first_opened_at.is_none() {
            self.first_opened_at = Some(at);
        }
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: DeliveryStatus) -> EmailRecord {
        EmailRecord::new(
            CampaignId::from("camp-1"),
            1,
            "ada@example.com",
            "Hello",
            "Body",
            TrackingId::generate(),
            status,
            Some("prov-1".to_string()),
        )
    }

    #[test]
    fn terminal_statuses() {
        assert!(DeliveryStatus::Bounced.is_terminal());
        assert!(DeliveryStatus::Replied.is_terminal());
        assert!(DeliveryStatus::Complained.is_terminal());
        assert!(!DeliveryStatus::Sent.is_terminal());
        assert!(!DeliveryStatus::Opened.is_terminal());
        assert!(!DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn crm_syncable_set() {
        assert!(DeliveryStatus::Opened.is_crm_syncable());
        assert!(DeliveryStatus::Clicked.is_crm_syncable());
        assert!(DeliveryStatus::Bounced.is_crm_syncable());
        assert!(DeliveryStatus::Replied.is_crm_syncable());
        assert!(!DeliveryStatus::Sent.is_crm_syncable());
        assert!(!DeliveryStatus::Delivered.is_crm_syncable());
        assert!(!DeliveryStatus::Complained.is_crm_syncable());
    }

    #[test]
    fn failed_records_allow_retry() {
        assert!(!record(DeliveryStatus::Failed).blocks_duplicate_send());
        assert!(record(DeliveryStatus::Sent).blocks_duplicate_send());
        assert!(record(DeliveryStatus::Bounced).blocks_duplicate_send());
    }

    #[test]
    fn record_open_stamps_first_open_once() {
        let mut rec = record(DeliveryStatus::Sent);
        let first = Utc::now();
        rec.record_open(first);
        assert_eq!(rec.open_count, 1);
        assert_eq!(rec.first_opened_at, Some(first));

        let later = first + chrono::Duration::hours(2);
        rec.record_open(later);
        assert_eq!(rec.open_count, 2);
        assert_eq!(rec.first_opened_at, Some(first));
    }

    #[test]
    fn status_serialization() {
        let json = serde_json::to_string(&DeliveryStatus::Bounced).unwrap();
        assert_eq!(json, "\"bounced\"");

        let parsed: DeliveryStatus = serde_json::from_str("\"complained\"").unwrap();
        assert_eq!(parsed, DeliveryStatus::Complained);
    }
}
