//! Storage contract the campaign engine depends on.
//!
//! The engine never touches the database directly; every read and write
//! goes through this trait so the scheduler, executor, and reconciler can
//! be tested against mocks and the store can be swapped out. The SQLite
//! implementation lives in [`crate::storage`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use anyhow::Result;

use crate::domain::{
    BlacklistEntry, BlacklistReason, Campaign, CampaignId, ContactList, ContactListId,
    EmailRecord, EmailRecordId,
};

/// Persistence operations for campaigns, delivery records, the blacklist,
/// and warmup counters.
///
/// The daily send counter rolls over at the local-day boundary; that
/// rollover is the implementation's responsibility, not the caller's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    // Campaigns

    /// Fetches a campaign by id.
    async fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>>;

    /// Inserts a new campaign.
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<()>;

    /// Replaces a campaign's stored state.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<()>;

    /// Returns all campaigns currently in the active status.
    async fn active_campaigns(&self) -> Result<Vec<Campaign>>;

    // Contact lists

    /// Fetches a contact list with its contacts.
    async fn get_contact_list(&self, id: &ContactListId) -> Result<Option<ContactList>>;

    /// Inserts a contact list and its contacts.
    async fn insert_contact_list(&self, list: &ContactList) -> Result<()>;

    // Email records

    /// Inserts a delivery record.
    async fn add_email_record(&self, record: &EmailRecord) -> Result<()>;

    /// Replaces a delivery record's stored state.
    async fn update_email_record(&self, record: &EmailRecord) -> Result<()>;

    /// Returns all delivery records for a campaign.
    async fn get_email_records_by_campaign(&self, id: &CampaignId) -> Result<Vec<EmailRecord>>;

    /// Finds the most recent record for an exact (campaign, recipient,
    /// step) triple.
    async fn find_email_record(
        &self,
        campaign_id: &CampaignId,
        recipient: &str,
        step_number: u32,
    ) -> Result<Option<EmailRecord>>;

    /// Finds the most recent record for a recipient across steps earlier
    /// than `step_number` in the same campaign.
    async fn latest_record_before_step(
        &self,
        campaign_id: &CampaignId,
        recipient: &str,
        step_number: u32,
    ) -> Result<Option<EmailRecord>>;

    /// Returns the most recently created records that are still
    /// non-terminal and have a provider message id, newest first.
    async fn recent_unsettled_records(&self, limit: usize) -> Result<Vec<EmailRecord>>;

    /// Sets the replied flag on a record.
    async fn mark_replied(&self, id: &EmailRecordId) -> Result<()>;

    // Blacklist

    /// Returns whether an address is suppressed.
    async fn is_blacklisted(&self, email: &str) -> Result<bool>;

    /// Adds an address to the blacklist. Idempotent: re-adding an
    /// existing address keeps the original entry.
    async fn add_to_blacklist(&self, email: &str, reason: BlacklistReason) -> Result<()>;

    /// Fetches a blacklist entry.
    async fn get_blacklist_entry(&self, email: &str) -> Result<Option<BlacklistEntry>>;

    // Warmup

    /// Returns when the first-ever send happened, if any.
    async fn get_first_send_date(&self) -> Result<Option<DateTime<Utc>>>;

    /// Records the first-ever send time. Only the first call takes effect.
    async fn set_first_send_date(&self, date: DateTime<Utc>) -> Result<()>;

    /// Returns the number of sends counted today.
    async fn get_today_send_count(&self) -> Result<u32>;

    /// Increments today's send counter.
    async fn increment_today_send_count(&self) -> Result<()>;
}
