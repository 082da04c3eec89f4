//! SQLite-backed persistence.
//!
//! This module provides the storage layer for the campaign engine:
//!
//! - SQLite database for campaigns, contacts, delivery records, the
//!   blacklist, and warmup counters
//! - Async-safe database operations via `tokio::task::spawn_blocking`
//! - [`SqliteRepository`], the [`Repository`] implementation the engine
//!   is wired with

mod database;
pub mod queries;
mod schema;

pub use database::{Database, DatabaseError, Result};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    BlacklistEntry, BlacklistReason, Campaign, CampaignId, CampaignStatus, ContactList,
    ContactListId, EmailRecord, EmailRecordId,
};
use crate::services::Repository;

/// Repository implementation backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    db: Database,
}

impl SqliteRepository {
    /// Creates a repository over an opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens (or creates) a database at the given path.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Creates a repository over an in-memory database for testing.
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Returns a reference to the underlying database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Wraps the repository in an Arc for shared ownership.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get_campaign(&self, id: &CampaignId) -> anyhow::Result<Option<Campaign>> {
        Ok(queries::campaigns::get_by_id(&self.db, id).await?)
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> anyhow::Result<()> {
        Ok(queries::campaigns::insert(&self.db, campaign).await?)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> anyhow::Result<()> {
        Ok(queries::campaigns::update(&self.db, campaign).await?)
    }

    async fn active_campaigns(&self) -> anyhow::Result<Vec<Campaign>> {
        Ok(queries::campaigns::by_status(&self.db, CampaignStatus::Active).await?)
    }

    async fn get_contact_list(&self, id: &ContactListId) -> anyhow::Result<Option<ContactList>> {
        Ok(queries::contacts::get_list(&self.db, id).await?)
    }

    async fn insert_contact_list(&self, list: &ContactList) -> anyhow::Result<()> {
        Ok(queries::contacts::insert_list(&self.db, list).await?)
    }

    async fn add_email_record(&self, record: &EmailRecord) -> anyhow::Result<()> {
        Ok(queries::email_records::insert(&self.db, record).await?)
    }

    async fn update_email_record(&self, record: &EmailRecord) -> anyhow::Result<()> {
        Ok(queries::email_records::update(&self.db, record).await?)
    }

    async fn get_email_records_by_campaign(
        &self,
        id: &CampaignId,
    ) -> anyhow::Result<Vec<EmailRecord>> {
        Ok(queries::email_records::get_by_campaign(&self.db, id).await?)
    }

    async fn find_email_record(
        &self,
        campaign_id: &CampaignId,
        recipient: &str,
        step_number: u32,
    ) -> anyhow::Result<Option<EmailRecord>> {
        Ok(
            queries::email_records::find_for_send(&self.db, campaign_id, recipient, step_number)
                .await?,
        )
    }

    async fn latest_record_before_step(
        &self,
        campaign_id: &CampaignId,
        recipient: &str,
        step_number: u32,
    ) -> anyhow::Result<Option<EmailRecord>> {
        Ok(queries::email_records::latest_before_step(
            &self.db,
            campaign_id,
            recipient,
            step_number,
        )
        .await?)
    }

    async fn recent_unsettled_records(&self, limit: usize) -> anyhow::Result<Vec<EmailRecord>> {
        Ok(queries::email_records::recent_unsettled(&self.db, limit).await?)
    }

    async fn mark_replied(&self, id: &EmailRecordId) -> anyhow::Result<()> {
        Ok(queries::email_records::mark_replied(&self.db, id).await?)
    }

    async fn is_blacklisted(&self, email: &str) -> anyhow::Result<bool> {
        Ok(queries::blacklist::contains(&self.db, email).await?)
    }

    async fn add_to_blacklist(&self, email: &str, reason: BlacklistReason) -> anyhow::Result<()> {
        let entry = BlacklistEntry::new(email, reason);
        Ok(queries::blacklist::insert(&self.db, &entry).await?)
    }

    async fn get_blacklist_entry(&self, email: &str) -> anyhow::Result<Option<BlacklistEntry>> {
        Ok(queries::blacklist::get(&self.db, email).await?)
    }

    async fn get_first_send_date(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(queries::warmup::first_send_date(&self.db).await?)
    }

    async fn set_first_send_date(&self, date: DateTime<Utc>) -> anyhow::Result<()> {
        Ok(queries::warmup::set_first_send_date(&self.db, date).await?)
    }

    async fn get_today_send_count(&self) -> anyhow::Result<u32> {
        Ok(queries::warmup::today_send_count(&self.db).await?)
    }

    async fn increment_today_send_count(&self) -> anyhow::Result<()> {
        Ok(queries::warmup::increment_today_send_count(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, DeliveryStatus, Step, TrackingId};
    use chrono::Duration;

    async fn repo() -> SqliteRepository {
        SqliteRepository::in_memory().await.unwrap()
    }

    fn record(campaign: &CampaignId, recipient: &str, step: u32, status: DeliveryStatus) -> EmailRecord {
        EmailRecord::new(
            campaign.clone(),
            step,
            recipient,
            "Subject",
            "Body",
            TrackingId::generate(),
            status,
            (status != DeliveryStatus::Failed).then(|| format!("prov-{}", recipient)),
        )
    }

    #[tokio::test]
    async fn campaign_round_trip() {
        let repo = repo().await;
        let mut campaign = Campaign::new("Outreach", ContactListId::from("list-1"));
        campaign.steps = vec![Step::new(1, "S", "B", 0), Step::new(2, "S2", "B2", 3)];

        repo.insert_campaign(&campaign).await.unwrap();
        let loaded = repo.get_campaign(&campaign.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Outreach");
        assert_eq!(loaded.steps.len(), 2);
        assert_eq!(loaded.status, CampaignStatus::Draft);

        let mut updated = loaded;
        updated.status = CampaignStatus::Active;
        updated.started_at = Some(Utc::now());
        updated.schedule_steps(updated.started_at.unwrap());
        repo.update_campaign(&updated).await.unwrap();

        let active = repo.active_campaigns().await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].steps[0].scheduled_at.is_some());
    }

    #[tokio::test]
    async fn contact_list_round_trip_preserves_order() {
        let repo = repo().await;
        let list = ContactList::new(
            ContactListId::from("list-1"),
            "Leads",
            vec![
                Contact::with_name("a@x.com", "Ada"),
                Contact::with_name("b@x.com", "Brian"),
                Contact::with_name("c@x.com", "Carol"),
            ],
        );

        repo.insert_contact_list(&list).await.unwrap();
        let loaded = repo.get_contact_list(&list.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Leads");
        let emails: Vec<_> = loaded.contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);

        assert!(repo
            .get_contact_list(&ContactListId::from("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_non_failed_record_is_rejected() {
        let repo = repo().await;
        let campaign = CampaignId::from("camp-1");

        repo.add_email_record(&record(&campaign, "a@x.com", 1, DeliveryStatus::Sent))
            .await
            .unwrap();
        // The partial unique index rejects a second non-failed record.
        assert!(repo
            .add_email_record(&record(&campaign, "a@x.com", 1, DeliveryStatus::Sent))
            .await
            .is_err());
        // Failed attempts may accumulate.
        repo.add_email_record(&record(&campaign, "b@x.com", 1, DeliveryStatus::Failed))
            .await
            .unwrap();
        repo.add_email_record(&record(&campaign, "b@x.com", 1, DeliveryStatus::Failed))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn find_and_latest_queries() {
        let repo = repo().await;
        let campaign = CampaignId::from("camp-1");

        let mut first = record(&campaign, "a@x.com", 1, DeliveryStatus::Bounced);
        first.created_at = Utc::now() - Duration::days(3);
        repo.add_email_record(&first).await.unwrap();

        let found = repo
            .find_email_record(&campaign, "a@x.com", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, DeliveryStatus::Bounced);

        let previous = repo
            .latest_record_before_step(&campaign, "a@x.com", 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.step_number, 1);

        assert!(repo
            .latest_record_before_step(&campaign, "a@x.com", 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn recent_unsettled_excludes_terminal_and_failed() {
        let repo = repo().await;
        let campaign = CampaignId::from("camp-1");

        repo.add_email_record(&record(&campaign, "sent@x.com", 1, DeliveryStatus::Sent))
            .await
            .unwrap();
        repo.add_email_record(&record(&campaign, "open@x.com", 1, DeliveryStatus::Opened))
            .await
            .unwrap();
        repo.add_email_record(&record(&campaign, "bounce@x.com", 1, DeliveryStatus::Bounced))
            .await
            .unwrap();
        repo.add_email_record(&record(&campaign, "fail@x.com", 1, DeliveryStatus::Failed))
            .await
            .unwrap();

        let unsettled = repo.recent_unsettled_records(10).await.unwrap();
        let recipients: Vec<_> = unsettled.iter().map(|r| r.recipient.as_str()).collect();
        assert!(recipients.contains(&"sent@x.com"));
        assert!(recipients.contains(&"open@x.com"));
        assert!(!recipients.contains(&"bounce@x.com"));
        assert!(!recipients.contains(&"fail@x.com"));
    }

    #[tokio::test]
    async fn blacklist_insert_is_idempotent() {
        let repo = repo().await;

        assert!(!repo.is_blacklisted("a@x.com").await.unwrap());
        repo.add_to_blacklist("a@x.com", BlacklistReason::HardBounce)
            .await
            .unwrap();
        repo.add_to_blacklist("a@x.com", BlacklistReason::SpamComplaint)
            .await
            .unwrap();

        assert!(repo.is_blacklisted("a@x.com").await.unwrap());
        let entry = repo.get_blacklist_entry("a@x.com").await.unwrap().unwrap();
        // The original reason survives re-insertion.
        assert_eq!(entry.reason, BlacklistReason::HardBounce);
    }

    #[tokio::test]
    async fn first_send_date_is_set_exactly_once() {
        let repo = repo().await;

        assert!(repo.get_first_send_date().await.unwrap().is_none());
        let first = Utc::now() - Duration::days(2);
        repo.set_first_send_date(first).await.unwrap();
        repo.set_first_send_date(Utc::now()).await.unwrap();

        let stored = repo.get_first_send_date().await.unwrap().unwrap();
        assert_eq!(stored.timestamp(), first.timestamp());
    }

    #[tokio::test]
    async fn today_send_count_increments() {
        let repo = repo().await;

        assert_eq!(repo.get_today_send_count().await.unwrap(), 0);
        repo.increment_today_send_count().await.unwrap();
        repo.increment_today_send_count().await.unwrap();
        assert_eq!(repo.get_today_send_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn mark_replied_sets_flag() {
        let repo = repo().await;
        let campaign = CampaignId::from("camp-1");
        let rec = record(&campaign, "a@x.com", 1, DeliveryStatus::Sent);
        repo.add_email_record(&rec).await.unwrap();

        repo.mark_replied(&rec.id).await.unwrap();
        let loaded = repo
            .find_email_record(&campaign, "a@x.com", 1)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.replied);
    }
}
