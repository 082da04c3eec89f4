//! Delivery status reconciliation.
//!
//! The mail provider observes delivery events (opens, clicks, bounces,
//! replies, complaints) asynchronously. The [`StatusReconciler`] polls a
//! bounded window of recent non-terminal records, folds remote transitions
//! into local state, and applies the side effects: blacklisting,
//! follow-up suppression, and best-effort CRM sync. CRM failures are
//! logged and retried on the next pass via the `crm_synced` flag; they
//! never block reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{BlacklistReason, DeliveryStatus, EmailRecord};
use crate::providers::crm::CrmBridge;
use crate::providers::mail::MailSender;

use super::repository::Repository;

/// Counters describing what one reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records polled at the provider.
    pub polled: usize,
    /// Records whose status changed.
    pub updated: usize,
    /// Newly observed opens.
    pub opened: usize,
    /// Newly observed bounces.
    pub bounced: usize,
    /// Newly observed replies.
    pub replied: usize,
    /// Newly observed complaints.
    pub complained: usize,
    /// Records pushed to the CRM this pass.
    pub crm_synced: usize,
    /// Poll or storage errors (non-fatal, the pass continues).
    pub errors: usize,
}

/// Polls the mail provider and applies delivery-event side effects.
pub struct StatusReconciler {
    repository: Arc<dyn Repository>,
    mail: Arc<dyn MailSender>,
    crm: Option<Arc<dyn CrmBridge>>,
    window: usize,
    poll_delay: Duration,
    reconcile_interval: Duration,
    in_flight: AtomicBool,
    stop_flag: AtomicBool,
}

impl StatusReconciler {
    /// Creates a reconciler. The CRM bridge is optional; without it all
    /// CRM side effects are skipped.
    pub fn new(
        repository: Arc<dyn Repository>,
        mail: Arc<dyn MailSender>,
        crm: Option<Arc<dyn CrmBridge>>,
        window: usize,
        poll_delay: Duration,
        reconcile_interval: Duration,
    ) -> Self {
        Self {
            repository,
            mail,
            crm,
            window,
            poll_delay,
            reconcile_interval,
            in_flight: AtomicBool::new(false),
            stop_flag: AtomicBool::new(false),
        }
    }

    /// Runs one reconcile pass over the recent-record window.
    ///
    /// Re-entrant calls while a pass is running return immediately.
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("reconcile already in flight, skipping");
            return Ok(ReconcileSummary::default());
        }

        let result = self.run_reconcile().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_reconcile(&self) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        let records = self.repository.recent_unsettled_records(self.window).await?;
        debug!(count = records.len(), "reconciling recent records");

        for mut record in records {
            let Some(message_id) = record.provider_message_id.clone() else {
                continue;
            };
            summary.polled += 1;

            let event = match self.mail.status(&message_id).await {
                Ok(event) => event,
                Err(err) => {
                    warn!(record = %record.id, error = %err, "status poll failed");
                    summary.errors += 1;
                    continue;
                }
            };

            let remote: DeliveryStatus = event.into();
            if remote != record.status {
                self.apply_transition(&mut record, remote, &mut summary)
                    .await?;
                summary.updated += 1;
            }

            // A syncable status not yet pushed is retried every pass
            // until the CRM accepts it.
            if record.status.is_crm_syncable() && !record.crm_synced {
                if self.push_crm_event(&record).await {
                    record.crm_synced = true;
                    summary.crm_synced += 1;
                }
            }

            self.repository.update_email_record(&record).await?;

            if !self.poll_delay.is_zero() {
                tokio::time::sleep(self.poll_delay).await;
            }
        }

        info!(
            polled = summary.polled,
            updated = summary.updated,
            bounced = summary.bounced,
            replied = summary.replied,
            crm_synced = summary.crm_synced,
            errors = summary.errors,
            "reconcile pass finished"
        );
        Ok(summary)
    }

    /// Applies a remote status transition and its side effects.
    async fn apply_transition(
        &self,
        record: &mut EmailRecord,
        remote: DeliveryStatus,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        debug!(record = %record.id, from = ?record.status, to = ?remote, "status transition");
        let now = Utc::now();

        match remote {
            DeliveryStatus::Opened => {
                record.record_open(now);
                summary.opened += 1;
            }
            DeliveryStatus::Clicked => {
                if record.clicked_at.is_none() {
                    record.clicked_at = Some(now);
                }
            }
            DeliveryStatus::Bounced => {
                self.repository
                    .add_to_blacklist(&record.recipient, BlacklistReason::HardBounce)
                    .await?;
                summary.bounced += 1;
            }
            DeliveryStatus::Replied => {
                record.replied = true;
                self.repository.mark_replied(&record.id).await?;
                summary.replied += 1;
                if let Err(err) = self.advance_deal_on_reply(record).await {
                    warn!(record = %record.id, error = %err, "CRM deal advancement failed");
                }
            }
            DeliveryStatus::Complained => {
                self.repository
                    .add_to_blacklist(&record.recipient, BlacklistReason::SpamComplaint)
                    .await?;
                summary.complained += 1;
            }
            DeliveryStatus::Delivered | DeliveryStatus::Sent | DeliveryStatus::Failed => {}
        }

        record.status = remote;
        record.updated_at = now;
        Ok(())
    }

    /// Advances the matching CRM deal when a prospect replies.
    ///
    /// Only deals still in a prospecting stage move, and only forward; a
    /// deal at or past the target stage is left alone. A note is attached
    /// to the contact either way.
    async fn advance_deal_on_reply(&self, record: &EmailRecord) -> Result<()> {
        let Some(crm) = &self.crm else {
            return Ok(());
        };

        let Some(contact) = crm.find_contact_by_email(&record.recipient).await? else {
            debug!(recipient = %record.recipient, "no CRM contact for reply");
            return Ok(());
        };

        if let Some(deal_id) = &contact.deal_id {
            let deal = crm.get_deal(deal_id).await?;
            if let Some(target) = deal.stage.advanced_on_reply() {
                crm.update_deal_stage(deal_id, target).await?;
                info!(deal = %deal_id, ?target, "deal advanced on reply");
            }
        }

        let note = crm
            .create_note(&format!(
                "Replied to campaign email (step {})",
                record.step_number
            ))
            .await?;
        crm.associate_note(&note, &contact.id).await?;
        Ok(())
    }

    /// Pushes a delivery event note to the CRM contact.
    ///
    /// Returns whether the push succeeded; failures are logged only.
    async fn push_crm_event(&self, record: &EmailRecord) -> bool {
        let Some(crm) = &self.crm else {
            return false;
        };

        let result: Result<bool> = async {
            let Some(contact) = crm.find_contact_by_email(&record.recipient).await? else {
                debug!(recipient = %record.recipient, "no CRM contact for event");
                // Nothing to sync against; do not keep retrying forever.
                return Ok(true);
            };
            let note = crm
                .create_note(&format!(
                    "Email {:?} (campaign {}, step {})",
                    record.status, record.campaign_id, record.step_number
                ))
                .await?;
            crm.associate_note(&note, &contact.id).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(synced) => synced,
            Err(err) => {
                warn!(record = %record.id, error = %err, "CRM event sync failed");
                false
            }
        }
    }

    /// Starts the background reconcile loop.
    pub fn start_background(self: Arc<Self>) {
        self.stop_flag.store(false, Ordering::SeqCst);
        let reconciler = Arc::clone(&self);

        tokio::spawn(async move {
            info!(
                interval_secs = reconciler.reconcile_interval.as_secs(),
                "reconciler started"
            );
            loop {
                if reconciler.stop_flag.load(Ordering::SeqCst) {
                    info!("reconciler stopped");
                    break;
                }
                if let Err(err) = reconciler.reconcile().await {
                    warn!(error = %err, "reconcile pass failed");
                }
                tokio::time::sleep(reconciler.reconcile_interval).await;
            }
        });
    }

    /// Signals the background loop to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CampaignId, TrackingId};
    use crate::providers::crm::{CrmContact, Deal, DealStage, MockCrmBridge, NoteId};
    use crate::providers::mail::{DeliveryEvent, MailError, MockMailSender};
    use crate::services::repository::MockRepository;

    fn sent_record(recipient: &str) -> EmailRecord {
        EmailRecord::new(
            CampaignId::from("camp-1"),
            1,
            recipient,
            "Hello",
            "Body",
            TrackingId::generate(),
            DeliveryStatus::Sent,
            Some("msg-1".to_string()),
        )
    }

    fn reconciler(
        repo: MockRepository,
        mail: MockMailSender,
        crm: Option<MockCrmBridge>,
    ) -> StatusReconciler {
        StatusReconciler::new(
            Arc::new(repo),
            Arc::new(mail),
            crm.map(|c| Arc::new(c) as Arc<dyn CrmBridge>),
            100,
            Duration::ZERO,
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn open_increments_counter_and_stamps_first_open() {
        let record = sent_record("a@x.com");

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_update_email_record()
            .withf(|r| {
                r.status == DeliveryStatus::Opened
                    && r.open_count == 1
                    && r.first_opened_at.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut mail = MockMailSender::new();
        mail.expect_status()
            .returning(|_| Ok(DeliveryEvent::Opened));

        let summary = reconciler(repo, mail, None).reconcile().await.unwrap();
        assert_eq!(summary.opened, 1);
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn bounce_blacklists_the_recipient() {
        let record = sent_record("a@x.com");

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_add_to_blacklist()
            .withf(|email, reason| email == "a@x.com" && *reason == BlacklistReason::HardBounce)
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_update_email_record()
            .withf(|r| r.status == DeliveryStatus::Bounced)
            .times(1)
            .returning(|_| Ok(()));

        let mut mail = MockMailSender::new();
        mail.expect_status()
            .returning(|_| Ok(DeliveryEvent::Bounced));

        let summary = reconciler(repo, mail, None).reconcile().await.unwrap();
        assert_eq!(summary.bounced, 1);
    }

    #[tokio::test]
    async fn reply_advances_prospecting_deal() {
        let record = sent_record("a@x.com");

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_mark_replied().times(1).returning(|_| Ok(()));
        repo.expect_update_email_record()
            .withf(|r| r.status == DeliveryStatus::Replied && r.replied)
            .times(1)
            .returning(|_| Ok(()));

        let mut mail = MockMailSender::new();
        mail.expect_status()
            .returning(|_| Ok(DeliveryEvent::Replied));

        let mut crm = MockCrmBridge::new();
        crm.expect_find_contact_by_email().returning(|email| {
            Ok(Some(CrmContact {
                id: "crm-1".to_string(),
                email: email.to_string(),
                deal_id: Some("deal-1".to_string()),
            }))
        });
        crm.expect_get_deal().returning(|id| {
            Ok(Deal {
                id: id.to_string(),
                stage: DealStage::Contacted,
            })
        });
        crm.expect_update_deal_stage()
            .withf(|_, stage| *stage == DealStage::Engaged)
            .times(1)
            .returning(|_, _| Ok(()));
        crm.expect_create_note()
            .returning(|_| Ok(NoteId("note-1".to_string())));
        crm.expect_associate_note().returning(|_, _| Ok(()));

        let summary = reconciler(repo, mail, Some(crm)).reconcile().await.unwrap();
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.crm_synced, 1);
    }

    #[tokio::test]
    async fn advanced_deal_never_regresses() {
        let record = sent_record("a@x.com");

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_mark_replied().returning(|_| Ok(()));
        repo.expect_update_email_record().returning(|_| Ok(()));

        let mut mail = MockMailSender::new();
        mail.expect_status()
            .returning(|_| Ok(DeliveryEvent::Replied));

        let mut crm = MockCrmBridge::new();
        crm.expect_find_contact_by_email().returning(|email| {
            Ok(Some(CrmContact {
                id: "crm-1".to_string(),
                email: email.to_string(),
                deal_id: Some("deal-1".to_string()),
            }))
        });
        crm.expect_get_deal().returning(|id| {
            Ok(Deal {
                id: id.to_string(),
                stage: DealStage::Negotiation,
            })
        });
        crm.expect_update_deal_stage().times(0);
        crm.expect_create_note()
            .returning(|_| Ok(NoteId("note-1".to_string())));
        crm.expect_associate_note().returning(|_, _| Ok(()));

        let summary = reconciler(repo, mail, Some(crm)).reconcile().await.unwrap();
        assert_eq!(summary.replied, 1);
    }

    #[tokio::test]
    async fn crm_failure_leaves_sync_flag_unset_for_retry() {
        let mut record = sent_record("a@x.com");
        record.status = DeliveryStatus::Opened;
        record.open_count = 1;

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_update_email_record()
            .withf(|r| !r.crm_synced)
            .times(1)
            .returning(|_| Ok(()));

        let mut mail = MockMailSender::new();
        // Remote status matches local, so only the CRM sync runs.
        mail.expect_status()
            .returning(|_| Ok(DeliveryEvent::Opened));

        let mut crm = MockCrmBridge::new();
        crm.expect_find_contact_by_email()
            .returning(|_| Err(crate::providers::crm::CrmError::Connection("down".to_string())));

        let summary = reconciler(repo, mail, Some(crm)).reconcile().await.unwrap();
        assert_eq!(summary.crm_synced, 0);
        assert_eq!(summary.updated, 0);
    }

    #[tokio::test]
    async fn poll_failure_is_counted_and_skipped() {
        let record = sent_record("a@x.com");

        let mut repo = MockRepository::new();
        repo.expect_recent_unsettled_records()
            .returning(move |_| Ok(vec![record.clone()]));
        repo.expect_update_email_record().times(0);

        let mut mail = MockMailSender::new();
        mail.expect_status()
            .returning(|_| Err(MailError::Connection("timeout".to_string())));

        let summary = reconciler(repo, mail, None).reconcile().await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.updated, 0);
    }
}
