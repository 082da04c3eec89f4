//! Step execution: the per-contact send loop.
//!
//! The [`StepExecutor`] drives one campaign step across the contact list,
//! enforcing warmup quota, the business-hours window, blacklist and MX
//! deliverability checks, duplicate suppression, and follow-up
//! suppression before every send. Quota or window exhaustion stops the
//! loop and leaves the step in `Sending` with partial counts; per-contact
//! problems skip that contact and keep going.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::dns::{MxOutcome, MxValidator};
use crate::domain::{
    AbVariant, BlacklistReason, Campaign, CampaignId, CampaignStatus, Contact, DeliveryStatus,
    EmailRecord, StepStatus, TrackingId,
};
use crate::providers::mail::{MailSender, SendRequest};
use crate::providers::personalization::Personalizer;

use super::business_hours::SendWindow;
use super::campaign_service::{CampaignError, Result};
use super::repository::Repository;
use super::template;
use super::warmup::WarmupPolicy;

/// Aggregated result of one step execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Emails accepted by the provider.
    pub sent: u32,
    /// Send attempts the provider rejected or errored.
    pub errors: u32,
    /// Contacts skipped by a deliverability or suppression check.
    pub skipped: u32,
}

/// Drives the per-contact send loop for a single campaign step.
pub struct StepExecutor {
    repository: Arc<dyn Repository>,
    mail: Arc<dyn MailSender>,
    mx: Arc<MxValidator>,
    personalizer: Option<Arc<dyn Personalizer>>,
    window: SendWindow,
    warmup: WarmupPolicy,
    inter_send_delay: Duration,
}

impl StepExecutor {
    /// Creates an executor with its collaborators.
    pub fn new(
        repository: Arc<dyn Repository>,
        mail: Arc<dyn MailSender>,
        mx: Arc<MxValidator>,
        personalizer: Option<Arc<dyn Personalizer>>,
        window: SendWindow,
        warmup: WarmupPolicy,
        inter_send_delay: Duration,
    ) -> Self {
        Self {
            repository,
            mail,
            mx,
            personalizer,
            window,
            warmup,
            inter_send_delay,
        }
    }

    /// Executes one step of an active campaign across its contact list.
    ///
    /// Preconditions: the campaign exists and is active; the step exists
    /// and is not completed. Violations abort before any state mutation.
    pub async fn execute_step(
        &self,
        campaign_id: &CampaignId,
        step_number: u32,
    ) -> Result<StepOutcome> {
        let mut campaign = self
            .repository
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| CampaignError::CampaignNotFound(campaign_id.clone()))?;
        if campaign.status != CampaignStatus::Active {
            return Err(CampaignError::CampaignNotActive(campaign_id.clone()));
        }

        let step = campaign
            .step(step_number)
            .ok_or_else(|| CampaignError::StepNotFound {
                campaign_id: campaign_id.clone(),
                step_number,
            })?;
        if step.status == StepStatus::Completed {
            return Err(CampaignError::StepAlreadyCompleted {
                campaign_id: campaign_id.clone(),
                step_number,
            });
        }

        let list = self
            .repository
            .get_contact_list(&campaign.contact_list_id)
            .await?
            .ok_or_else(|| {
                CampaignError::ContactListNotFound(campaign.contact_list_id.clone())
            })?;
        if list.contacts.is_empty() {
            return Err(CampaignError::EmptyContactList(campaign.contact_list_id.clone()));
        }

        // Mark the step as in progress before touching any contact.
        if let Some(step) = campaign.step_mut(step_number) {
            step.status = StepStatus::Sending;
        }
        self.repository.update_campaign(&campaign).await?;

        info!(
            campaign = %campaign_id,
            step = step_number,
            contacts = list.contacts.len(),
            "executing step"
        );

        let mut outcome = StepOutcome::default();
        let mut interrupted = false;

        for contact in &list.contacts {
            // Warmup quota, re-evaluated for every contact: hitting the
            // daily cap defers the rest of the list, it does not skip.
            let first_send = self.repository.get_first_send_date().await?;
            let limit = self.warmup.daily_limit(first_send, Utc::now());
            if self.repository.get_today_send_count().await? >= limit {
                info!(campaign = %campaign_id, step = step_number, limit, "daily warmup limit reached");
                interrupted = true;
                break;
            }

            // The window can close while a long list is in flight.
            if !self.window.is_open(Utc::now()) {
                info!(campaign = %campaign_id, step = step_number, "business hours ended");
                interrupted = true;
                break;
            }

            match self.process_contact(&campaign, step_number, contact).await? {
                ContactResult::Sent => outcome.sent += 1,
                ContactResult::Failed => outcome.errors += 1,
                ContactResult::Skipped => {
                    outcome.skipped += 1;
                    continue;
                }
            }

            // Provider-side throughput limit; the loop's only backpressure.
            if !self.inter_send_delay.is_zero() {
                tokio::time::sleep(self.inter_send_delay).await;
            }
        }

        if let Some(step) = campaign.step_mut(step_number) {
            step.sent_count += outcome.sent;
            step.error_count += outcome.errors;
            if !interrupted {
                step.status = StepStatus::Completed;
                step.sent_at = Some(Utc::now());
            }
        }
        campaign.current_step = step_number;

        if !interrupted && campaign.all_steps_completed() {
            campaign.status = CampaignStatus::Completed;
            campaign.completed_at = Some(Utc::now());
            info!(campaign = %campaign_id, "campaign completed");
        }

        self.repository.update_campaign(&campaign).await?;

        info!(
            campaign = %campaign_id,
            step = step_number,
            sent = outcome.sent,
            errors = outcome.errors,
            skipped = outcome.skipped,
            interrupted,
            "step execution finished"
        );
        Ok(outcome)
    }

    /// Runs the per-contact pipeline: suppression checks, rendering,
    /// personalization, A/B assignment, and the send itself.
    async fn process_contact(
        &self,
        campaign: &Campaign,
        step_number: u32,
        contact: &Contact,
    ) -> Result<ContactResult> {
        let campaign_id = &campaign.id;
        let email = contact.email.as_str();

        if self.repository.is_blacklisted(email).await? {
            debug!(recipient = email, "skipping blacklisted contact");
            return Ok(ContactResult::Skipped);
        }

        // Confirmed MX absence is permanent; lookup errors pass.
        if let MxOutcome::NoRecords = self.mx.check(email).await {
            debug!(recipient = email, "no MX record, blacklisting");
            self.repository
                .add_to_blacklist(email, BlacklistReason::NoMxRecord)
                .await?;
            return Ok(ContactResult::Skipped);
        }

        // Only a prior failed attempt may be retried.
        let prior_attempt = self
            .repository
            .find_email_record(campaign_id, email, step_number)
            .await?;
        if let Some(record) = &prior_attempt {
            if record.blocks_duplicate_send() {
                debug!(recipient = email, step = step_number, "already sent, skipping");
                return Ok(ContactResult::Skipped);
            }
        }

        if step_number > 1 {
            if let Some(action) = self.follow_up_suppression(campaign_id, email, step_number).await? {
                return Ok(action);
            }
        }

        let step = campaign
            .step(step_number)
            .expect("step existence checked by execute_step");

        let mut subject = template::render(&step.subject_template, contact);
        let mut body = template::render(&step.body_template, contact);
        body = template::ensure_greeting(&body, contact);

        // Personalization is best-effort: any failure keeps the template.
        if contact.is_enriched() {
            if let Some(personalizer) = &self.personalizer {
                match personalizer.personalize(&subject, &body, contact).await {
                    Ok(personalized) => {
                        subject = personalized.subject;
                        body = personalized.body;
                    }
                    Err(err) => {
                        warn!(recipient = email, error = %err, "personalization failed, using template");
                    }
                }
            }
        }

        let mut ab_variant = None;
        if step_number == 1 {
            let variant = self.assign_variant(prior_attempt.as_ref());
            if variant == AbVariant::B {
                if let Some(personalizer) = &self.personalizer {
                    match personalizer.subject_variant(&subject).await {
                        Ok(alternate) => subject = alternate,
                        Err(err) => {
                            warn!(recipient = email, error = %err, "variant subject failed, using variant A");
                        }
                    }
                }
            }
            ab_variant = Some(variant);
        }

        let tracking_id = TrackingId::generate();
        let request = SendRequest {
            to: email.to_string(),
            subject: subject.clone(),
            body: body.clone(),
            tracking_id: tracking_id.clone(),
            tags: vec![campaign_id.to_string(), format!("step-{}", step_number)],
        };

        let result = match self.mail.send(&request).await {
            Ok(receipt) => {
                let mut record = EmailRecord::new(
                    campaign_id.clone(),
                    step_number,
                    email,
                    subject,
                    body,
                    tracking_id,
                    DeliveryStatus::Sent,
                    Some(receipt.message_id),
                );
                record.ab_variant = ab_variant;
                self.repository.add_email_record(&record).await?;

                let now = Utc::now();
                if self.repository.get_first_send_date().await?.is_none() {
                    self.repository.set_first_send_date(now).await?;
                }
                self.repository.increment_today_send_count().await?;
                ContactResult::Sent
            }
            Err(err) => {
                warn!(recipient = email, error = %err, "send failed");
                let mut record = EmailRecord::new(
                    campaign_id.clone(),
                    step_number,
                    email,
                    subject,
                    body,
                    tracking_id,
                    DeliveryStatus::Failed,
                    None,
                );
                record.ab_variant = ab_variant;
                self.repository.add_email_record(&record).await?;
                ContactResult::Failed
            }
        };

        Ok(result)
    }

    /// Checks the most recent earlier-step record for this contact.
    ///
    /// Returns `Some(Skipped)` when the follow-up must be suppressed.
    async fn follow_up_suppression(
        &self,
        campaign_id: &CampaignId,
        email: &str,
        step_number: u32,
    ) -> Result<Option<ContactResult>> {
        let Some(previous) = self
            .repository
            .latest_record_before_step(campaign_id, email, step_number)
            .await?
        else {
            return Ok(None);
        };

        if previous.status == DeliveryStatus::Bounced {
            debug!(recipient = email, "prior step bounced, blacklisting");
            self.repository
                .add_to_blacklist(email, BlacklistReason::HardBounce)
                .await?;
            return Ok(Some(ContactResult::Skipped));
        }
        if previous.status == DeliveryStatus::Replied || previous.replied {
            debug!(recipient = email, "contact replied, suppressing follow-up");
            return Ok(Some(ContactResult::Skipped));
        }
        if previous.skip_follow_up {
            debug!(recipient = email, "follow-up marker set, skipping");
            return Ok(Some(ContactResult::Skipped));
        }
        Ok(None)
    }

    /// Reuses the variant from any prior step-1 attempt, otherwise
    /// assigns one uniformly at random. The assignment sticks because it
    /// is persisted on the record written for this send.
    fn assign_variant(&self, prior_attempt: Option<&EmailRecord>) -> AbVariant {
        prior_attempt
            .and_then(|record| record.ab_variant)
            .unwrap_or_else(|| {
                if rand::thread_rng().gen_bool(0.5) {
                    AbVariant::A
                } else {
                    AbVariant::B
                }
            })
    }
}

enum ContactResult {
    Sent,
    Failed,
    Skipped,
}
