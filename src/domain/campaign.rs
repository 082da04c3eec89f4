//! Campaign and step domain types.
//!
//! A campaign is an ordered sequence of timed email steps sent to a single
//! contact list. Steps are scheduled relative to the campaign start time,
//! not relative to when the previous step actually finished.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CampaignId, ContactListId};

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Created but not yet started; steps may still be edited.
    Draft,
    /// Steps are being executed by the scheduler.
    Active,
    /// Execution suspended; may be resumed.
    Paused,
    /// All steps finished.
    Completed,
}

/// Execution status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Contact loop is (or was) in progress.
    Sending,
    /// Contact loop ran to the end of the list.
    Completed,
}

/// One email step within a campaign sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the sequence, strictly increasing.
    pub step_number: u32,
    /// Subject line template with `{{placeholder}}` variables.
    pub subject_template: String,
    /// Body template with `{{placeholder}}` variables.
    pub body_template: String,
    /// Days to wait after the previous step's scheduled time.
    pub delay_days: u32,
    /// Execution status.
    pub status: StepStatus,
    /// When this step becomes due. Set when the campaign starts.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When execution of this step finished.
    pub sent_at: Option<DateTime<Utc>>,
    /// Number of emails successfully sent by this step.
    pub sent_count: u32,
    /// Number of send failures recorded by this step.
    pub error_count: u32,
}

impl Step {
    /// Creates a pending, unscheduled step.
    pub fn new(
        step_number: u32,
        subject_template: impl Into<String>,
        body_template: impl Into<String>,
        delay_days: u32,
    ) -> Self {
        Self {
            step_number,
            subject_template: subject_template.into(),
            body_template: body_template.into(),
            delay_days,
            status: StepStatus::Pending,
            scheduled_at: None,
            sent_at: None,
            sent_count: 0,
            error_count: 0,
        }
    }

    /// Returns whether this step is due for execution at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == StepStatus::Pending
            && self.scheduled_at.is_some_and(|at| at <= now)
    }
}

/// An outbound drip campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier.
    pub id: CampaignId,
    /// Human-readable name.
    pub name: String,
    /// Contact list this campaign sends to.
    pub contact_list_id: ContactListId,
    /// Ordered step sequence.
    pub steps: Vec<Step>,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// 1-based number of the step most recently executed (0 before start).
    pub current_step: u32,
    /// When the campaign transitioned to active.
    pub started_at: Option<DateTime<Utc>>,
    /// When the final step completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Creates a new draft campaign with no steps.
    pub fn new(name: impl Into<String>, contact_list_id: ContactListId) -> Self {
        Self {
            id: CampaignId::generate(),
            name: name.into(),
            contact_list_id,
            steps: Vec::new(),
            status: CampaignStatus::Draft,
            current_step: 0,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Derives every step's `scheduled_at` from the campaign start time.
    ///
    /// Step N is scheduled at `start + Σ delay_days(1..=N)`. Schedules never
    /// shift based on when earlier steps actually finish executing.
    pub fn schedule_steps(&mut self, start: DateTime<Utc>) {
        let mut cumulative_days: i64 = 0;
        for step in &mut self.steps {
            cumulative_days += i64::from(step.delay_days);
            step.scheduled_at = Some(start + Duration::days(cumulative_days));
        }
    }

    /// Returns the first pending step whose scheduled time has passed.
    ///
    /// Steps already `Completed` are skipped. A step stuck in `Sending` is
    /// not returned; the scheduler decides how to surface that case.
    pub fn first_due_step(&self, now: DateTime<Utc>) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_due(now))
    }

    /// Looks up a step by its 1-based number.
    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    /// Looks up a step mutably by its 1-based number.
    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.step_number == step_number)
    }

    /// Returns whether every step has completed.
    pub fn all_steps_completed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign_with_delays(delays: &[u32]) -> Campaign {
        let mut campaign = Campaign::new("Q3 outreach", ContactListId::from("list-1"));
        campaign.steps = delays
            .iter()
            .enumerate()
            .map(|(i, d)| Step::new(i as u32 + 1, "Subject", "Body", *d))
            .collect();
        campaign
    }

    #[test]
    fn new_campaign_is_draft() {
        let campaign = Campaign::new("Test", ContactListId::from("list-1"));
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.current_step, 0);
        assert!(campaign.started_at.is_none());
    }

    #[test]
    fn schedule_steps_uses_cumulative_delay() {
        let mut campaign = campaign_with_delays(&[0, 3, 4]);
        let start = Utc::now();
        campaign.schedule_steps(start);

        assert_eq!(campaign.steps[0].scheduled_at, Some(start));
        assert_eq!(
            campaign.steps[1].scheduled_at,
            Some(start + Duration::days(3))
        );
        assert_eq!(
            campaign.steps[2].scheduled_at,
            Some(start + Duration::days(7))
        );
    }

    #[test]
    fn first_due_step_skips_completed() {
        let mut campaign = campaign_with_delays(&[0, 0]);
        let start = Utc::now() - Duration::days(1);
        campaign.schedule_steps(start);
        campaign.steps[0].status = StepStatus::Completed;

        let due = campaign.first_due_step(Utc::now()).unwrap();
        assert_eq!(due.step_number, 2);
    }

    #[test]
    fn first_due_step_ignores_future_steps() {
        let mut campaign = campaign_with_delays(&[0, 5]);
        campaign.schedule_steps(Utc::now());

        let due = campaign.first_due_step(Utc::now()).unwrap();
        assert_eq!(due.step_number, 1);

        campaign.steps[0].status = StepStatus::Completed;
        assert!(campaign.first_due_step(Utc::now()).is_none());
    }

    #[test]
    fn sending_step_is_not_due() {
        let mut campaign = campaign_with_delays(&[0]);
        campaign.schedule_steps(Utc::now() - Duration::hours(1));
        campaign.steps[0].status = StepStatus::Sending;

        assert!(campaign.first_due_step(Utc::now()).is_none());
    }

    #[test]
    fn all_steps_completed_requires_nonempty() {
        let campaign = Campaign::new("Empty", ContactListId::from("list-1"));
        assert!(!campaign.all_steps_completed());

        let mut campaign = campaign_with_delays(&[0, 1]);
        assert!(!campaign.all_steps_completed());
        for step in &mut campaign.steps {
            step.status = StepStatus::Completed;
        }
        assert!(campaign.all_steps_completed());
    }

    #[test]
    fn campaign_status_serialization() {
        let json = serde_json::to_string(&CampaignStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");

        let parsed: StepStatus = serde_json::from_str("\"sending\"").unwrap();
        assert_eq!(parsed, StepStatus::Sending);
    }
}
