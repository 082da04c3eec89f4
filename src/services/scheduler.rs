//! Campaign scheduler.
//!
//! A fixed-period tick that finds due steps across active campaigns and
//! hands them to the [`StepExecutor`](super::executor::StepExecutor), at
//! most one step per campaign per tick so sequence order is preserved.
//! Ticks are guarded against overlapping self-invocation: if a provider
//! call stalls past the tick period, the next timer fire is a no-op
//! instead of a concurrent run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::StepStatus;

use super::business_hours::SendWindow;
use super::executor::StepExecutor;
use super::repository::Repository;

/// Counters describing what one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Active campaigns examined.
    pub campaigns_checked: usize,
    /// Steps handed to the executor.
    pub steps_executed: usize,
    /// Emails sent across all executed steps.
    pub sent: u32,
    /// Send errors across all executed steps.
    pub errors: u32,
    /// Contacts skipped across all executed steps.
    pub skipped: u32,
}

/// Periodic driver for active campaigns.
pub struct CampaignScheduler {
    repository: Arc<dyn Repository>,
    executor: Arc<StepExecutor>,
    window: SendWindow,
    tick_interval: Duration,
    in_flight: AtomicBool,
    stop_flag: AtomicBool,
}

impl CampaignScheduler {
    /// Creates a scheduler.
    pub fn new(
        repository: Arc<dyn Repository>,
        executor: Arc<StepExecutor>,
        window: SendWindow,
        tick_interval: Duration,
    ) -> Self {
        Self {
            repository,
            executor,
            window,
            tick_interval,
            in_flight: AtomicBool::new(false),
            stop_flag: AtomicBool::new(false),
        }
    }

    /// Runs one scheduling pass.
    ///
    /// Idempotent and safe to call from a timer: a tick that fires while
    /// a previous one is still running returns immediately.
    pub async fn tick(&self) -> Result<TickSummary> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("tick already in flight, skipping");
            return Ok(TickSummary::default());
        }

        let result = self.run_tick().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_tick(&self) -> Result<TickSummary> {
        let mut summary = TickSummary::default();
        let now = Utc::now();

        if !self.window.is_open(now) {
            debug!("outside business hours, skipping tick");
            return Ok(summary);
        }

        let campaigns = self.repository.active_campaigns().await?;
        summary.campaigns_checked = campaigns.len();

        for campaign in campaigns {
            // A step stranded in Sending by an interrupted loop is never
            // auto-resumed; surface it so an operator can reset it.
            if let Some(stuck) = campaign
                .steps
                .iter()
                .find(|s| s.status == StepStatus::Sending)
            {
                warn!(
                    campaign = %campaign.id,
                    step = stuck.step_number,
                    "step left in sending state, not resuming"
                );
            }

            let Some(due) = campaign.first_due_step(now) else {
                continue;
            };
            let step_number = due.step_number;

            // One step per campaign per tick keeps the sequence ordered.
            match self.executor.execute_step(&campaign.id, step_number).await {
                Ok(outcome) => {
                    summary.steps_executed += 1;
                    summary.sent += outcome.sent;
                    summary.errors += outcome.errors;
                    summary.skipped += outcome.skipped;
                }
                Err(err) => {
                    warn!(campaign = %campaign.id, step = step_number, error = %err, "step execution failed");
                }
            }
        }

        Ok(summary)
    }

    /// Starts the background tick loop.
    ///
    /// Call [`stop`](Self::stop) to end it; the loop exits at the next
    /// interval boundary.
    pub fn start_background(self: Arc<Self>) {
        self.stop_flag.store(false, Ordering::SeqCst);
        let scheduler = Arc::clone(&self);

        tokio::spawn(async move {
            info!(interval_secs = scheduler.tick_interval.as_secs(), "scheduler started");
            loop {
                if scheduler.stop_flag.load(Ordering::SeqCst) {
                    info!("scheduler stopped");
                    break;
                }
                if let Err(err) = scheduler.tick().await {
                    warn!(error = %err, "scheduler tick failed");
                }
                tokio::time::sleep(scheduler.tick_interval).await;
            }
        });
    }

    /// Signals the background loop to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}
