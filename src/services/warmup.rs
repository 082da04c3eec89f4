//! Reputation warmup policy.
//!
//! A new sending identity ramps its daily volume gradually to protect
//! deliverability. The policy is a pure function from the first-send date
//! to today's maximum send count; the executor consults it before every
//! send and stops the loop when the day's budget is exhausted.

use chrono::{DateTime, Utc};

use crate::config::SendingSettings;

/// Computes the maximum number of sends allowed per day.
#[derive(Debug, Clone)]
pub struct WarmupPolicy {
    schedule: Vec<u32>,
    ceiling: u32,
}

impl WarmupPolicy {
    /// Creates a policy with an explicit escalation schedule and provider
    /// ceiling. An empty schedule falls back to the default.
    pub fn new(schedule: Vec<u32>, ceiling: u32) -> Self {
        let schedule = if schedule.is_empty() {
            SendingSettings::default().warmup_schedule
        } else {
            schedule
        };
        Self { schedule, ceiling }
    }

    /// Creates a policy from sending settings.
    pub fn from_settings(settings: &SendingSettings) -> Self {
        Self::new(
            settings.warmup_schedule.clone(),
            settings.provider_daily_ceiling,
        )
    }

    /// Returns today's send limit.
    ///
    /// An identity that has never sent gets the cold-start limit (the
    /// first schedule entry). Otherwise the schedule is indexed by elapsed
    /// warmup days, with the first-send day counting as day one, clamped
    /// to the final entry and capped at the provider ceiling. The result
    /// is non-decreasing in elapsed time.
    pub fn daily_limit(&self, first_send_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
        let limit = match first_send_date {
            None => self.schedule[0],
            Some(first) => {
                let elapsed_days = (now - first).num_days().max(0) as usize;
                let index = elapsed_days
                    .saturating_sub(1)
                    .min(self.schedule.len() - 1);
                self.schedule[index]
            }
        };
        limit.min(self.ceiling)
    }
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self::from_settings(&SendingSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> WarmupPolicy {
        WarmupPolicy::default()
    }

    #[test]
    fn cold_start_limit_is_five() {
        assert_eq!(policy().daily_limit(None, Utc::now()), 5);
    }

    #[test]
    fn six_days_in_allows_seventy_five() {
        let now = Utc::now();
        let first = now - Duration::days(6);
        assert_eq!(policy().daily_limit(Some(first), now), 75);
    }

    #[test]
    fn thirty_days_in_hits_the_ceiling() {
        let now = Utc::now();
        let first = now - Duration::days(30);
        assert_eq!(policy().daily_limit(Some(first), now), 100);
    }

    #[test]
    fn limit_is_monotonic_and_capped() {
        let now = Utc::now();
        let p = policy();
        let mut previous = 0;
        for days in 0..90 {
            let limit = p.daily_limit(Some(now - Duration::days(days)), now);
            assert!(limit >= previous, "limit regressed at day {}", days);
            assert!(limit <= 100);
            previous = limit;
        }
    }

    #[test]
    fn clock_skew_is_treated_as_day_zero() {
        let now = Utc::now();
        let future_first = now + Duration::days(3);
        assert_eq!(policy().daily_limit(Some(future_first), now), 5);
    }

    #[test]
    fn ceiling_overrides_schedule() {
        let p = WarmupPolicy::new(vec![5, 500], 50);
        let now = Utc::now();
        assert_eq!(p.daily_limit(Some(now - Duration::days(10)), now), 50);
    }
}
