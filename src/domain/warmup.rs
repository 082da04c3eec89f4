//! Sending-reputation warmup state.
//!
//! Tracks when the sending identity first sent mail and how many sends
//! have happened today. The repository owns the local-day rollover of the
//! daily counter; this type is just the snapshot handed to the policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the warmup counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupState {
    /// When the first-ever successful send happened. Set exactly once.
    pub first_send_date: Option<DateTime<Utc>>,
    /// Sends counted so far today.
    pub today_send_count: u32,
}

impl WarmupState {
    /// A fresh identity that has never sent.
    pub fn cold() -> Self {
        Self {
            first_send_date: None,
            today_send_count: 0,
        }
    }
}

impl Default for WarmupState {
    fn default() -> Self {
        Self::cold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_state() {
        let state = WarmupState::cold();
        assert!(state.first_send_date.is_none());
        assert_eq!(state.today_send_count, 0);
    }
}
