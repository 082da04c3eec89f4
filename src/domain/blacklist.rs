//! Blacklist domain types.
//!
//! Once an address lands on the blacklist it is suppressed from every
//! future send across all campaigns. Entries have no TTL and are never
//! removed automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an address was blacklisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    /// The provider reported a hard bounce.
    HardBounce,
    /// The recipient domain has no MX record.
    NoMxRecord,
    /// The recipient filed a spam complaint.
    SpamComplaint,
}

/// A suppressed email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// The suppressed address.
    pub email: String,
    /// Why it was suppressed.
    pub reason: BlacklistReason,
    /// When it was added.
    pub added_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(email: impl Into<String>, reason: BlacklistReason) -> Self {
        Self {
            email: email.into(),
            reason,
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_serialization() {
        let json = serde_json::to_string(&BlacklistReason::HardBounce).unwrap();
        assert_eq!(json, "\"hard_bounce\"");

        let parsed: BlacklistReason = serde_json::from_str("\"no_mx_record\"").unwrap();
        assert_eq!(parsed, BlacklistReason::NoMxRecord);
    }

    #[test]
    fn entry_creation() {
        let entry = BlacklistEntry::new("dead@example.com", BlacklistReason::SpamComplaint);
        assert_eq!(entry.email, "dead@example.com");
        assert_eq!(entry.reason, BlacklistReason::SpamComplaint);
    }
}
