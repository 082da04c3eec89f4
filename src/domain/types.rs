//! Core identifier types for domain entities.
//!
//! These newtype wrappers provide type safety for entity identifiers,
//! preventing accidental mixing of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Generates a new random campaign identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CampaignId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CampaignId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for a contact list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactListId(pub String);

impl fmt::Display for ContactListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContactListId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactListId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for an email delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailRecordId(pub String);

impl EmailRecordId {
    /// Generates a new random record identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for EmailRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EmailRecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmailRecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Open/click tracking identifier embedded in an outgoing message.
///
/// Generated fresh for every send so delivery events can be correlated
/// back to the originating record without exposing internal IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingId(pub String);

impl TrackingId {
    /// Generates a new random tracking identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TrackingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackingId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_id_display() {
        let id = CampaignId("camp-1".to_string());
        assert_eq!(id.to_string(), "camp-1");
    }

    #[test]
    fn contact_list_id_equality() {
        let id1 = ContactListId::from("list-1");
        let id2 = ContactListId::from("list-1".to_string());
        assert_eq!(id1, id2);
    }

    #[test]
    fn email_record_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(EmailRecordId::from("rec-1"));
        assert!(set.contains(&EmailRecordId::from("rec-1")));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(CampaignId::generate(), CampaignId::generate());
        assert_ne!(TrackingId::generate(), TrackingId::generate());
    }
}
