//! Contact and contact list domain types.
//!
//! Contacts are the prospecting targets a campaign sends to. Enrichment
//! fields (company, title, industry) come from upstream lead sourcing and
//! gate whether AI personalization is attempted for a contact.

use serde::{Deserialize, Serialize};

use super::ContactListId;

/// A named list of prospecting contacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactList {
    /// Unique identifier for this list.
    pub id: ContactListId,
    /// Human-readable name.
    pub name: String,
    /// The contacts in this list, in send order.
    pub contacts: Vec<Contact>,
}

impl ContactList {
    /// Creates a new contact list.
    pub fn new(id: ContactListId, name: impl Into<String>, contacts: Vec<Contact>) -> Self {
        Self {
            id,
            name: name.into(),
            contacts,
        }
    }
}

/// A single prospecting contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Email address (unique within a list).
    pub email: String,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Industry segment.
    pub industry: Option<String>,
}

impl Contact {
    /// Creates a contact with just an email address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            company: None,
            title: None,
            industry: None,
        }
    }

    /// Creates a contact with email and first name.
    pub fn with_name(email: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: Some(first_name.into()),
            last_name: None,
            company: None,
            title: None,
            industry: None,
        }
    }

    /// Returns "First Last", whichever parts are present, or the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }

    /// Returns the recipient's mail domain, if the address contains one.
    pub fn domain(&self) -> Option<&str> {
        self.email.rsplit_once('@').map(|(_, domain)| domain)
    }

    /// Returns whether enough enrichment data exists to attempt
    /// AI personalization (company, title, or industry).
    pub fn is_enriched(&self) -> bool {
        self.company.is_some() || self.title.is_some() || self.industry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_full() {
        let mut contact = Contact::with_name("ada@example.com", "Ada");
        contact.last_name = Some("Lovelace".to_string());
        assert_eq!(contact.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let contact = Contact::new("ops@example.com");
        assert_eq!(contact.display_name(), "ops@example.com");
    }

    #[test]
    fn domain_extraction() {
        let contact = Contact::new("ada@widgets.io");
        assert_eq!(contact.domain(), Some("widgets.io"));

        let no_at = Contact::new("not-an-address");
        assert_eq!(no_at.domain(), None);
    }

    #[test]
    fn enrichment_check() {
        let bare = Contact::new("a@x.com");
        assert!(!bare.is_enriched());

        let mut enriched = Contact::new("b@x.com");
        enriched.company = Some("Widgets Inc".to_string());
        assert!(enriched.is_enriched());
    }

    #[test]
    fn contact_serialization() {
        let contact = Contact::with_name("ada@example.com", "Ada");
        let json = serde_json::to_string(&contact).unwrap();
        let parsed: Contact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, contact);
    }
}
