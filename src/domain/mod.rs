//! Domain layer types for the cadence campaign engine.
//!
//! This module contains the core domain types used throughout the engine,
//! including campaign, step, contact, delivery record, blacklist, and
//! warmup entities.

mod blacklist;
mod campaign;
mod contact;
mod email_record;
mod types;
mod warmup;

pub use blacklist::{BlacklistEntry, BlacklistReason};
pub use campaign::{Campaign, CampaignStatus, Step, StepStatus};
pub use contact::{Contact, ContactList};
pub use email_record::{AbVariant, DeliveryStatus, EmailRecord};
pub use types::{CampaignId, ContactListId, EmailRecordId, TrackingId};
pub use warmup::WarmupState;
