//! CRM bridge integration.

mod http;
mod traits;

pub use http::HttpCrmBridge;
pub use traits::{CrmBridge, CrmContact, CrmError, Deal, DealStage, NoteId, Result};

#[cfg(test)]
pub use traits::MockCrmBridge;
