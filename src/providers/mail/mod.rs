//! Transactional mail provider integration.

mod http;
mod traits;

pub use http::HttpMailProvider;
pub use traits::{DeliveryEvent, MailError, MailSender, Result, SendReceipt, SendRequest};

#[cfg(test)]
pub use traits::MockMailSender;
