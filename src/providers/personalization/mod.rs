//! AI personalization service integration.

mod http;
mod traits;

pub use http::HttpPersonalizer;
pub use traits::{PersonalizationError, PersonalizedEmail, Personalizer, Result};

#[cfg(test)]
pub use traits::MockPersonalizer;
