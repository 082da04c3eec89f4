//! Database query modules.
//!
//! One module per aggregate, mirroring the repository surface.

pub mod blacklist;
pub mod campaigns;
pub mod contacts;
pub mod email_records;
pub mod warmup;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Parses an RFC 3339 timestamp column.
pub(crate) fn parse_datetime(index: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Parses an optional RFC 3339 timestamp column.
pub(crate) fn parse_opt_datetime(
    index: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_datetime(index, v)).transpose()
}
