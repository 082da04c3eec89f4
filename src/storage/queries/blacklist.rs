//! Blacklist operations.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};

use crate::domain::{BlacklistEntry, BlacklistReason};
use crate::storage::database::{Database, Result};

use super::parse_datetime;

fn reason_str(reason: BlacklistReason) -> &'static str {
    match reason {
        BlacklistReason::HardBounce => "hard_bounce",
        BlacklistReason::NoMxRecord => "no_mx_record",
        BlacklistReason::SpamComplaint => "spam_complaint",
    }
}

fn parse_reason(index: usize, value: &str) -> rusqlite::Result<BlacklistReason> {
    match value {
        "hard_bounce" => Ok(BlacklistReason::HardBounce),
        "no_mx_record" => Ok(BlacklistReason::NoMxRecord),
        "spam_complaint" => Ok(BlacklistReason::SpamComplaint),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown blacklist reason: {}", other).into(),
        )),
    }
}

/// Returns whether an address is blacklisted.
pub async fn contains(db: &Database, email: &str) -> Result<bool> {
    let email = email.to_string();

    db.with_conn(move |conn| {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM blacklist WHERE email = ?1", [&email], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    })
    .await
}

/// Adds an address to the blacklist.
///
/// Re-adding an existing address keeps the original entry and reason.
pub async fn insert(db: &Database, entry: &BlacklistEntry) -> Result<()> {
    let entry = entry.clone();

    db.with_conn(move |conn| {
        conn.execute(
            "INSERT OR IGNORE INTO blacklist (email, reason, added_at) VALUES (?1, ?2, ?3)",
            params![
                entry.email,
                reason_str(entry.reason),
                entry.added_at.to_rfc3339()
            ],
        )?;
        Ok(())
    })
    .await
}

/// Retrieves a blacklist entry.
pub async fn get(db: &Database, email: &str) -> Result<Option<BlacklistEntry>> {
    let email = email.to_string();

    db.with_conn(move |conn| {
        let result = conn
            .query_row(
                "SELECT email, reason, added_at FROM blacklist WHERE email = ?1",
                [&email],
                |row| {
                    let reason: String = row.get(1)?;
                    Ok(BlacklistEntry {
                        email: row.get(0)?,
                        reason: parse_reason(1, &reason)?,
                        added_at: parse_datetime(2, row.get(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    })
    .await
}
