//! Warmup state operations.
//!
//! The warmup state is a singleton row. The daily send counter is keyed
//! by the local calendar date, so reads on a new day see zero without an
//! explicit reset job.

use chrono::{DateTime, Local, Utc};
use rusqlite::params;

use crate::storage::database::{Database, Result};

use super::parse_opt_datetime;

fn today() -> String {
    Local::now().date_naive().to_string()
}

/// Returns when the first-ever send happened, if any.
pub async fn first_send_date(db: &Database) -> Result<Option<DateTime<Utc>>> {
    db.with_conn(|conn| {
        let value: Option<String> = conn.query_row(
            "SELECT first_send_date FROM warmup_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(parse_opt_datetime(0, value)?)
    })
    .await
}

/// Records the first-ever send time. Only the first call takes effect.
pub async fn set_first_send_date(db: &Database, date: DateTime<Utc>) -> Result<()> {
    db.with_conn(move |conn| {
        conn.execute(
            "UPDATE warmup_state SET first_send_date = ?1 WHERE id = 1 AND first_send_date IS NULL",
            [date.to_rfc3339()],
        )?;
        Ok(())
    })
    .await
}

/// Returns the number of sends counted for the current local day.
pub async fn today_send_count(db: &Database) -> Result<u32> {
    db.with_conn(|conn| {
        let (count_date, count): (Option<String>, u32) = conn.query_row(
            "SELECT count_date, today_send_count FROM warmup_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(if count_date.as_deref() == Some(today().as_str()) {
            count
        } else {
            0
        })
    })
    .await
}

/// Increments today's send counter, rolling the date forward if needed.
pub async fn increment_today_send_count(db: &Database) -> Result<()> {
    db.with_conn(move |conn| {
        conn.execute(
            r#"
            UPDATE warmup_state SET
                today_send_count = CASE
                    WHEN count_date = ?1 THEN today_send_count + 1
                    ELSE 1
                END,
                count_date = ?1
            WHERE id = 1
            "#,
            params![today()],
        )?;
        Ok(())
    })
    .await
}
