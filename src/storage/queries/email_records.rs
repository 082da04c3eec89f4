//! Email record CRUD operations.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{
    AbVariant, CampaignId, DeliveryStatus, EmailRecord, EmailRecordId, TrackingId,
};
use crate::storage::database::{Database, Result};

use super::{parse_datetime, parse_opt_datetime};

fn status_str(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Failed => "failed",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Opened => "opened",
        DeliveryStatus::Clicked => "clicked",
        DeliveryStatus::Bounced => "bounced",
        DeliveryStatus::Replied => "replied",
        DeliveryStatus::Complained => "complained",
    }
}

fn parse_status(index: usize, value: &str) -> rusqlite::Result<DeliveryStatus> {
    match value {
        "sent" => Ok(DeliveryStatus::Sent),
        "failed" => Ok(DeliveryStatus::Failed),
        "delivered" => Ok(DeliveryStatus::Delivered),
        "opened" => Ok(DeliveryStatus::Opened),
        "clicked" => Ok(DeliveryStatus::Clicked),
        "bounced" => Ok(DeliveryStatus::Bounced),
        "replied" => Ok(DeliveryStatus::Replied),
        "complained" => Ok(DeliveryStatus::Complained),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown delivery status: {}", other).into(),
        )),
    }
}

fn variant_str(variant: AbVariant) -> &'static str {
    match variant {
        AbVariant::A => "a",
        AbVariant::B => "b",
    }
}

fn parse_variant(index: usize, value: Option<String>) -> rusqlite::Result<Option<AbVariant>> {
    match value.as_deref() {
        None => Ok(None),
        Some("a") => Ok(Some(AbVariant::A)),
        Some("b") => Ok(Some(AbVariant::B)),
        Some(other) => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown ab variant: {}", other).into(),
        )),
    }
}

const SELECT_COLUMNS: &str = r#"
    id, campaign_id, step_number, recipient, subject, body,
    provider_message_id, tracking_id, status, ab_variant, crm_synced,
    open_count, first_opened_at, clicked_at, replied, skip_follow_up,
    created_at, updated_at
"#;

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EmailRecord> {
    let status: String = row.get(8)?;

    Ok(EmailRecord {
        id: EmailRecordId(row.get(0)?),
        campaign_id: CampaignId(row.get(1)?),
        step_number: row.get(2)?,
        recipient: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        provider_message_id: row.get(6)?,
        tracking_id: TrackingId(row.get(7)?),
        status: parse_status(8, &status)?,
        ab_variant: parse_variant(9, row.get(9)?)?,
        crm_synced: row.get::<_, i64>(10)? != 0,
        open_count: row.get(11)?,
        first_opened_at: parse_opt_datetime(12, row.get(12)?)?,
        clicked_at: parse_opt_datetime(13, row.get(13)?)?,
        replied: row.get::<_, i64>(14)? != 0,
        skip_follow_up: row.get::<_, i64>(15)? != 0,
        created_at: parse_datetime(16, row.get(16)?)?,
        updated_at: parse_datetime(17, row.get(17)?)?,
    })
}

/// Inserts a new email record.
pub async fn insert(db: &Database, record: &EmailRecord) -> Result<()> {
    let record = record.clone();

    db.with_conn(move |conn| {
        conn.execute(
            r#"
            INSERT INTO email_records (
                id, campaign_id, step_number, recipient, subject, body,
                provider_message_id, tracking_id, status, ab_variant, crm_synced,
                open_count, first_opened_at, clicked_at, replied, skip_follow_up,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
            params![
                record.id.0,
                record.campaign_id.0,
                record.step_number,
                record.recipient,
                record.subject,
                record.body,
                record.provider_message_id,
                record.tracking_id.0,
                status_str(record.status),
                record.ab_variant.map(variant_str),
                record.crm_synced as i64,
                record.open_count,
                record.first_opened_at.map(|t| t.to_rfc3339()),
                record.clicked_at.map(|t| t.to_rfc3339()),
                record.replied as i64,
                record.skip_follow_up as i64,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    })
    .await
}

/// Replaces a record's stored state.
pub async fn update(db: &Database, record: &EmailRecord) -> Result<()> {
    let record = record.clone();

    db.with_conn(move |conn| {
        conn.execute(
            r#"
            UPDATE email_records SET
                status = ?2, provider_message_id = ?3, ab_variant = ?4,
                crm_synced = ?5, open_count = ?6, first_opened_at = ?7,
                clicked_at = ?8, replied = ?9, skip_follow_up = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                record.id.0,
                status_str(record.status),
                record.provider_message_id,
                record.ab_variant.map(variant_str),
                record.crm_synced as i64,
                record.open_count,
                record.first_opened_at.map(|t| t.to_rfc3339()),
                record.clicked_at.map(|t| t.to_rfc3339()),
                record.replied as i64,
                record.skip_follow_up as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    })
    .await
}

/// Retrieves all records for a campaign.
pub async fn get_by_campaign(db: &Database, campaign_id: &CampaignId) -> Result<Vec<EmailRecord>> {
    let campaign_id = campaign_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM email_records WHERE campaign_id = ?1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([&campaign_id.0], row_to_record)?;
        let records: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(records?)
    })
    .await
}

/// Finds the most recent record for an exact (campaign, recipient, step)
/// triple.
pub async fn find_for_send(
    db: &Database,
    campaign_id: &CampaignId,
    recipient: &str,
    step_number: u32,
) -> Result<Option<EmailRecord>> {
    let campaign_id = campaign_id.clone();
    let recipient = recipient.to_string();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM email_records
            WHERE campaign_id = ?1 AND recipient = ?2 AND step_number = ?3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        ))?;
        let result = stmt
            .query_row(params![campaign_id.0, recipient, step_number], row_to_record)
            .optional()?;
        Ok(result)
    })
    .await
}

/// Finds the most recent record for a recipient across steps earlier than
/// `step_number` in the same campaign.
pub async fn latest_before_step(
    db: &Database,
    campaign_id: &CampaignId,
    recipient: &str,
    step_number: u32,
) -> Result<Option<EmailRecord>> {
    let campaign_id = campaign_id.clone();
    let recipient = recipient.to_string();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM email_records
            WHERE campaign_id = ?1 AND recipient = ?2 AND step_number < ?3
            ORDER BY step_number DESC, created_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        ))?;
        let result = stmt
            .query_row(params![campaign_id.0, recipient, step_number], row_to_record)
            .optional()?;
        Ok(result)
    })
    .await
}

/// Returns the most recently created non-terminal records that have a
/// provider message id, newest first.
pub async fn recent_unsettled(db: &Database, limit: usize) -> Result<Vec<EmailRecord>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM email_records
            WHERE status NOT IN ('failed', 'bounced', 'replied', 'complained')
              AND provider_message_id IS NOT NULL
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([limit as i64], row_to_record)?;
        let records: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(records?)
    })
    .await
}

/// Sets the replied flag on a record.
pub async fn mark_replied(db: &Database, id: &EmailRecordId) -> Result<()> {
    let id = id.clone();

    db.with_conn(move |conn| {
        conn.execute(
            "UPDATE email_records SET replied = 1, updated_at = ?2 WHERE id = ?1",
            params![id.0, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
    .await
}
