//! Campaign CRUD operations.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{Campaign, CampaignId, CampaignStatus, Step};
use crate::storage::database::{Database, Result};

use super::{parse_datetime, parse_opt_datetime};

fn status_str(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Draft => "draft",
        CampaignStatus::Active => "active",
        CampaignStatus::Paused => "paused",
        CampaignStatus::Completed => "completed",
    }
}

fn parse_status(index: usize, value: &str) -> rusqlite::Result<CampaignStatus> {
    match value {
        "draft" => Ok(CampaignStatus::Draft),
        "active" => Ok(CampaignStatus::Active),
        "paused" => Ok(CampaignStatus::Paused),
        "completed" => Ok(CampaignStatus::Completed),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown campaign status: {}", other).into(),
        )),
    }
}

fn row_to_campaign(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    let steps_json: String = row.get(3)?;
    let steps: Vec<Step> = serde_json::from_str(&steps_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
    })?;
    let status: String = row.get(4)?;

    Ok(Campaign {
        id: CampaignId(row.get(0)?),
        name: row.get(1)?,
        contact_list_id: crate::domain::ContactListId(row.get(2)?),
        steps,
        status: parse_status(4, &status)?,
        current_step: row.get(5)?,
        started_at: parse_opt_datetime(6, row.get(6)?)?,
        completed_at: parse_opt_datetime(7, row.get(7)?)?,
        created_at: parse_datetime(8, row.get(8)?)?,
    })
}

const SELECT_COLUMNS: &str = r#"
    id, name, contact_list_id, steps, status, current_step,
    started_at, completed_at, created_at
"#;

/// Inserts a new campaign.
pub async fn insert(db: &Database, campaign: &Campaign) -> Result<()> {
    let campaign = campaign.clone();

    db.with_conn(move |conn| {
        let now = Utc::now().to_rfc3339();
        let steps_json = serde_json::to_string(&campaign.steps).unwrap_or_default();

        conn.execute(
            r#"
            INSERT INTO campaigns (
                id, name, contact_list_id, steps, status, current_step,
                started_at, completed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                campaign.id.0,
                campaign.name,
                campaign.contact_list_id.0,
                steps_json,
                status_str(campaign.status),
                campaign.current_step,
                campaign.started_at.map(|t| t.to_rfc3339()),
                campaign.completed_at.map(|t| t.to_rfc3339()),
                campaign.created_at.to_rfc3339(),
                now,
            ],
        )?;

        Ok(())
    })
    .await
}

/// Replaces a campaign's stored state.
pub async fn update(db: &Database, campaign: &Campaign) -> Result<()> {
    let campaign = campaign.clone();

    db.with_conn(move |conn| {
        let now = Utc::now().to_rfc3339();
        let steps_json = serde_json::to_string(&campaign.steps).unwrap_or_default();

        conn.execute(
            r#"
            UPDATE campaigns SET
                name = ?2, contact_list_id = ?3, steps = ?4, status = ?5,
                current_step = ?6, started_at = ?7, completed_at = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                campaign.id.0,
                campaign.name,
                campaign.contact_list_id.0,
                steps_json,
                status_str(campaign.status),
                campaign.current_step,
                campaign.started_at.map(|t| t.to_rfc3339()),
                campaign.completed_at.map(|t| t.to_rfc3339()),
                now,
            ],
        )?;

        Ok(())
    })
    .await
}

/// Retrieves a campaign by its ID.
pub async fn get_by_id(db: &Database, id: &CampaignId) -> Result<Option<Campaign>> {
    let id = id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM campaigns WHERE id = ?1",
            SELECT_COLUMNS
        ))?;
        let result = stmt.query_row([&id.0], row_to_campaign).optional()?;
        Ok(result)
    })
    .await
}

/// Retrieves all campaigns with the given status.
pub async fn by_status(db: &Database, status: CampaignStatus) -> Result<Vec<Campaign>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM campaigns WHERE status = ?1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([status_str(status)], row_to_campaign)?;
        let campaigns: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(campaigns?)
    })
    .await
}
