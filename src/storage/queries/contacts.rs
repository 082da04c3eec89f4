//! Contact list CRUD operations.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::domain::{Contact, ContactList, ContactListId};
use crate::storage::database::{Database, Result};

/// Inserts a contact list and all of its contacts in one transaction.
pub async fn insert_list(db: &Database, list: &ContactList) -> Result<()> {
    let list = list.clone();

    db.transaction(move |tx| {
        tx.execute(
            "INSERT INTO contact_lists (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![list.id.0, list.name, Utc::now().to_rfc3339()],
        )?;

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO contacts (
                list_id, email, first_name, last_name, company, title, industry, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;
        for (position, contact) in list.contacts.iter().enumerate() {
            stmt.execute(params![
                list.id.0,
                contact.email,
                contact.first_name,
                contact.last_name,
                contact.company,
                contact.title,
                contact.industry,
                position as i64,
            ])?;
        }

        Ok(())
    })
    .await
}

/// Retrieves a contact list with its contacts in send order.
pub async fn get_list(db: &Database, id: &ContactListId) -> Result<Option<ContactList>> {
    let id = id.clone();

    db.with_conn(move |conn| {
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM contact_lists WHERE id = ?1",
                [&id.0],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT email, first_name, last_name, company, title, industry
            FROM contacts
            WHERE list_id = ?1
            ORDER BY position ASC
            "#,
        )?;
        let rows = stmt.query_map([&id.0], |row| {
            Ok(Contact {
                email: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                company: row.get(3)?,
                title: row.get(4)?,
                industry: row.get(5)?,
            })
        })?;
        let contacts: std::result::Result<Vec<_>, _> = rows.collect();

        Ok(Some(ContactList::new(id.clone(), name, contacts?)))
    })
    .await
}
