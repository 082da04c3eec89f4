//! SQL schema definitions as const strings.
//!
//! Contains the complete SQLite schema for the campaign engine.

/// SQL to create the campaigns table. Steps are stored as a JSON column
/// since they are always read and written with their campaign.
pub const CREATE_CAMPAIGNS: &str = r#"
CREATE TABLE IF NOT EXISTS campaigns (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    contact_list_id TEXT NOT NULL,
    steps TEXT NOT NULL,
    status TEXT NOT NULL,
    current_step INTEGER DEFAULT 0,
    started_at TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create campaign indexes.
pub const CREATE_CAMPAIGN_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)
"#;

/// SQL to create the contact lists table.
pub const CREATE_CONTACT_LISTS: &str = r#"
CREATE TABLE IF NOT EXISTS contact_lists (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the contacts table.
pub const CREATE_CONTACTS: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    list_id TEXT NOT NULL REFERENCES contact_lists(id),
    email TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    company TEXT,
    title TEXT,
    industry TEXT,
    position INTEGER NOT NULL,
    PRIMARY KEY (list_id, email)
)
"#;

/// SQL to create the email records table.
pub const CREATE_EMAIL_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS email_records (
    id TEXT PRIMARY KEY,
    campaign_id TEXT NOT NULL,
    step_number INTEGER NOT NULL,
    recipient TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    provider_message_id TEXT,
    tracking_id TEXT NOT NULL,
    status TEXT NOT NULL,
    ab_variant TEXT,
    crm_synced INTEGER DEFAULT 0,
    open_count INTEGER DEFAULT 0,
    first_opened_at TEXT,
    clicked_at TEXT,
    replied INTEGER DEFAULT 0,
    skip_follow_up INTEGER DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create email record indexes.
///
/// The partial unique index enforces at most one non-failed record per
/// (campaign, recipient, step) triple; failed attempts may accumulate.
pub const CREATE_EMAIL_RECORD_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_records_campaign ON email_records(campaign_id);
CREATE INDEX IF NOT EXISTS idx_records_recipient ON email_records(campaign_id, recipient);
CREATE INDEX IF NOT EXISTS idx_records_created ON email_records(created_at DESC);
CREATE UNIQUE INDEX IF NOT EXISTS idx_records_unique_send
    ON email_records(campaign_id, recipient, step_number)
    WHERE status != 'failed'
"#;

/// SQL to create the blacklist table.
pub const CREATE_BLACKLIST: &str = r#"
CREATE TABLE IF NOT EXISTS blacklist (
    email TEXT PRIMARY KEY,
    reason TEXT NOT NULL,
    added_at TEXT NOT NULL
)
"#;

/// SQL to create the warmup state singleton.
pub const CREATE_WARMUP_STATE: &str = r#"
CREATE TABLE IF NOT EXISTS warmup_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    first_send_date TEXT,
    count_date TEXT,
    today_send_count INTEGER DEFAULT 0
);
INSERT OR IGNORE INTO warmup_state (id) VALUES (1)
"#;

/// Returns all migrations in execution order.
pub fn all_migrations() -> &'static [&'static str] {
    &[
        CREATE_CAMPAIGNS,
        CREATE_CAMPAIGN_INDEXES,
        CREATE_CONTACT_LISTS,
        CREATE_CONTACTS,
        CREATE_EMAIL_RECORDS,
        CREATE_EMAIL_RECORD_INDEXES,
        CREATE_BLACKLIST,
        CREATE_WARMUP_STATE,
    ]
}
