//! Canonical table definitions for the intelligence platform store.
//!
//! Each table carries a natural uniqueness key so `INSERT OR IGNORE` makes
//! repeated imports additive-once:
//!
//! - `cyber_incidents`: `UNIQUE(title, date, incident_type)`
//! - `datasets_metadata`: `dataset_name` is unique
//! - `it_tickets`: keyed by the text `ticket_id`
//!
//! SQLite treats NULLs as distinct inside a UNIQUE constraint, so incident
//! rows missing any key column are not deduplicated.

use anyhow::{Context, Result};
use log::info;
use rusqlite::Connection;

pub const CYBER_INCIDENTS: &str = "cyber_incidents";
pub const DATASETS_METADATA: &str = "datasets_metadata";
pub const IT_TICKETS: &str = "it_tickets";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainTable {
    pub table: &'static str,
    pub csv_file: &'static str,
    pub ddl: &'static str,
}

pub const DOMAIN_TABLES: &[DomainTable] = &[
    DomainTable {
        table: CYBER_INCIDENTS,
        csv_file: "cyber_incidents.csv",
        ddl: "CREATE TABLE IF NOT EXISTS cyber_incidents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            date TEXT,
            affiliations TEXT,
            description TEXT,
            response TEXT,
            victims TEXT,
            sponsor TEXT,
            incident_type TEXT,
            category TEXT,
            sources_1 TEXT,
            sources_2 TEXT,
            sources_3 TEXT,
            severity TEXT,
            status TEXT,
            reported_by TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (title, date, incident_type)
        )",
    },
    DomainTable {
        table: DATASETS_METADATA,
        csv_file: "datasets_metadata.csv",
        ddl: "CREATE TABLE IF NOT EXISTS datasets_metadata (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_name TEXT NOT NULL UNIQUE,
            file_type TEXT,
            size_mb REAL,
            date_created TEXT
        )",
    },
    DomainTable {
        table: IT_TICKETS,
        csv_file: "it_tickets.csv",
        ddl: "CREATE TABLE IF NOT EXISTS it_tickets (
            ticket_id TEXT PRIMARY KEY,
            priority TEXT,
            status TEXT,
            category TEXT,
            subject TEXT,
            description TEXT,
            created_date TEXT,
            resolved_date TEXT,
            assigned_to TEXT
        )",
    },
];

/// Creates every domain table that does not exist yet, in one transaction.
pub fn create_all_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction().context("Starting schema transaction")?;
    for domain in DOMAIN_TABLES {
        tx.execute_batch(domain.ddl)
            .with_context(|| format!("Creating table {}", domain.table))?;
    }
    tx.commit().context("Committing schema")?;
    info!("Ensured {} domain table(s)", DOMAIN_TABLES.len());
    Ok(())
}
