//! One-shot database setup: create the domain tables, import each domain CSV
//! from a data directory, then count what landed.
//!
//! A failed import never stops the run; it is recorded and the next table
//! is attempted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use rusqlite::Connection;

use crate::{
    import::{CsvImporter, ImportError, ImportReport},
    schema::{self, DOMAIN_TABLES},
    store,
    table::{Align, TextTable},
};

#[derive(Debug)]
pub struct TableOutcome {
    pub table: String,
    pub source: PathBuf,
    pub result: Result<ImportReport, ImportError>,
}

impl TableOutcome {
    pub fn status_line(&self) -> String {
        match &self.result {
            Ok(report) => format!("✓ {report}"),
            Err(err) => format!("✗ {}: {err}", self.table),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCount {
    pub table: String,
    /// `None` when the table does not exist.
    pub rows: Option<i64>,
}

#[derive(Debug)]
pub struct SetupReport {
    pub outcomes: Vec<TableOutcome>,
    pub row_counts: Vec<RowCount>,
}

impl SetupReport {
    pub fn imported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn rows_inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|report| report.rows_inserted)
            .sum()
    }
}

pub fn setup_database(
    conn: &mut Connection,
    data_dir: &Path,
    importer: &CsvImporter,
) -> Result<SetupReport> {
    schema::create_all_tables(conn).context("Creating domain tables")?;

    let mut outcomes = Vec::with_capacity(DOMAIN_TABLES.len());
    for domain in DOMAIN_TABLES {
        let source = data_dir.join(domain.csv_file);
        let result = importer.import_csv(conn, &source, domain.table);
        outcomes.push(TableOutcome {
            table: domain.table.to_string(),
            source,
            result,
        });
    }

    let tables = DOMAIN_TABLES.iter().map(|d| d.table).collect::<Vec<_>>();
    let row_counts = count_rows(conn, &tables)?;
    let report = SetupReport {
        outcomes,
        row_counts,
    };
    info!(
        "Setup imported {}/{} table(s), {} new row(s)",
        report.imported(),
        DOMAIN_TABLES.len(),
        report.rows_inserted()
    );
    Ok(report)
}

pub fn count_rows(conn: &Connection, tables: &[&str]) -> Result<Vec<RowCount>> {
    tables
        .iter()
        .map(|table| -> Result<RowCount> {
            let rows = if store::table_exists(conn, table)
                .with_context(|| format!("Checking for table {table}"))?
            {
                Some(
                    store::row_count(conn, table)
                        .with_context(|| format!("Counting rows in {table}"))?,
                )
            } else {
                None
            };
            Ok(RowCount {
                table: table.to_string(),
                rows,
            })
        })
        .collect()
}

pub fn summary_table(counts: &[RowCount]) -> TextTable {
    let mut table = TextTable::new(["Table", "Row Count"]).align(1, Align::Right);
    for count in counts {
        let rows = count
            .rows
            .map(|n| n.to_string())
            .unwrap_or_else(|| "N/A (not found)".to_string());
        table.push_row([count.table.clone(), rows]);
    }
    table
}
