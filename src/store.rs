//! SQLite access used by the importer: column introspection and batched
//! insert-or-ignore.
//!
//! [`TableStore`] is the whole surface the importer needs, so tests can swap
//! the connection for a recording fake.

use itertools::Itertools;
use log::debug;
use rusqlite::{Connection, params, params_from_iter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

impl ColumnInfo {
    /// Declared type with its constraints, e.g. `TEXT NOT NULL`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.declared_type.is_empty() {
            parts.push(self.declared_type.as_str());
        }
        if self.primary_key {
            parts.push("PRIMARY KEY");
        } else if self.not_null {
            parts.push("NOT NULL");
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// A table that does not exist introspects as having no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

pub trait TableStore {
    /// Reads the live column list of `table`.
    fn table_schema(&self, table: &str) -> rusqlite::Result<TableSchema>;

    /// Inserts `rows` with `INSERT OR IGNORE` inside one transaction and
    /// commits. Returns the number of rows actually inserted.
    fn insert_or_ignore(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Option<String>>],
    ) -> rusqlite::Result<usize>;
}

impl TableStore for Connection {
    fn table_schema(&self, table: &str) -> rusqlite::Result<TableSchema> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let mut stmt = self.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    primary_key: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(TableSchema {
            table: table.to_string(),
            columns,
        })
    }

    fn insert_or_ignore(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Option<String>>],
    ) -> rusqlite::Result<usize> {
        let sql = insert_or_ignore_sql(table, columns);
        debug!("{sql}");

        let tx = self.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                inserted += stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn insert_or_ignore_sql(table: &str, columns: &[&str]) -> String {
    let column_list = columns.iter().map(|c| quote_identifier(c)).join(", ");
    let placeholders = (1..=columns.len()).map(|idx| format!("?{idx}")).join(", ");
    format!(
        "INSERT OR IGNORE INTO {} ({column_list}) VALUES ({placeholders})",
        quote_identifier(table)
    )
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table],
        |row| row.get(0),
    )
}

pub fn row_count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    conn.query_row(&sql, [], |row| row.get(0))
}
