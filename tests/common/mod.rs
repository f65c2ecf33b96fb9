#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use intel_import::{config::DatabaseConfig, schema};
use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

/// Scratch directory with its own SQLite database, removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn database_path(&self) -> PathBuf {
        self.path().join("platform.db")
    }

    /// Opens the workspace database with the canonical tables created.
    pub fn open_database(&self) -> Connection {
        let mut conn = DatabaseConfig::new(self.database_path())
            .open()
            .expect("open database");
        schema::create_all_tables(&mut conn).expect("create tables");
        conn
    }

    /// Opens the workspace database without creating any tables.
    pub fn open_bare_database(&self) -> Connection {
        DatabaseConfig::new(self.database_path())
            .open()
            .expect("open database")
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

/// Every row of `table` as text, ordered, with NULL rendered as `None`.
pub fn dump_rows(conn: &Connection, table: &str, columns: &[&str]) -> Vec<Vec<Option<String>>> {
    let column_list = columns.join(", ");
    let sql = format!("SELECT {column_list} FROM {table} ORDER BY {column_list}");
    let mut stmt = conn.prepare(&sql).expect("prepare dump");
    stmt.query_map([], |row| {
        (0..columns.len())
            .map(|idx| row.get::<_, Option<String>>(idx))
            .collect::<rusqlite::Result<Vec<_>>>()
    })
    .expect("query dump")
    .collect::<rusqlite::Result<Vec<_>>>()
    .expect("collect dump")
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .expect("count rows")
}
