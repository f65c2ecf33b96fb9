//! Database location and connection settings.
//!
//! The database path is always supplied explicitly so every caller (the CLI,
//! a dashboard host, a test) decides which store it talks to.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;

pub const DEFAULT_DATA_DIR: &str = "DATA";
pub const DEFAULT_DATABASE_FILE: &str = "intelligence_platform.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(Path::new(DEFAULT_DATA_DIR).join(DEFAULT_DATABASE_FILE))
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Opens the database, creating its parent directory when needed.
    ///
    /// Bulk imports can briefly contend with a dashboard holding the same
    /// file, hence the busy timeout.
    pub fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating database directory {parent:?}"))?;
        }
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Opening database {:?}", self.path))?;
        conn.busy_timeout(self.busy_timeout)
            .context("Configuring busy timeout")?;
        debug!("Opened database {:?}", self.path);
        Ok(conn)
    }
}
