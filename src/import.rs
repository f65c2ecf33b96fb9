//! CSV bulk import into an existing table.
//!
//! The pipeline is linear with an early exit at every precondition:
//! file exists → parse → introspect → map → project → materialize → insert.
//! Nothing touches the database before the file is fully parsed, and the
//! insert runs in a single transaction, so a failed import leaves the table
//! as it was.
//!
//! Every failure is reported as an [`ImportError`] for that one table. The
//! caller decides whether to continue with the next file; nothing here
//! panics or exits.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    io_utils::{self, CsvContents},
    mapping::ColumnMapping,
    store::{TableSchema, TableStore},
    synonyms::SynonymTable,
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("skipped: file not found ({})", path.display())]
    FileMissing { path: PathBuf },
    #[error("skipped: parse error in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed: could not read columns of table '{table}': {reason}")]
    SchemaIntrospection { table: String, reason: String },
    #[error("skipped: no matching columns for table '{table}'")]
    NoMappableColumns { table: String },
    #[error("failed: inserting into '{table}': {source}")]
    Insertion {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl ImportError {
    /// Skips are expected outcomes of a setup run; failures are not.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ImportError::FileMissing { .. }
                | ImportError::Parse { .. }
                | ImportError::NoMappableColumns { .. }
        )
    }
}

/// Everything resolved before insertion: the parsed file, the live table
/// schema, and the header mapping.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub source: PathBuf,
    pub contents: CsvContents,
    pub schema: TableSchema,
    pub mapping: ColumnMapping,
}

impl ImportPlan {
    /// One tuple per source record, in file order.
    pub fn rows(&self) -> Vec<Vec<Option<String>>> {
        self.contents
            .records
            .iter()
            .map(|record| self.mapping.project(record))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub table: String,
    pub source: PathBuf,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub mapping: ColumnMapping,
}

impl ImportReport {
    pub fn rows_ignored(&self) -> usize {
        self.rows_read.saturating_sub(self.rows_inserted)
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: loaded {} row(s) from {} (inserted {}, ignored {})",
            self.table,
            self.rows_read,
            file_label(&self.source),
            self.rows_inserted,
            self.rows_ignored()
        )
    }
}

#[derive(Debug, Clone)]
pub struct CsvImporter {
    synonyms: SynonymTable,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self {
            synonyms: SynonymTable::default(),
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

impl CsvImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// `None` picks the delimiter from the file extension.
    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Runs every step short of insertion. Used for dry runs and as the
    /// first half of [`CsvImporter::import_csv`].
    pub fn plan<S>(&self, store: &S, csv_path: &Path, table: &str) -> Result<ImportPlan, ImportError>
    where
        S: TableStore + ?Sized,
    {
        if !csv_path.exists() {
            return Err(ImportError::FileMissing {
                path: csv_path.to_path_buf(),
            });
        }

        let delimiter = io_utils::resolve_input_delimiter(csv_path, self.delimiter);
        let contents = io_utils::read_csv_file(csv_path, delimiter, self.encoding).map_err(
            |err| ImportError::Parse {
                path: csv_path.to_path_buf(),
                reason: format!("{err:#}"),
            },
        )?;
        info!(
            "Read {} row(s) from {}",
            contents.row_count(),
            file_label(csv_path)
        );

        let schema = store
            .table_schema(table)
            .map_err(|err| ImportError::SchemaIntrospection {
                table: table.to_string(),
                reason: err.to_string(),
            })?;
        if schema.is_empty() {
            return Err(ImportError::SchemaIntrospection {
                table: table.to_string(),
                reason: "table does not exist".to_string(),
            });
        }
        debug!("Table columns for {table}: {:?}", schema.column_names());

        let mapping =
            ColumnMapping::resolve(&contents.headers, &schema.column_names(), &self.synonyms);
        for column in mapping.columns() {
            debug!(
                "  {} -> {} ({})",
                column.source, column.target, column.kind
            );
        }
        if !mapping.dropped().is_empty() {
            debug!("Dropping unmapped header(s): {:?}", mapping.dropped());
        }
        if mapping.is_empty() {
            return Err(ImportError::NoMappableColumns {
                table: table.to_string(),
            });
        }

        Ok(ImportPlan {
            source: csv_path.to_path_buf(),
            contents,
            schema,
            mapping,
        })
    }

    /// Loads `csv_path` into the existing `table` with insert-or-ignore
    /// semantics. Rows already present (by the table's unique keys) are left
    /// untouched and counted as ignored.
    pub fn import_csv<S>(
        &self,
        store: &mut S,
        csv_path: &Path,
        table: &str,
    ) -> Result<ImportReport, ImportError>
    where
        S: TableStore + ?Sized,
    {
        let result = self.try_import(store, csv_path, table);
        match &result {
            Ok(report) => info!("✓ {report}"),
            Err(err) if err.is_skip() => {
                warn!("{} -> {table}: {err}", file_label(csv_path))
            }
            Err(err) => error!("{} -> {table}: {err}", file_label(csv_path)),
        }
        result
    }

    /// [`CsvImporter::import_csv`] without logging the outcome, for callers
    /// that report it themselves.
    pub fn try_import<S>(
        &self,
        store: &mut S,
        csv_path: &Path,
        table: &str,
    ) -> Result<ImportReport, ImportError>
    where
        S: TableStore + ?Sized,
    {
        let plan = self.plan(&*store, csv_path, table)?;
        let rows = plan.rows();
        let columns = plan.mapping.target_columns();
        debug!("Inserting {} row(s) into {table}", rows.len());

        let rows_inserted = store
            .insert_or_ignore(table, &columns, &rows)
            .map_err(|source| ImportError::Insertion {
                table: table.to_string(),
                source,
            })?;

        Ok(ImportReport {
            table: table.to_string(),
            source: plan.source.clone(),
            rows_read: rows.len(),
            rows_inserted,
            mapping: plan.mapping,
        })
    }
}

/// Imports with the built-in synonyms and delimiter detection.
pub fn import_csv<S>(
    store: &mut S,
    csv_path: &Path,
    table: &str,
) -> Result<ImportReport, ImportError>
where
    S: TableStore + ?Sized,
{
    CsvImporter::default().import_csv(store, csv_path, table)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
