use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV exports into the intelligence platform database",
    long_about = None
)]
pub struct Cli {
    /// SQLite database file (created if missing)
    #[arg(
        short = 'd',
        long = "database",
        global = true,
        default_value = "DATA/intelligence_platform.db"
    )]
    pub database: PathBuf,
    /// Seconds to wait for a locked database before giving up
    #[arg(
        long = "busy-timeout",
        global = true,
        value_name = "SECONDS",
        default_value_t = 10
    )]
    pub busy_timeout: u64,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the cyber_incidents, datasets_metadata and it_tickets tables
    Init,
    /// Import one CSV file into an existing table
    Import(ImportArgs),
    /// Show how a CSV header would map onto a table without importing
    Mapping(ImportArgs),
    /// Create tables and import every domain CSV found in a data directory
    Setup(SetupArgs),
    /// Print row counts for the domain tables
    Summary,
}

#[derive(Debug, Args)]
pub struct CsvOptions {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file of extra header aliases (`target: [alias, ...]`)
    #[arg(long)]
    pub synonyms: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Input CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination table (must already exist)
    #[arg(short = 't', long = "table")]
    pub table: String,
    #[command(flatten)]
    pub csv: CsvOptions,
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Directory holding cyber_incidents.csv, datasets_metadata.csv and it_tickets.csv
    #[arg(long = "data-dir", default_value = "DATA")]
    pub data_dir: PathBuf,
    #[command(flatten)]
    pub csv: CsvOptions,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
