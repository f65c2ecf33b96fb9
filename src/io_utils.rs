//! CSV reading helpers shared by the importer and the mapping preview.
//!
//! - **Delimiter resolution**: extension-based detection (`.tsv` → tab,
//!   anything else → comma) with manual override.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Loading**: [`read_csv_file`] pulls the header and every record into
//!   memory so a malformed file is rejected before the database is touched.

use std::{fs::File, io::BufReader, io::Read, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// A fully loaded CSV file. Empty fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvContents {
    pub headers: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl CsvContents {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Rows may be shorter than the header (missing trailing fields become
/// null); rows wider than the header are rejected in [`read_csv`].
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn read_csv<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<CsvContents>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let header_record = reader.byte_headers().context("Reading header row")?.clone();
    let headers = decode_record(&header_record, encoding).context("Decoding header row")?;
    if headers.is_empty() {
        bail!("No columns to parse: the file has no header row");
    }

    let mut records = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let line = row_idx + 2;
        let record = record.with_context(|| format!("Reading row {line}"))?;
        if record.len() > headers.len() {
            bail!(
                "Row {line} has {} field(s) but the header declares {}",
                record.len(),
                headers.len()
            );
        }
        let decoded =
            decode_record(&record, encoding).with_context(|| format!("Decoding row {line}"))?;
        records.push(
            decoded
                .into_iter()
                .map(|value| if value.is_empty() { None } else { Some(value) })
                .collect(),
        );
    }

    Ok(CsvContents { headers, records })
}

pub fn read_csv_file(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<CsvContents> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_csv(BufReader::new(file), delimiter, encoding)
}
