//! File-backed table access for the directory data source.
//!
//! A table named `sales` lives in the source directory as one of:
//!
//! - `sales.csv` / `sales.tsv`: header row, delimiter picked from the
//!   extension, cells read as verbatim text (blank → null).
//! - `sales.jsonl` / `sales.ndjson`: one JSON object per line, scalar types
//!   kept as-is.
//!
//! Input decoding goes through `encoding_rs`, defaulting to UTF-8.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::value::{Row, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "jsonl", "ndjson"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited { delimiter: u8 },
    JsonLines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    pub path: PathBuf,
    pub format: TableFormat,
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

/// Table names map straight to file stems, so anything that could walk out
/// of the source directory is rejected.
pub fn is_valid_table_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

pub fn locate_table(root: &Path, name: &str, delimiter: Option<u8>) -> Option<TableFile> {
    if !is_valid_table_name(name) {
        return None;
    }
    TABLE_EXTENSIONS.iter().find_map(|ext| {
        let path = root.join(format!("{name}.{ext}"));
        if !path.is_file() {
            return None;
        }
        let format = match *ext {
            "jsonl" | "ndjson" => TableFormat::JsonLines,
            _ => TableFormat::Delimited {
                delimiter: resolve_input_delimiter(&path, delimiter),
            },
        };
        Some(TableFile { path, format })
    })
}

pub fn read_table(table: &TableFile, encoding: &'static Encoding) -> Result<Vec<Row>> {
    match table.format {
        TableFormat::Delimited { delimiter } => read_delimited(&table.path, delimiter, encoding),
        TableFormat::JsonLines => read_json_lines(&table.path, encoding),
    }
}

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

fn read_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("Opening table file {path:?}"))?;
    let mut reader = open_csv_reader(BufReader::new(file), delimiter);
    let headers = reader_headers(&mut reader, encoding)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)?;
        rows.push(
            headers
                .iter()
                .zip(decoded)
                .map(|(header, raw)| (header.clone(), delimited_cell(&raw)))
                .collect(),
        );
    }
    Ok(rows)
}

fn read_json_lines(path: &Path, encoding: &'static Encoding) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("Opening table file {path:?}"))?;
    let mut rows = Vec::new();
    for (line_idx, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.with_context(|| format!("Reading line {}", line_idx + 1))?;
        let text = decode_bytes(&line, encoding)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(trimmed)
            .with_context(|| format!("Parsing JSON object on line {}", line_idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Delimited files carry no types. Blank cells are null and everything else
/// stays verbatim text; numeric roles parse it on demand, so `01` and `1`
/// remain distinct categories.
pub fn delimited_cell(raw: &str) -> Value {
    if raw.trim().is_empty() {
        Value::Null
    } else {
        Value::Text(raw.to_string())
    }
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

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}
