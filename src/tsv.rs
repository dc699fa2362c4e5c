// src/tsv.rs

// Shared tab-separated table loading and saving. Every input the tool
// reads (boundary files, grouping files, region lists) goes through the
// same loader: blank lines are skipped, fields are trimmed, and rows
// that fail per-column coercion are dropped without stopping the run.

use std::io;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

/// Per-column coercion applied by [`coerce_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    Str,
    Int,
    Float,
}

/// One coerced field of a table row.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Field {
    pub fn str_value(&self) -> Option<&str> {
        match self {
            Field::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match self {
            Field::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self {
            Field::Float(value) => Some(*value),
            _ => None,
        }
    }
}

fn csv_error(error: csv::Error) -> io::Error {
    match error.into_kind() {
        csv::ErrorKind::Io(io_error) => io_error,
        other => io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", other)),
    }
}

/// Load a delimited file into trimmed string rows. Blank lines and
/// whitespace-only rows are skipped.
pub fn load_rows<P: AsRef<Path>>(path: P, delimiter: u8) -> io::Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())
        .map_err(csv_error)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: Vec<String> = record.iter().map(|field| field.trim().to_string()).collect();
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Drop the first row (the column header line) if the table has one.
pub fn strip_header(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    if !rows.is_empty() {
        rows.remove(0);
    }
    rows
}

/// Coerce string rows by a per-column format spec. Rows that are shorter
/// than the spec or fail a numeric coercion are silently discarded.
pub fn coerce_rows(rows: &[Vec<String>], spec: &[ColumnFormat]) -> Vec<Vec<Field>> {
    rows.iter()
        .filter_map(|row| coerce_row(row, spec))
        .collect()
}

fn coerce_row(row: &[String], spec: &[ColumnFormat]) -> Option<Vec<Field>> {
    if row.len() < spec.len() {
        return None;
    }
    spec.iter()
        .zip(row)
        .map(|(format, raw)| match format {
            ColumnFormat::Str => Some(Field::Str(raw.clone())),
            // Integer columns accept float spellings ("3000.0") and
            // truncate toward zero.
            ColumnFormat::Int => raw.parse::<f64>().ok().map(|value| Field::Int(value as i64)),
            ColumnFormat::Float => raw.parse::<f64>().ok().map(Field::Float),
        })
        .collect()
}

/// Write rows as a delimited file, with an optional header line first.
pub fn save_rows<P: AsRef<Path>>(
    path: P,
    header: Option<&[&str]>,
    rows: &[Vec<String>],
    delimiter: u8,
) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())
        .map_err(csv_error)?;

    if let Some(header) = header {
        writer.write_record(header).map_err(csv_error)?;
    }
    for row in rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}
