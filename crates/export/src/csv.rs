use billcapture_core::LineItem;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// One CSV row; column names match the payload's item keys.
#[derive(Debug, Serialize)]
struct LineItemRow<'a> {
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Line_amount", with = "rust_decimal::serde::float")]
    line_amount: Decimal,
}

/// Write `Description,Line_amount` rows in payload order. Returns the number
/// of rows written; an empty slice writes nothing, not even the header.
pub fn export_line_items<W: Write>(items: &[LineItem], writer: W) -> Result<usize, ExportError> {
    if items.is_empty() {
        tracing::info!("no line items to export");
        return Ok(0);
    }

    let mut wtr = csv::Writer::from_writer(writer);
    for item in items {
        wtr.serialize(LineItemRow { description: &item.description, line_amount: item.line_amount })?;
    }
    wtr.flush()?;
    Ok(items.len())
}

pub fn export_line_items_to_path(items: &[LineItem], path: &Path) -> Result<usize, ExportError> {
    if items.is_empty() {
        tracing::info!("no line items to export");
        return Ok(0);
    }
    let written = export_line_items(items, File::create(path)?)?;
    tracing::info!(rows = written, path = %path.display(), "line items exported");
    Ok(written)
}
