use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of an OCR engine's output for one document.
///
/// The engine itself is a black box; anything that can answer these four
/// questions can be fed to [`crate::DocumentExtractor`].
pub trait InferenceResult {
    /// Text of the first predicted field carrying `label`, if any.
    fn field_value(&self, label: &str) -> Option<&str>;
    fn pages(&self) -> &[Page];
    fn filename(&self) -> &str;
    /// Where the original upload can be downloaded from.
    fn file_url(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub label: String,
    #[serde(default, alias = "value", alias = "ocr_text")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub text: String,
}

/// A detected region on a page: a table, or any other labeled box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub label: String,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub boxes: Vec<Region>,
}

impl Page {
    pub fn boxes(&self) -> &[Region] {
        &self.boxes
    }
}

/// JSON-backed inference result, the shape the OCR service hands over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceDocument {
    pub filename: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl InferenceDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl InferenceResult for InferenceDocument {
    fn field_value(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.text.as_str())
    }

    fn pages(&self) -> &[Page] {
        &self.pages
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn file_url(&self) -> &str {
        &self.file_url
    }
}

// ── Table view ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub index: u32,
    pub cells: Vec<&'a Cell>,
}

/// Row-major view over a table region's flat cell list.
pub struct Table<'a> {
    region: &'a Region,
}

impl<'a> Table<'a> {
    pub fn new(region: &'a Region) -> Self {
        Self { region }
    }

    /// Cells grouped by `row`, rows ascending, cells ascending by `col`.
    pub fn rows(&self) -> Vec<Row<'a>> {
        let mut grouped: BTreeMap<u32, Vec<&'a Cell>> = BTreeMap::new();
        for cell in &self.region.cells {
            grouped.entry(cell.row).or_default().push(cell);
        }
        grouped
            .into_iter()
            .map(|(index, mut cells)| {
                cells.sort_by_key(|c| c.col);
                Row { index, cells }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: u32, col: u32, label: &str, text: &str) -> Cell {
        Cell { row, col, label: label.into(), text: text.into() }
    }

    #[test]
    fn field_value_returns_first_match() {
        let doc = InferenceDocument {
            fields: vec![
                Field { label: "vendor_name".into(), text: "ACME".into() },
                Field { label: "vendor_name".into(), text: "OTHER".into() },
            ],
            ..Default::default()
        };
        assert_eq!(doc.field_value("vendor_name"), Some("ACME"));
        assert_eq!(doc.field_value("po_date"), None);
    }

    #[test]
    fn from_json_accepts_minimal_document() {
        let doc = InferenceDocument::from_json(r#"{"filename": "bill.pdf"}"#).unwrap();
        assert_eq!(doc.filename(), "bill.pdf");
        assert_eq!(doc.file_url(), "");
        assert!(doc.pages().is_empty());
    }

    #[test]
    fn from_json_reads_pages_and_value_alias() {
        let json = r#"{
            "filename": "bill.pdf",
            "file_url": "https://files.example/bill.pdf",
            "fields": [{"label": "BillNumber", "value": "INV-7"}],
            "pages": [{"boxes": [{"label": "table", "cells": [
                {"row": 1, "col": 1, "label": "Description", "text": "Bolts"}
            ]}]}]
        }"#;
        let doc = InferenceDocument::from_json(json).unwrap();
        assert_eq!(doc.field_value("BillNumber"), Some("INV-7"));
        assert_eq!(doc.pages()[0].boxes()[0].cells[0].text, "Bolts");
    }

    #[test]
    fn table_groups_and_orders_rows() {
        let region = Region {
            label: "table".into(),
            cells: vec![
                cell(2, 2, "Line_amount", "10"),
                cell(1, 2, "Line_amount", "5"),
                cell(2, 1, "Description", "Nuts"),
                cell(1, 1, "Description", "Bolts"),
            ],
        };
        let rows = Table::new(&region).rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].cells[0].text, "Bolts");
        assert_eq!(rows[1].cells[0].text, "Nuts");
        assert_eq!(rows[1].cells[1].text, "10");
    }

    #[test]
    fn empty_table_has_no_rows() {
        let region = Region { label: "table".into(), cells: vec![] };
        assert!(Table::new(&region).rows().is_empty());
    }
}
