use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use billcapture_core::{
    DocumentPayload, ExtractionSettings, FieldLabels, LineItem, LineItemColumn, OriginalFile,
    ProfileKind,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::fetch::FileSource;
use crate::inference::{InferenceResult, Row, Table};

pub const PO_DATE_TIME_SUFFIX: &str = "T00:00:00Z";
pub const DEFAULT_FILE_TYPE: &str = "PDF";

/// Problems with a single OCR value. Never escapes [`DocumentExtractor::extract`]:
/// the value falls back to a default and the error is logged.
#[derive(Debug, Error, PartialEq)]
pub enum FieldExtractionError {
    #[error("Unrecognised date: '{0}'")]
    InvalidDate(String),
    #[error("Not a number after digit extraction: '{0}'")]
    InvalidNumber(String),
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_number, r"\d+\.\d+|\d+");

re!(re_date_month_name,
    r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[\s\-]+(\d{1,2})(?:st|nd|rd|th)?,?[\s\-]+(\d{4}|\d{2})\b");
re!(re_date_day_month,
    r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?[\s\-]+(\d{4}|\d{2})\b");
re!(re_date_iso,
    r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b");
re!(re_date_numeric,
    r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})\b");

// ── Extraction profile ────────────────────────────────────────────────────────

/// Which OCR labels feed which payload fields.
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    pub labels: FieldLabels,
    pub columns: Vec<LineItemColumn>,
    pub table_label: String,
    pub po_date_suffix_on_fallback: bool,
    /// `payload key -> OCR label` for fields beyond the fixed set.
    pub extra_fields: BTreeMap<String, String>,
}

impl ExtractionProfile {
    pub fn full() -> Self {
        Self {
            labels: FieldLabels::default(),
            columns: LineItemColumn::ALL.to_vec(),
            table_label: "table".to_string(),
            po_date_suffix_on_fallback: true,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn amount_only() -> Self {
        Self {
            columns: vec![LineItemColumn::Description, LineItemColumn::LineAmount],
            ..Self::full()
        }
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Self {
        let base = match settings.profile {
            ProfileKind::Full => Self::full(),
            ProfileKind::AmountOnly => Self::amount_only(),
        };
        Self {
            labels: settings.labels.clone(),
            table_label: settings.table_label.clone(),
            po_date_suffix_on_fallback: settings.po_date_suffix_on_fallback,
            extra_fields: settings.extra_fields.clone(),
            ..base
        }
    }

    fn column_for(&self, label: &str) -> Option<LineItemColumn> {
        self.columns.iter().copied().find(|c| c.label() == label)
    }
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self::full()
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Maps an inference result onto the ERP payload, best-effort: every field
/// that cannot be read is replaced by its default and logged.
pub struct DocumentExtractor<F: FileSource> {
    profile: ExtractionProfile,
    files: F,
}

impl<F: FileSource> DocumentExtractor<F> {
    pub fn new(profile: ExtractionProfile, files: F) -> Self {
        Self { profile, files }
    }

    pub fn profile(&self) -> &ExtractionProfile {
        &self.profile
    }

    pub fn extract<I: InferenceResult + ?Sized>(&self, inference: &I) -> DocumentPayload {
        let labels = &self.profile.labels;
        let items = self.line_items(inference);

        let payload = DocumentPayload {
            company_name: String::new(),
            vendor_name: field(inference, &labels.vendor_name),
            delivery_date: field(inference, &labels.delivery_date),
            po_date: format_po_date(
                &field(inference, &labels.po_date),
                self.profile.po_date_suffix_on_fallback,
            ),
            bill_number: field(inference, &labels.bill_number),
            vendor_address: field(inference, &labels.vendor_address),
            customer_website: normalize_website(&field(inference, &labels.customer_website)),
            total: Decimal::ZERO,
            items,
            original_file: self.original_file(inference),
            extra_fields: self
                .profile
                .extra_fields
                .iter()
                .map(|(key, label)| (key.clone(), field(inference, label)))
                .collect(),
        };

        tracing::info!(
            filename = %payload.original_file.filename,
            items = payload.items.len(),
            "payload extracted"
        );
        payload
    }

    /// One item per row of every table region on every page, in document order.
    pub fn line_items<I: InferenceResult + ?Sized>(&self, inference: &I) -> Vec<LineItem> {
        inference
            .pages()
            .iter()
            .flat_map(|page| page.boxes())
            .filter(|region| region.label == self.profile.table_label)
            .flat_map(|region| Table::new(region).rows())
            .map(|row| self.line_item(&row))
            .collect()
    }

    fn line_item(&self, row: &Row<'_>) -> LineItem {
        let mut item = LineItem::with_columns(&self.profile.columns);
        for cell in &row.cells {
            if cell.text.is_empty() {
                continue;
            }
            let Some(column) = self.profile.column_for(&cell.label) else {
                continue;
            };
            match item.numeric_mut(column) {
                Some(slot) => {
                    *slot = parse_numeric(&cell.text).unwrap_or_else(|e| {
                        tracing::warn!(row = row.index, column = %column, error = %e, "numeric cell fell back to zero");
                        Decimal::ZERO
                    });
                }
                None => item.description = cell.text.clone(),
            }
        }
        item
    }

    fn original_file<I: InferenceResult + ?Sized>(&self, inference: &I) -> OriginalFile {
        let filename = inference.filename().to_string();
        let contents = match self.files.fetch(inference.file_url()) {
            Ok(bytes) => BASE64.encode(bytes),
            Err(e) => {
                tracing::warn!(url = %inference.file_url(), error = %e, "original file unavailable, sending empty contents");
                String::new()
            }
        };
        OriginalFile { filetype: file_extension(&filename), filename, contents }
    }
}

fn field<I: InferenceResult + ?Sized>(inference: &I, label: &str) -> String {
    match inference.field_value(label) {
        Some(v) => v.to_string(),
        None => {
            tracing::debug!(label, "field not predicted, using empty string");
            String::new()
        }
    }
}

// ── Field normalisation ───────────────────────────────────────────────────────

pub fn normalize_website(raw: &str) -> String {
    if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Uppercased extension without the dot; `PDF` when there is none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.replace('.', "").to_uppercase())
        .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string())
}

/// `YYYY-MM-DDT00:00:00Z` for a parseable date. An unparseable value is kept
/// verbatim, with the suffix appended only when `suffix_on_fallback` is set.
pub fn format_po_date(raw: &str, suffix_on_fallback: bool) -> String {
    match parse_lenient_date(raw) {
        Ok(date) => format!("{}{PO_DATE_TIME_SUFFIX}", date.format("%Y-%m-%d")),
        Err(e) => {
            tracing::warn!(error = %e, suffixed = suffix_on_fallback, "po_date kept as raw text");
            if suffix_on_fallback {
                format!("{raw}{PO_DATE_TIME_SUFFIX}")
            } else {
                raw.to_string()
            }
        }
    }
}

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Concatenate every decimal-number run in `s`, in order; `"0"` when there is none.
/// Lossy by nature: `"Qty: 12 @ $3.50"` becomes `"123.50"`.
pub fn extract_numeric(s: &str) -> String {
    let joined: String = re_number().find_iter(s).map(|m| m.as_str()).collect();
    if joined.is_empty() {
        "0".to_string()
    } else {
        joined
    }
}

pub fn parse_numeric(s: &str) -> Result<Decimal, FieldExtractionError> {
    let digits = extract_numeric(s);
    Decimal::from_str(&digits).map_err(|_| FieldExtractionError::InvalidNumber(digits))
}

// ── Dates ─────────────────────────────────────────────────────────────────────

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%d.%m.%Y",
    "%b %d, %Y", "%b %d %Y", "%d %b %Y", "%d %b, %Y", "%d-%b-%y", "%d-%b-%Y", "%A, %B %d, %Y",
];

// chrono's `%Y` happily reads "24" as the year 24. Such results are dropped so the
// regex helpers below can expand the short year instead.
const MIN_PLAUSIBLE_YEAR: i32 = 100;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Accepts the common ways a date is printed on a bill: ISO, US numeric
/// (falling back to day-first when the month would be out of range), and
/// month names in either order. Embedded dates in longer text are found too.
pub fn parse_lenient_date(raw: &str) -> Result<NaiveDate, FieldExtractionError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(FieldExtractionError::InvalidDate(raw.to_string()));
    }

    let plausible = |d: &NaiveDate| d.year() >= MIN_PLAUSIBLE_YEAR;

    if let Some(d) = DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()).filter(plausible) {
        return Ok(d);
    }
    if let Some(d) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok().map(|dt| dt.date()).filter(plausible))
    {
        return Ok(d);
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok().filter(plausible))
    {
        return Ok(d);
    }

    try_date_month_name(s)
        .or_else(|| try_date_day_month(s))
        .or_else(|| try_date_iso(s))
        .or_else(|| try_date_numeric(s))
        .ok_or_else(|| FieldExtractionError::InvalidDate(raw.to_string()))
}

fn try_date_month_name(text: &str) -> Option<NaiveDate> {
    let c = re_date_month_name().captures(text)?;
    let month = abbr_month_to_num(c.get(1)?.as_str())?;
    let day: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn try_date_day_month(text: &str) -> Option<NaiveDate> {
    let c = re_date_day_month().captures(text)?;
    let day: u32 = c.get(1)?.as_str().parse().ok()?;
    let month = abbr_month_to_num(c.get(2)?.as_str())?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn try_date_iso(text: &str) -> Option<NaiveDate> {
    let c = re_date_iso().captures(text)?;
    let y: i32 = c.get(1)?.as_str().parse().ok()?;
    let m: u32 = c.get(2)?.as_str().parse().ok()?;
    let d: u32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn try_date_numeric(text: &str) -> Option<NaiveDate> {
    let c = re_date_numeric().captures(text)?;
    let p1: u32 = c.get(1)?.as_str().parse().ok()?;
    let p2: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    // Month first unless that cannot be a month.
    NaiveDate::from_ymd_opt(year, p1, p2).or_else(|| NaiveDate::from_ymd_opt(year, p2, p1))
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

fn abbr_month_to_num(name: &str) -> Option<u32> {
    match name.get(..3)?.to_lowercase().as_str() {
        "jan" => Some(1), "feb" => Some(2), "mar" => Some(3), "apr" => Some(4),
        "may" => Some(5), "jun" => Some(6), "jul" => Some(7), "aug" => Some(8),
        "sep" => Some(9), "oct" => Some(10), "nov" => Some(11), "dec" => Some(12),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
