use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Table-cell labels the extractor recognises as line-item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineItemColumn {
    Description,
    UnitPrice,
    Quantity,
    LineAmount,
}

impl LineItemColumn {
    pub const ALL: [LineItemColumn; 4] = [
        LineItemColumn::Description,
        LineItemColumn::UnitPrice,
        LineItemColumn::Quantity,
        LineItemColumn::LineAmount,
    ];

    /// The OCR cell label, which is also the JSON key on the wire.
    pub fn label(self) -> &'static str {
        match self {
            LineItemColumn::Description => "Description",
            LineItemColumn::UnitPrice => "Unit_price",
            LineItemColumn::Quantity => "Quantity",
            LineItemColumn::LineAmount => "Line_amount",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, LineItemColumn::Description)
    }
}

impl fmt::Display for LineItemColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LineItemColumn {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineItemColumn::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| format!("Unknown line item column: '{s}'"))
    }
}

/// One row of a detected table region.
///
/// `unit_price` and `quantity` are `None` when the extraction profile does not
/// track them; they are then left out of the JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(
        rename = "Unit_price",
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub unit_price: Option<Decimal>,
    #[serde(
        rename = "Quantity",
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub quantity: Option<Decimal>,
    #[serde(rename = "Line_amount", with = "rust_decimal::serde::float")]
    pub line_amount: Decimal,
}

impl Default for LineItem {
    fn default() -> Self {
        Self::with_columns(&LineItemColumn::ALL)
    }
}

impl LineItem {
    /// Zeroed item carrying only the optional columns listed in `columns`.
    /// Description and line amount are always present.
    pub fn with_columns(columns: &[LineItemColumn]) -> Self {
        let zero_if = |c: LineItemColumn| columns.contains(&c).then_some(Decimal::ZERO);
        Self {
            description: String::new(),
            unit_price: zero_if(LineItemColumn::UnitPrice),
            quantity: zero_if(LineItemColumn::Quantity),
            line_amount: Decimal::ZERO,
        }
    }

    pub fn numeric_mut(&mut self, column: LineItemColumn) -> Option<&mut Decimal> {
        match column {
            LineItemColumn::Description => None,
            LineItemColumn::UnitPrice => self.unit_price.as_mut(),
            LineItemColumn::Quantity => self.quantity.as_mut(),
            LineItemColumn::LineAmount => Some(&mut self.line_amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalFile {
    pub filename: String,
    /// Uppercased extension without the dot, e.g. `PDF`.
    pub filetype: String,
    /// Base64 of the original bytes; empty when the download failed.
    pub contents: String,
}

/// The body posted to the ERP restlet for one inbound document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub company_name: String,
    pub vendor_name: String,
    pub delivery_date: String,
    pub po_date: String,
    #[serde(rename = "BillNumber")]
    pub bill_number: String,
    pub vendor_address: String,
    #[serde(default)]
    pub customer_website: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub items: Vec<LineItem>,
    #[serde(rename = "originalfile", with = "single_file")]
    pub original_file: OriginalFile,
    /// Configured extra keys, emitted alongside the fixed ones.
    #[serde(flatten)]
    pub extra_fields: BTreeMap<String, String>,
}

impl DocumentPayload {
    /// Top-level JSON keys owned by the fixed fields above.
    pub const FIXED_KEYS: [&'static str; 10] = [
        "company_name",
        "vendor_name",
        "delivery_date",
        "po_date",
        "BillNumber",
        "vendor_address",
        "customer_website",
        "total",
        "items",
        "originalfile",
    ];

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// The restlet reads `originalfile[0]`, so the single file travels as a one-element array.
mod single_file {
    use super::OriginalFile;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(file: &OriginalFile, s: S) -> Result<S::Ok, S::Error> {
        [file].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OriginalFile, D::Error> {
        Vec::<OriginalFile>::deserialize(d)?
            .into_iter()
            .next()
            .ok_or_else(|| D::Error::custom("originalfile must contain one entry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> DocumentPayload {
        DocumentPayload {
            company_name: String::new(),
            vendor_name: "ACME SUPPLY".into(),
            delivery_date: "2024-03-20".into(),
            po_date: "2024-03-15T00:00:00Z".into(),
            bill_number: "INV-1001".into(),
            vendor_address: "1 Main St".into(),
            customer_website: "https://acme.example".into(),
            total: Decimal::ZERO,
            items: vec![LineItem {
                description: "Widget".into(),
                unit_price: Some(Decimal::new(350, 2)),
                quantity: Some(Decimal::from(12)),
                line_amount: Decimal::new(4200, 2),
            }],
            original_file: OriginalFile {
                filename: "bill.pdf".into(),
                filetype: "PDF".into(),
                contents: "JVBERi0=".into(),
            },
            extra_fields: BTreeMap::new(),
        }
    }

    #[test]
    fn column_labels_match_wire_keys() {
        assert_eq!(LineItemColumn::UnitPrice.label(), "Unit_price");
        assert_eq!(LineItemColumn::LineAmount.to_string(), "Line_amount");
        assert_eq!("Quantity".parse::<LineItemColumn>().unwrap(), LineItemColumn::Quantity);
        assert!("quantity".parse::<LineItemColumn>().is_err());
    }

    #[test]
    fn only_description_is_textual() {
        assert!(!LineItemColumn::Description.is_numeric());
        assert!(LineItemColumn::Quantity.is_numeric());
        assert!(LineItem::default().numeric_mut(LineItemColumn::Description).is_none());
    }

    #[test]
    fn payload_serializes_with_restlet_keys() {
        let v: serde_json::Value = serde_json::from_str(&sample_payload().to_json().unwrap()).unwrap();
        assert_eq!(v["BillNumber"], "INV-1001");
        assert_eq!(v["company_name"], "");
        assert_eq!(v["total"], json!(0.0));
        assert_eq!(v["items"][0]["Unit_price"], json!(3.5));
        assert_eq!(v["items"][0]["Quantity"], json!(12.0));
        assert_eq!(v["originalfile"].as_array().unwrap().len(), 1);
        assert_eq!(v["originalfile"][0]["filetype"], "PDF");
    }

    #[test]
    fn default_line_item_is_all_zero() {
        let item = LineItem::default();
        assert!(item.description.is_empty());
        assert_eq!(item.unit_price, Some(Decimal::ZERO));
        assert_eq!(item.quantity, Some(Decimal::ZERO));
        assert!(item.line_amount.is_zero());
    }

    #[test]
    fn untracked_columns_are_left_out_of_json() {
        let mut item = LineItem::with_columns(&[LineItemColumn::Description, LineItemColumn::LineAmount]);
        item.description = "Freight".into();
        assert!(item.numeric_mut(LineItemColumn::Quantity).is_none());
        *item.numeric_mut(LineItemColumn::LineAmount).unwrap() = Decimal::new(1250, 2);

        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v, json!({"Description": "Freight", "Line_amount": 12.5}));

        let back: LineItem = serde_json::from_value(v).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn extra_fields_sit_at_top_level() {
        let mut payload = sample_payload();
        payload.extra_fields.insert("uploaded_date".into(), "2024-03-16".into());
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["uploaded_date"], "2024-03-16");
        assert_eq!(v.as_object().unwrap().len(), DocumentPayload::FIXED_KEYS.len() + 1);

        let parsed: DocumentPayload = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.extra_fields, payload.extra_fields);
    }

    #[test]
    fn payload_parses_back() {
        let original = sample_payload();
        let parsed: DocumentPayload = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed.original_file, original.original_file);
        assert_eq!(parsed.items.len(), 1);
    }
}
