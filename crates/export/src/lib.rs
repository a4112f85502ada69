pub mod csv;

pub use crate::csv::{export_line_items, export_line_items_to_path, ExportError};
