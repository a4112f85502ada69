pub mod extract;
pub mod fetch;
pub mod inference;

pub use extract::{
    extract_numeric, file_extension, format_po_date, normalize_website, parse_lenient_date,
    parse_numeric, DocumentExtractor, ExtractionProfile, FieldExtractionError,
};
pub use fetch::{FileSource, HttpFileSource, RemoteFetchError, StaticFileSource};
pub use inference::{Cell, Field, InferenceDocument, InferenceResult, Page, Region, Row, Table};
