pub mod config;
pub mod payload;

pub use config::{
    ConfigError, Credentials, EndpointConfig, ExtractionSettings, FieldLabels, HttpSettings,
    ProfileKind, Settings,
};
pub use payload::{DocumentPayload, LineItem, LineItemColumn, OriginalFile};
