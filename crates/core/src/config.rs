use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::payload::DocumentPayload;

pub const ENV_PREFIX: &str = "BILLCAPTURE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Missing required option: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Token-based auth material for the ERP account. Read-only after load.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_id: String,
    pub token_secret: String,
    pub account_id: String,
    pub signature_method: String,
    pub oauth_version: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            token_id: String::new(),
            token_secret: String::new(),
            account_id: String::new(),
            signature_method: "HMAC-SHA256".to_string(),
            oauth_version: "1.0".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("signature_method", &self.signature_method)
            .field("oauth_version", &self.oauth_version)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub deployment_id: String,
    pub script_id: String,
}

impl EndpointConfig {
    /// Full restlet URL: `<base_url>?script=<script_id>&deploy=<deployment_id>`.
    pub fn request_url(&self) -> String {
        let query = format!("script={}&deploy={}", self.script_id, self.deployment_id);
        format!("{}?{}", self.base_url, query.replace(' ', "%20"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Description, unit price, quantity and line amount.
    #[default]
    Full,
    /// Description and line amount only.
    AmountOnly,
}

/// OCR field label for each scalar payload field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldLabels {
    pub vendor_name: String,
    pub delivery_date: String,
    pub po_date: String,
    pub bill_number: String,
    pub vendor_address: String,
    pub customer_website: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            vendor_name: "vendor_name".to_string(),
            delivery_date: "delivery_date".to_string(),
            po_date: "po_date".to_string(),
            bill_number: "BillNumber".to_string(),
            vendor_address: "vendor_address".to_string(),
            customer_website: "customer_website".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub profile: ProfileKind,
    pub labels: FieldLabels,
    pub table_label: String,
    /// Append `T00:00:00Z` to a PO date that could not be parsed.
    pub po_date_suffix_on_fallback: bool,
    /// Additional top-level payload keys, each copied verbatim from the
    /// named OCR field: `payload key -> OCR label`.
    pub extra_fields: BTreeMap<String, String>,
}

impl ExtractionSettings {
    /// Extra keys must not shadow a fixed payload key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.extra_fields.keys().find(|k| DocumentPayload::FIXED_KEYS.contains(&k.as_str())) {
            Some(key) => Err(ConfigError::InvalidValue {
                key: "extraction.extra_fields".to_string(),
                value: key.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            profile: ProfileKind::Full,
            labels: FieldLabels::default(),
            table_label: "table".to_string(),
            po_date_suffix_on_fallback: true,
            extra_fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub credentials: Credentials,
    pub endpoint: EndpointConfig,
    pub extraction: ExtractionSettings,
    pub http: HttpSettings,
}

impl Settings {
    /// Load from an optional TOML file, overlay `BILLCAPTURE_*` environment variables, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = Self::read(path)?;
        settings.validate()?;
        tracing::debug!(
            account = %settings.credentials.account_id,
            base_url = %settings.endpoint.base_url,
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Like [`Settings::load`] but skips the credential and endpoint checks, for runs
    /// that never sign a request. Extraction settings are still validated.
    pub fn read(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::from_toml_str(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.extraction.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Overlay values from `lookup`, which receives the full variable name
    /// (e.g. `BILLCAPTURE_CONSUMER_KEY`). Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        let c = &mut self.credentials;
        let e = &mut self.endpoint;
        let string_targets: [(&str, &mut String); 8] = [
            ("CONSUMER_KEY", &mut c.consumer_key),
            ("CONSUMER_SECRET", &mut c.consumer_secret),
            ("TOKEN_ID", &mut c.token_id),
            ("TOKEN_SECRET", &mut c.token_secret),
            ("ACCOUNT_ID", &mut c.account_id),
            ("BASE_URL", &mut e.base_url),
            ("DEPLOYMENT_ID", &mut e.deployment_id),
            ("SCRIPT_ID", &mut e.script_id),
        ];
        for (name, target) in string_targets {
            if let Some(v) = get(name) {
                *target = v;
            }
        }

        if let Some(v) = get("TIMEOUT_SECS") {
            self.http.timeout_secs = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}TIMEOUT_SECS"),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.credentials;
        let e = &self.endpoint;
        let required: [(&'static str, &str); 10] = [
            ("consumer_key", &c.consumer_key),
            ("consumer_secret", &c.consumer_secret),
            ("token_id", &c.token_id),
            ("token_secret", &c.token_secret),
            ("account_id", &c.account_id),
            ("signature_method", &c.signature_method),
            ("oauth_version", &c.oauth_version),
            ("base_url", &e.base_url),
            ("deployment_id", &e.deployment_id),
            ("script_id", &e.script_id),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Missing(*name));
        }
        // Only the HMAC-SHA256 / 1.0 flow is implemented.
        if c.signature_method != "HMAC-SHA256" {
            return Err(ConfigError::InvalidValue {
                key: "signature_method".to_string(),
                value: c.signature_method.clone(),
            });
        }
        if c.oauth_version != "1.0" {
            return Err(ConfigError::InvalidValue {
                key: "oauth_version".to_string(),
                value: c.oauth_version.clone(),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        self.extraction.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const FULL_TOML: &str = r#"
[credentials]
consumer_key = "ck"
consumer_secret = "cs"
token_id = "tid"
token_secret = "ts"
account_id = "TSTDRV1"

[endpoint]
base_url = "https://tstdrv1.restlets.api.netsuite.com/app/site/hosting/restlet.nl"
deployment_id = "1"
script_id = "3807"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    // ── TOML ──────────────────────────────────────────────────────────────────

    #[test]
    fn toml_fills_defaults() {
        let s = Settings::from_toml_str(FULL_TOML).unwrap();
        assert_eq!(s.credentials.signature_method, "HMAC-SHA256");
        assert_eq!(s.credentials.oauth_version, "1.0");
        assert_eq!(s.http.timeout_secs, 30);
        assert_eq!(s.extraction.profile, ProfileKind::Full);
        assert_eq!(s.extraction.labels.bill_number, "BillNumber");
        assert!(s.extraction.po_date_suffix_on_fallback);
        s.validate().unwrap();
    }

    #[test]
    fn toml_extraction_overrides() {
        let toml = format!(
            "{FULL_TOML}\n[extraction]\nprofile = \"amount_only\"\npo_date_suffix_on_fallback = false\n[extraction.labels]\nvendor_name = \"supplier\"\n"
        );
        let s = Settings::from_toml_str(&toml).unwrap();
        assert_eq!(s.extraction.profile, ProfileKind::AmountOnly);
        assert_eq!(s.extraction.labels.vendor_name, "supplier");
        assert_eq!(s.extraction.labels.po_date, "po_date");
        assert!(!s.extraction.po_date_suffix_on_fallback);
    }

    #[test]
    fn toml_extra_fields() {
        let toml = format!(
            "{FULL_TOML}\n[extraction.extra_fields]\nuploaded_date = \"uploaded_date\"\nupdated_at = \"last_modified\"\n"
        );
        let s = Settings::from_toml_str(&toml).unwrap();
        assert_eq!(s.extraction.extra_fields.len(), 2);
        assert_eq!(s.extraction.extra_fields["updated_at"], "last_modified");
        s.validate().unwrap();
        assert!(Settings::from_toml_str(FULL_TOML).unwrap().extraction.extra_fields.is_empty());
    }

    #[test]
    fn extra_field_cannot_shadow_fixed_key() {
        let toml = format!("{FULL_TOML}\n[extraction.extra_fields]\nBillNumber = \"invoice_no\"\n");
        let s = Settings::from_toml_str(&toml).unwrap();
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvalidValue { value, .. }) if value == "BillNumber"
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_TOML.as_bytes()).unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.credentials.account_id, "TSTDRV1");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::read(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        assert!(matches!(
            Settings::from_toml_str("[credentials\nconsumer_key = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    // ── Environment ───────────────────────────────────────────────────────────

    #[test]
    fn env_overrides_file_values() {
        let mut s = Settings::from_toml_str(FULL_TOML).unwrap();
        s.apply_env(env(&[
            ("BILLCAPTURE_CONSUMER_KEY", "from-env"),
            ("BILLCAPTURE_SCRIPT_ID", "42"),
            ("BILLCAPTURE_TOKEN_SECRET", ""),
            ("BILLCAPTURE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(s.credentials.consumer_key, "from-env");
        assert_eq!(s.endpoint.script_id, "42");
        assert_eq!(s.credentials.token_secret, "ts");
        assert_eq!(s.http.timeout_secs, 5);
    }

    #[test]
    fn env_alone_is_sufficient() {
        let mut s = Settings::default();
        s.apply_env(env(&[
            ("BILLCAPTURE_CONSUMER_KEY", "ck"),
            ("BILLCAPTURE_CONSUMER_SECRET", "cs"),
            ("BILLCAPTURE_TOKEN_ID", "tid"),
            ("BILLCAPTURE_TOKEN_SECRET", "ts"),
            ("BILLCAPTURE_ACCOUNT_ID", "ACCT"),
            ("BILLCAPTURE_BASE_URL", "https://example.test/restlet.nl"),
            ("BILLCAPTURE_DEPLOYMENT_ID", "1"),
            ("BILLCAPTURE_SCRIPT_ID", "2"),
        ]))
        .unwrap();
        s.validate().unwrap();
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut s = Settings::default();
        let err = s.apply_env(env(&[("BILLCAPTURE_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn missing_option_is_named() {
        let mut s = Settings::from_toml_str(FULL_TOML).unwrap();
        s.credentials.token_secret.clear();
        assert!(matches!(s.validate(), Err(ConfigError::Missing("token_secret"))));
    }

    #[test]
    fn empty_settings_fail_validation() {
        assert!(matches!(Settings::default().validate(), Err(ConfigError::Missing("consumer_key"))));
    }

    #[test]
    fn unsupported_signature_method_is_rejected() {
        let mut s = Settings::from_toml_str(FULL_TOML).unwrap();
        s.credentials.signature_method = "PLAINTEXT".into();
        assert!(matches!(s.validate(), Err(ConfigError::InvalidValue { key, .. }) if key == "signature_method"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let s = Settings::from_toml_str(FULL_TOML).unwrap();
        let dbg = format!("{:?}", s.credentials);
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("\"cs\""));
        assert!(!dbg.contains("\"ts\""));
    }

    #[test]
    fn request_url_carries_script_and_deploy() {
        let s = Settings::from_toml_str(FULL_TOML).unwrap();
        assert_eq!(
            s.endpoint.request_url(),
            "https://tstdrv1.restlets.api.netsuite.com/app/site/hosting/restlet.nl?script=3807&deploy=1"
        );
    }
}
