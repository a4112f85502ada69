use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteFetchError {
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Inference result has no file URL")]
    NoUrl,
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Retrieves the original uploaded file by URL.
pub trait FileSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteFetchError>;
}

// ── HTTP source ───────────────────────────────────────────────────────────────

pub struct HttpFileSource {
    client: reqwest::blocking::Client,
}

impl HttpFileSource {
    pub fn new(timeout: Duration) -> Result<Self, RemoteFetchError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl FileSource for HttpFileSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteFetchError> {
        if url.is_empty() {
            return Err(RemoteFetchError::NoUrl);
        }
        let transport = |source: reqwest::Error| RemoteFetchError::Transport { url: url.to_string(), source };

        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteFetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response.bytes().map_err(transport)?.to_vec())
    }
}

// ── In-memory source (tests, offline runs) ────────────────────────────────────

/// Serves pre-loaded bytes; unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFileSource {
    files: HashMap<String, Vec<u8>>,
}

impl StaticFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.into(), bytes.into());
        self
    }
}

impl FileSource for StaticFileSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteFetchError> {
        if url.is_empty() {
            return Err(RemoteFetchError::NoUrl);
        }
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteFetchError::Status { url: url.to_string(), status: 404 })
    }
}
