use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The one outbound call the dispatcher needs. Kept as a trait so tests never
/// open a socket.
pub trait HttpTransport: Send + Sync {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse, TransportError>;
}

// ── reqwest (blocking) ────────────────────────────────────────────────────────

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                tracing::warn!(url, error = %e, "restlet unreachable");
            }
            e
        })?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

// ── Mock transport (always available, used for tests and dry runs) ────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Answers every request with a canned response and records what was sent.
pub struct MockTransport {
    response: Result<HttpResponse, String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            response: Ok(HttpResponse { status, body: body.into() }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { response: Err(message.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl HttpTransport for MockTransport {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(RecordedRequest { url: url.to_string(), headers: headers.to_vec(), body });
        self.response.clone().map_err(TransportError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_canned_response() {
        let t = MockTransport::new(200, r#"{"recordid": 1}"#);
        let r = t.post("https://x.test", &[], "{}".into()).unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.body, r#"{"recordid": 1}"#);
    }

    #[test]
    fn mock_records_requests() {
        let t = MockTransport::new(500, "");
        let headers = vec![("prefer".to_string(), "transient".to_string())];
        t.post("https://x.test/a", &headers, "body-1".into()).unwrap();
        t.post("https://x.test/b", &[], "body-2".into()).unwrap();
        let sent = t.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].headers, headers);
        assert_eq!(sent[1].body, "body-2");
    }

    #[test]
    fn failing_mock_surfaces_transport_error() {
        let t = MockTransport::failing("connection refused");
        assert!(matches!(
            t.post("https://x.test", &[], String::new()),
            Err(TransportError::Unavailable(m)) if m == "connection refused"
        ));
    }
}
