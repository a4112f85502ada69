use billcapture_core::DocumentPayload;
use serde_json::Value;
use thiserror::Error;

use crate::transport::{HttpResponse, HttpTransport, TransportError};

/// The only hard failure in the pipeline: the caller has to react to it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Unexpected error occurred: HTTP {status} | {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Error: Response {status} | {body}")]
    MissingRecordId { status: u16, body: String },
}

/// Confirmation that the ERP ingested the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub record_id: String,
}

pub struct RequestDispatcher<T: HttpTransport> {
    transport: T,
}

impl<T: HttpTransport> RequestDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Post `payload` once and hand `input` back on success. No retries.
    pub fn dispatch<I>(
        &self,
        url: &str,
        headers: &[(String, String)],
        payload: &DocumentPayload,
        input: I,
    ) -> Result<I, DispatchError> {
        self.send(url, headers, payload)?;
        Ok(input)
    }

    pub fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        payload: &DocumentPayload,
    ) -> Result<DispatchReceipt, DispatchError> {
        let body = serde_json::to_string(payload)?;
        tracing::info!(url, bytes = body.len(), items = payload.items.len(), "dispatching payload");

        let response = self.transport.post(url, headers, body)?;
        tracing::info!(status = response.status, "restlet responded");

        let receipt = validate_response(&response)?;
        tracing::info!(record_id = %receipt.record_id, "record created");
        Ok(receipt)
    }
}

/// HTTP 200 with a truthy `recordid` is success; anything else is a [`DispatchError`].
pub fn validate_response(response: &HttpResponse) -> Result<DispatchReceipt, DispatchError> {
    if response.status != 200 {
        return Err(DispatchError::UnexpectedStatus {
            status: response.status,
            body: response.body.clone(),
        });
    }

    let missing = || DispatchError::MissingRecordId {
        status: response.status,
        body: response.body.clone(),
    };

    let json: Value = serde_json::from_str(&response.body).map_err(|_| missing())?;
    log_metadata_error(&json);

    match json.get("recordid") {
        Some(id) if is_truthy(id) => Ok(DispatchReceipt { record_id: record_id_string(id) }),
        _ => Err(missing()),
    }
}

fn log_metadata_error(json: &Value) {
    let Some(err) = json.pointer("/metadata/error").filter(|e| !e.is_null()) else {
        return;
    };
    let code = err.get("code").map(metadata_text).unwrap_or_default();
    let message = err.get("message").map(metadata_text).unwrap_or_default();
    tracing::error!(%code, %message, "restlet reported an error");
}

/// Strings verbatim, anything else as compact JSON.
fn metadata_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn record_id_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
