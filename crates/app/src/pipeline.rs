use std::path::PathBuf;
use std::time::Duration;

use billcapture_core::{Credentials, DocumentPayload, EndpointConfig, Settings};
use billcapture_netsuite::{
    build_headers, sign, DispatchError, Headers, HttpTransport, ReqwestTransport,
    RequestDispatcher, SignatureError, SignedRequestContext, TransportError,
};
use billcapture_ocr::{
    DocumentExtractor, ExtractionProfile, FileSource, HttpFileSource, InferenceResult,
    RemoteFetchError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("File client setup failed: {0}")]
    FileClient(#[from] RemoteFetchError),
    #[error("Restlet client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Signing failed: {0}")]
    Sign(#[from] SignatureError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Orchestrates: extract → (export) → sign → dispatch.
pub struct BillPipeline<F: FileSource, T: HttpTransport> {
    credentials: Credentials,
    endpoint: EndpointConfig,
    extractor: DocumentExtractor<F>,
    dispatcher: RequestDispatcher<T>,
    export_csv: Option<PathBuf>,
}

impl BillPipeline<HttpFileSource, ReqwestTransport> {
    /// Network-backed pipeline with the configured request timeout on both clients.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let timeout = Duration::from_secs(settings.http.timeout_secs);
        Ok(Self::new(
            settings,
            HttpFileSource::new(timeout)?,
            ReqwestTransport::new(timeout)?,
        ))
    }
}

impl<F: FileSource, T: HttpTransport> BillPipeline<F, T> {
    pub fn new(settings: &Settings, files: F, transport: T) -> Self {
        Self {
            credentials: settings.credentials.clone(),
            endpoint: settings.endpoint.clone(),
            extractor: DocumentExtractor::new(
                ExtractionProfile::from_settings(&settings.extraction),
                files,
            ),
            dispatcher: RequestDispatcher::new(transport),
            export_csv: None,
        }
    }

    /// Also write the extracted line items to `path` before dispatching.
    pub fn with_csv_export(mut self, path: Option<PathBuf>) -> Self {
        self.export_csv = path;
        self
    }

    pub fn dispatcher(&self) -> &RequestDispatcher<T> {
        &self.dispatcher
    }

    pub fn build_payload<I: InferenceResult + ?Sized>(&self, inference: &I) -> DocumentPayload {
        self.extractor.extract(inference)
    }

    /// Headers for one POST, signed with a fresh nonce and timestamp.
    pub fn signed_headers(&self) -> Result<Headers, PipelineError> {
        let ctx = SignedRequestContext::post(&self.endpoint);
        let signature = sign(&self.credentials, &ctx)?;
        Ok(build_headers(&self.credentials, &ctx, &signature))
    }

    /// Process one inference result end to end and return it unchanged on success.
    /// Extraction problems are absorbed; only signing and dispatch can fail.
    pub fn handle<I: InferenceResult>(&self, input: I) -> Result<I, PipelineError> {
        tracing::info!(filename = %input.filename(), "processing document");
        let payload = self.build_payload(&input);

        if let Some(path) = &self.export_csv {
            if let Err(e) = billcapture_export::export_line_items_to_path(&payload.items, path) {
                tracing::warn!(path = %path.display(), error = %e, "line item export failed");
            }
        }

        let headers = self.signed_headers()?;
        let url = self.endpoint.request_url();
        Ok(self.dispatcher.dispatch(&url, &headers, &payload, input)?)
    }
}
