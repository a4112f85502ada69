use billcapture_core::EndpointConfig;
use chrono::Utc;

use crate::nonce::NonceGenerator;

/// Per-request signing inputs. Build a new one for every request so the
/// nonce and timestamp are never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestContext {
    pub base_url: String,
    pub http_method: String,
    pub nonce: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub deployment_id: String,
    pub script_id: String,
}

impl SignedRequestContext {
    pub fn new(endpoint: &EndpointConfig, http_method: &str) -> Self {
        Self {
            base_url: endpoint.base_url.clone(),
            http_method: http_method.to_uppercase(),
            nonce: NonceGenerator.generate(),
            timestamp: Utc::now().timestamp(),
            deployment_id: endpoint.deployment_id.clone(),
            script_id: endpoint.script_id.clone(),
        }
    }

    pub fn post(endpoint: &EndpointConfig) -> Self {
        Self::new(endpoint, "POST")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointConfig {
        EndpointConfig {
            base_url: "https://example.test/restlet.nl".into(),
            deployment_id: "1".into(),
            script_id: "3807".into(),
        }
    }

    #[test]
    fn context_copies_endpoint_and_uppercases_method() {
        let ctx = SignedRequestContext::new(&endpoint(), "post");
        assert_eq!(ctx.http_method, "POST");
        assert_eq!(ctx.base_url, "https://example.test/restlet.nl");
        assert_eq!(ctx.script_id, "3807");
        assert_eq!(ctx.deployment_id, "1");
    }

    #[test]
    fn each_context_is_fresh() {
        let a = SignedRequestContext::post(&endpoint());
        let b = SignedRequestContext::post(&endpoint());
        assert_ne!(a.nonce, b.nonce);
        assert!((Utc::now().timestamp() - a.timestamp).abs() < 5);
    }
}
