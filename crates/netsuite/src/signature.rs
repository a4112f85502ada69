use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use billcapture_core::Credentials;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use thiserror::Error;

use crate::request::SignedRequestContext;

type HmacSha256 = Hmac<Sha256>;

/// Unreserved set plus `~()*!.'`, which the ERP leaves unescaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'!')
    .remove(b'\'');

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid HMAC key: {0}")]
    Key(#[from] hmac::digest::InvalidLength),
}

pub fn oauth_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// `key=value` pairs joined by `&` in the order the restlet verifies them.
/// The order is part of the protocol and is not sorted.
pub fn parameter_string(credentials: &Credentials, ctx: &SignedRequestContext) -> String {
    let timestamp = ctx.timestamp.to_string();
    [
        ("deploy", ctx.deployment_id.as_str()),
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", ctx.nonce.as_str()),
        ("oauth_signature_method", credentials.signature_method.as_str()),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.token_id.as_str()),
        ("oauth_version", credentials.oauth_version.as_str()),
        ("script", ctx.script_id.as_str()),
    ]
    .iter()
    .map(|(k, v)| format!("{k}={v}"))
    .collect::<Vec<_>>()
    .join("&")
}

pub fn base_string(credentials: &Credentials, ctx: &SignedRequestContext) -> String {
    format!(
        "{}&{}&{}",
        ctx.http_method,
        oauth_encode(&ctx.base_url),
        oauth_encode(&parameter_string(credentials, ctx))
    )
}

pub fn signing_key(credentials: &Credentials) -> String {
    format!(
        "{}&{}",
        oauth_encode(&credentials.consumer_secret),
        oauth_encode(&credentials.token_secret)
    )
}

/// HMAC-SHA256 over the base string, base64, then percent-encoded.
/// Deterministic for fixed inputs; performs no I/O.
pub fn sign(credentials: &Credentials, ctx: &SignedRequestContext) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(signing_key(credentials).as_bytes())?;
    mac.update(base_string(credentials, ctx).as_bytes());
    let digest = BASE64.encode(mac.finalize().into_bytes());
    tracing::debug!(base_url = %ctx.base_url, nonce = %ctx.nonce, timestamp = ctx.timestamp, "request signed");
    Ok(oauth_encode(&digest))
}
