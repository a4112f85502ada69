use billcapture_core::Credentials;

use crate::request::SignedRequestContext;

pub const OAUTH_VERSION: &str = "1.0";

/// Ordered header name/value pairs for one request.
pub type Headers = Vec<(String, String)>;

/// `OAuth realm="…",oauth_token="…",…,oauth_signature="…"`.
pub fn build_auth_header(
    credentials: &Credentials,
    ctx: &SignedRequestContext,
    signature: &str,
) -> String {
    let timestamp = ctx.timestamp.to_string();
    let params = [
        ("realm", credentials.account_id.as_str()),
        ("oauth_token", credentials.token_id.as_str()),
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", ctx.nonce.as_str()),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_signature_method", credentials.signature_method.as_str()),
        ("oauth_version", OAUTH_VERSION),
        ("oauth_signature", signature),
    ];
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("OAuth {joined}")
}

/// Authorization plus the fixed content-type and routing hints the restlet expects.
pub fn build_headers(
    credentials: &Credentials,
    ctx: &SignedRequestContext,
    signature: &str,
) -> Headers {
    vec![
        ("Authorization".to_string(), build_auth_header(credentials, ctx, signature)),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("prefer".to_string(), "transient".to_string()),
        ("Cookie".to_string(), "NS_ROUTING_VERSION=LAGGING".to_string()),
    ]
}

/// Split an `OAuth ...` header value back into its key/value pairs.
pub fn parse_auth_header(value: &str) -> Option<Vec<(String, String)>> {
    let rest = value.strip_prefix("OAuth ")?;
    rest.split(',')
        .map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            let v = v.strip_prefix('"')?.strip_suffix('"')?;
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}
