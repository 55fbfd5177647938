//! Identity hint read from the session credential.
//!
//! The bearer token is a JWT; its middle segment is base64url JSON. The
//! subject found there is used only to label chat messages as our own. The
//! signature is never checked here: the relay verifies the token and decides
//! access, so nothing in the client may treat this value as authenticated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

const IDENTITY_CLAIMS: [&str; 4] = ["sub", "userId", "uid", "id"];

/// Best-effort subject of `token`, or `None` if it cannot be read
pub fn identity_hint(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| tracing::debug!("[Chat] Credential payload is not base64url: {}", e))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| tracing::debug!("[Chat] Credential payload is not JSON: {}", e))
        .ok()?;

    IDENTITY_CLAIMS.iter().find_map(|key| match claims.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
