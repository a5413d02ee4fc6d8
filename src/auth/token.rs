//! SAPISID-style authorization token derivation.
//!
//! Tokens are derived locally from a session secret and the caller's
//! normalized origin; no server round-trip is involved. Timestamped variants
//! are produced fresh per request and never reused.

use crate::hash::sha1_hex;

use super::secrets::SecretStore;

/// The SID-family secret slots and the token label each one produces,
/// in the order the variants are assembled.
pub const SECRET_SLOTS: &[(&str, &str)] = &[
    ("SAPISID", "SAPISIDHASH"),
    ("__Secure-1PAPISID", "SAPISID1PHASH"),
    ("__Secure-3PAPISID", "SAPISID3PHASH"),
    ("APISID", "APISIDHASH"),
    ("SID", "SIDHASH"),
];

/// An optional keyed parameter folded into the token digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParam {
    /// Parameter key, concatenated into the token suffix.
    pub key: String,
    /// Parameter value, folded into the digest input.
    pub value: String,
}

impl TokenParam {
    /// Create a parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Derive an authorization token for one secret slot.
///
/// With no parameters the token is stable for a given secret and origin:
/// `label + " " + sha1(secret + " " + origin)`.
///
/// With parameters the digest is timestamped and the token carries the
/// timestamp and the concatenated parameter keys:
/// `label + " " + ts + "_" + digest [+ "_" + keys]`.
///
/// Returns `None` when `secret`, `origin` or `label` is empty — the caller
/// treats that as "this credential variant unavailable", not as an error.
pub fn derive_auth_token(
    secret: &str,
    origin: &str,
    label: &str,
    params: &[TokenParam],
) -> Option<String> {
    derive_with_timestamp(secret, origin, label, params, chrono::Utc::now().timestamp())
}

/// Timestamp-injected variant of [`derive_auth_token`], used directly by
/// tests. The timestamp only participates when parameters are present.
pub(crate) fn derive_with_timestamp(
    secret: &str,
    origin: &str,
    label: &str,
    params: &[TokenParam],
    timestamp: i64,
) -> Option<String> {
    if secret.is_empty() || origin.is_empty() || label.is_empty() {
        return None;
    }

    if params.is_empty() {
        let digest = sha1_hex(format!("{} {}", secret, origin));
        return Some(format!("{} {}", label, digest));
    }

    let values = params
        .iter()
        .map(|p| p.value.as_str())
        .collect::<Vec<_>>()
        .join(":");
    let digest = if values.is_empty() {
        sha1_hex(format!("{} {} {}", timestamp, secret, origin))
    } else {
        sha1_hex(format!("{} {} {} {}", values, timestamp, secret, origin))
    };

    let keys: String = params.iter().map(|p| p.key.as_str()).collect();
    if keys.is_empty() {
        Some(format!("{} {}_{}", label, timestamp, digest))
    } else {
        Some(format!("{} {}_{}_{}", label, timestamp, digest, keys))
    }
}

/// Derive one token per available SID-family slot and join them with spaces,
/// SAPISIDHASH first.
///
/// Returns `None` when no slot yields a token (no usable secret in the
/// session).
pub async fn derive_all_tokens<S: SecretStore + ?Sized>(
    store: &S,
    origin: &str,
    params: &[TokenParam],
) -> Option<String> {
    let mut tokens = Vec::new();
    for (slot, label) in SECRET_SLOTS {
        if let Some(secret) = store.get(slot).await {
            if let Some(token) = derive_auth_token(&secret, origin, label, params) {
                tokens.push(token);
            }
        }
    }
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
