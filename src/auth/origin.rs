//! Origin normalization for authorization hashing.
//!
//! The digest input includes the caller's origin, so normalization has to be
//! deterministic: same security context, same string, every time.

use crate::config::ALLOWED_SCHEMES;

/// Normalize a raw URL or origin into `scheme://host[:port]` form.
///
/// Rules:
/// - placeholder values (`null`, `about:` and `blob:` URLs) resolve to the
///   caller-supplied `fallback` origin, which is normalized in turn
/// - query strings and fragments are stripped
/// - scheme and host are lowercased
/// - the scheme must be on the allow-list (http, https, extension schemes)
/// - default ports (80 for http, 443 for https) are dropped; any other
///   explicit port is kept
///
/// Returns `None` when no valid origin can be produced.
pub fn normalize_origin(raw: &str, fallback: Option<&str>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.eq_ignore_ascii_case("null")
        || has_scheme(raw, "about")
        || has_scheme(raw, "blob")
    {
        return fallback.and_then(|f| normalize_origin(f, None));
    }

    let (scheme, rest) = raw.split_once("://")?;
    let scheme = scheme.to_ascii_lowercase();
    if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
        return None;
    }

    // Strip path, query and fragment; keep only the authority.
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if authority.is_empty() {
        return None;
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
            (h.to_string(), Some(p.parse::<u16>().ok()?))
        }
        _ => (authority, None),
    };
    if host.is_empty() {
        return None;
    }

    let default_port = match scheme.as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    match port {
        Some(p) if Some(p) != default_port => Some(format!("{}://{}:{}", scheme, host, p)),
        _ => Some(format!("{}://{}", scheme, host)),
    }
}

fn has_scheme(raw: &str, scheme: &str) -> bool {
    raw.len() > scheme.len()
        && raw.as_bytes()[scheme.len()] == b':'
        && raw[..scheme.len()].eq_ignore_ascii_case(scheme)
}
