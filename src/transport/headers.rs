//! Request header construction for the positional RPC protocol.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{API_KEY_HEADER, CLIENT_HEADER, CLIENT_IDENTIFIER, CONTENT_TYPE_JSON_PROTOBUF};

/// Build the headers for one transmission attempt.
///
/// `auth_token` is the derived authorization value; `api_key` is the pool
/// credential chosen for this attempt.
pub fn api_headers(auth_token: &str, api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        reqwest::header::AUTHORIZATION,
        HeaderValue::from_str(auth_token)
            .unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_JSON_PROTOBUF),
    );

    headers.insert(
        HeaderName::from_static(API_KEY_HEADER),
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    headers.insert(
        HeaderName::from_static(CLIENT_HEADER),
        HeaderValue::from_static(CLIENT_IDENTIFIER),
    );

    headers
}
