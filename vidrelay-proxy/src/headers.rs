//! Header handling for the relay
//!
//! Requests going upstream carry only an allow-listed subset of the client's
//! headers. Responses coming back get permissive CORS headers and the
//! defaults a media element needs to seek.

use axum::http::{
    header::{self, HeaderName, HeaderValue},
    HeaderMap,
};
use vidrelay_core::StreamKind;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type, range";
pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const EXPOSE_HEADERS: &str = "content-length, content-type, accept-ranges, content-range";

const DEFAULT_ACCEPT: &str = "*/*";

/// Client headers copied upstream verbatim when present.
const FORWARDED: [HeaderName; 5] = [
    header::RANGE,
    header::REFERER,
    header::ORIGIN,
    header::ACCEPT_LANGUAGE,
    header::CACHE_CONTROL,
];

/// Connection-scoped headers that never cross the relay.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
];

/// Build the header set sent upstream.
///
/// Everything outside the allow-list is dropped, so credentials such as
/// `authorization` or cookies never reach the target.
#[must_use]
pub fn upstream_request_headers(client: &HeaderMap, default_user_agent: &HeaderValue) -> HeaderMap {
    let mut out = HeaderMap::new();

    for name in &FORWARDED {
        if let Some(value) = client.get(name) {
            out.insert(name.clone(), value.clone());
        }
    }

    out.insert(
        header::USER_AGENT,
        client
            .get(header::USER_AGENT)
            .cloned()
            .unwrap_or_else(|| default_user_agent.clone()),
    );
    out.insert(
        header::ACCEPT,
        client
            .get(header::ACCEPT)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ACCEPT)),
    );

    out
}

/// Overwrite the CORS headers on `headers`.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
}

/// A header map holding only the CORS headers.
#[must_use]
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    apply_cors(&mut headers);
    headers
}

/// Build the response header set from the upstream one.
///
/// Upstream headers are copied (minus hop-by-hop ones), CORS is forced, and
/// `content-type` / `accept-ranges` are filled in when upstream left them out.
#[must_use]
pub fn relay_response_headers(upstream: &HeaderMap, kind: StreamKind) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len() + 6);

    for (name, value) in upstream {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    apply_cors(&mut out);

    if !out.contains_key(header::CONTENT_TYPE) {
        out.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(kind.mime_type()),
        );
    }
    if !out.contains_key(header::ACCEPT_RANGES) {
        out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }

    out
}
