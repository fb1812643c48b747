//! Stream relay HTTP endpoint
//!
//! Relays `?url=<target>` to the target origin so plain-HTTP streams can be
//! played from an HTTPS page.

use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use vidrelay_proxy::RelayError;

use crate::http::AppState;

/// GET `<relay path>?url=<target>` - Relay a stream from the target origin
pub async fn relay_stream(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let target = query.as_deref().and_then(target_param);
    state.relay.handle(target.as_deref(), &headers).await
}

/// OPTIONS `<relay path>` - CORS preflight, never touches upstream
pub async fn relay_options() -> impl IntoResponse {
    vidrelay_proxy::proxy_options_preflight().await
}

/// First `url` value of a raw query string, percent-decoded.
fn target_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}
