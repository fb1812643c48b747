//! Stream relay
//!
//! Forwards a stream request to an arbitrary http/https origin and pipes the
//! body back with CORS and range-support headers added, so a browser media
//! element on an HTTPS page can consume plain-HTTP sources. Mounted as an
//! HTTP route by `vidrelay-api`.

pub mod error;
pub mod headers;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::HeaderValue, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tracing::Level;
use vidrelay_core::{
    config::RelayConfig, DiagnosticEvent, EventKind, Observer, StreamSource,
};

pub use error::RelayError;

/// Shared relay state: one pooled HTTP client for all requests.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
    default_user_agent: HeaderValue,
    observer: Arc<dyn Observer>,
}

impl Relay {
    pub fn new(config: &RelayConfig, observer: Arc<dyn Observer>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(config.pool_idle_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(RelayError::Client)?;

        let default_user_agent = HeaderValue::from_str(&config.default_user_agent)?;

        Ok(Self {
            client,
            default_user_agent,
            observer,
        })
    }

    /// Validate the `url` query value and relay the request.
    ///
    /// Input errors come back as `Err` before any upstream call is made.
    pub async fn handle(
        &self,
        target: Option<&str>,
        client_headers: &HeaderMap,
    ) -> Result<Response, RelayError> {
        let source = match parse_target(target) {
            Ok(source) => source,
            Err(e) => {
                self.observer.record(DiagnosticEvent::new(
                    Level::DEBUG,
                    EventKind::RelayRejected,
                    format!("rejected target {target:?}: {e}"),
                ));
                return Err(e);
            }
        };

        self.forward(&source, client_headers).await
    }

    /// Issue the upstream GET and stream its response back.
    ///
    /// Upstream status codes are passed through untouched; only transport
    /// failures become errors.
    pub async fn forward(
        &self,
        source: &StreamSource,
        client_headers: &HeaderMap,
    ) -> Result<Response, RelayError> {
        let upstream_headers =
            headers::upstream_request_headers(client_headers, &self.default_user_agent);

        self.observer.record(DiagnosticEvent::new(
            Level::INFO,
            EventKind::RelayForward,
            format!(
                "fetching {source} range: {}",
                upstream_headers
                    .get(axum::http::header::RANGE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
            ),
        ));

        let upstream = self
            .client
            .get(source.url().clone())
            .headers(upstream_headers)
            .send()
            .await
            .map_err(|e| {
                self.observer.record(DiagnosticEvent::new(
                    Level::WARN,
                    EventKind::RelayUpstreamError,
                    format!("upstream request to {source} failed: {e}"),
                ));
                RelayError::Upstream(e)
            })?;

        let status = upstream.status();
        let response_headers = headers::relay_response_headers(upstream.headers(), source.kind());

        let observer = Arc::clone(&self.observer);
        let target = source.to_string();
        let body = upstream.bytes_stream().inspect_err(move |e| {
            observer.record(DiagnosticEvent::new(
                Level::WARN,
                EventKind::RelayBodyError,
                format!("upstream body from {target} aborted: {e}"),
            ));
        });

        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Turn the raw `url` query value into a validated source.
///
/// An empty value counts as missing.
pub fn parse_target(target: Option<&str>) -> Result<StreamSource, RelayError> {
    let raw = target
        .filter(|t| !t.is_empty())
        .ok_or(RelayError::MissingUrl)?;
    Ok(StreamSource::parse(raw)?)
}

/// Preflight handler suitable for `OPTIONS` routes.
#[allow(clippy::unused_async)]
pub async fn proxy_options_preflight() -> impl IntoResponse {
    (StatusCode::OK, headers::cors_headers())
}
