use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::headers::cors_headers;

/// Failures the relay reports to the client.
///
/// Every variant renders as plain text with CORS headers attached so a
/// browser page can read the reason.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing 'url' query param")]
    MissingUrl,

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Only HTTP/HTTPS allowed")]
    UnsupportedScheme,

    #[error("Proxy error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Invalid default User-Agent: {0}")]
    UserAgent(#[from] axum::http::header::InvalidHeaderValue),
}

impl RelayError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::InvalidUrl | Self::UnsupportedScheme => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Client(_) | Self::UserAgent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<vidrelay_core::Error> for RelayError {
    fn from(err: vidrelay_core::Error) -> Self {
        use vidrelay_core::Error;

        match err {
            Error::UnsupportedScheme(_) => Self::UnsupportedScheme,
            Error::InvalidUrl(_) => Self::InvalidUrl,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), cors_headers(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_bad_requests() {
        assert_eq!(RelayError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::InvalidUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::UnsupportedScheme.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_core_errors_map_to_relay_errors() {
        let err: RelayError = vidrelay_core::StreamSource::parse("not-a-url")
            .unwrap_err()
            .into();
        assert!(matches!(err, RelayError::InvalidUrl));
        assert_eq!(err.to_string(), "Invalid URL");

        let err: RelayError = vidrelay_core::StreamSource::parse("ftp://example.com/a.ts")
            .unwrap_err()
            .into();
        assert!(matches!(err, RelayError::UnsupportedScheme));
    }

    #[test]
    fn test_response_carries_cors() {
        let response = RelayError::MissingUrl.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
