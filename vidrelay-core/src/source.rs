//! Stream source classification
//!
//! A [`StreamSource`] is a validated absolute http/https URL together with
//! its [`StreamKind`]. The relay uses the kind to infer a `Content-Type`
//! when upstream omits one; the playback controller uses it to pick an
//! engine.

use url::Url;

use crate::error::{Error, Result};

/// MIME type of an adaptive (HLS) playlist.
pub const MANIFEST_MIME: &str = "application/vnd.apple.mpegurl";

/// MIME type of a raw MPEG transport stream.
pub const TRANSPORT_STREAM_MIME: &str = "video/mp2t";

/// Fallback MIME type for anything else.
pub const BINARY_MIME: &str = "application/octet-stream";

/// Shape of a stream URL, decided by the extension of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `.m3u8` playlist
    AdaptiveManifest,
    /// `.ts` transport stream
    TransportStream,
    Other,
}

impl StreamKind {
    /// Classify by path extension. Query string and fragment are ignored.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let path = url.path().to_ascii_lowercase();
        if path.ends_with(".m3u8") {
            Self::AdaptiveManifest
        } else if path.ends_with(".ts") {
            Self::TransportStream
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::AdaptiveManifest => MANIFEST_MIME,
            Self::TransportStream => TRANSPORT_STREAM_MIME,
            Self::Other => BINARY_MIME,
        }
    }
}

/// A validated upstream stream location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    url: Url,
    kind: StreamKind,
}

impl StreamSource {
    /// Parse and validate a target URL.
    ///
    /// Only absolute `http` and `https` URLs are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsupportedScheme(url.scheme().to_string()));
        }
        let kind = StreamKind::from_url(&url);
        Ok(Self { url, kind })
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        self.kind
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Wrap `target` as the `url` query parameter of the relay endpoint `base`.
///
/// Existing query pairs on `base` are kept.
#[must_use]
pub fn relay_url(base: &Url, target: &Url) -> Url {
    let mut wrapped = base.clone();
    wrapped.query_pairs_mut().append_pair("url", target.as_str());
    wrapped
}
