use thiserror::Error;

/// Errors validating a stream location.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Only HTTP/HTTPS allowed")]
    UnsupportedScheme(String),
}

pub type Result<T> = std::result::Result<T, Error>;
