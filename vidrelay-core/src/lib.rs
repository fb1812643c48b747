pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod observability;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use observability::{DiagnosticEvent, EventKind, Observer, TracingObserver};
pub use source::{relay_url, StreamKind, StreamSource};
