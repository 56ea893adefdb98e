//! Error types for campusgate-fallback.
//!
//! These cover construction and configuration only. Request-time failures
//! never surface as `Error`: they are classified and returned inside an
//! [`ApiResponse`](crate::ApiResponse).

/// Shorthand for results carrying this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A fallback failure, optionally wrapping the error that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// An error with no underlying cause.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// An error that keeps `source` reachable through `Error::source`.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }
}

/// What went wrong.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Environment variable holds an unusable value.
    #[error("Environment variable {name}: {message}")]
    EnvVar { name: String, message: String },

    /// Error from the HTTP client layer.
    #[error("Client error: {0}")]
    Client(String),

    /// Error from persistent storage.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<campusgate_client::Error> for Error {
    fn from(err: campusgate_client::Error) -> Self {
        let message = err.kind.to_string();
        Error::with_source(ErrorKind::Client(message), err)
    }
}

impl From<campusgate_auth::Error> for Error {
    fn from(err: campusgate_auth::Error) -> Self {
        let message = err.kind.to_string();
        Error::with_source(ErrorKind::Storage(message), err)
    }
}
