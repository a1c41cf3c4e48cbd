//! Error types for the HTTP facade.

use std::fmt;

use crate::http::HttpResponse;

/// Errors produced by the HTTP facade.
///
/// `Protocol` and `Network` are only ever surfaced through the completion
/// channel of a request (a rejected awaitable or the error callbacks);
/// `Configuration` is the single synchronous failure mode and is raised at
/// the call site that supplied the invalid argument.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Invalid configuration argument, e.g. an empty header key or value.
    Configuration(String),
    /// A response was obtained but indicates failure: a non-2xx status code
    /// or a body that could not be decoded into the requested shape.
    /// Carries the full response for inspection.
    Protocol(Box<HttpResponse>),
    /// The exchange failed before a response was obtained: DNS failure,
    /// refused connection, timeout, or an interrupted transfer.
    /// Carries the (status-less) response record for inspection.
    Network(Box<HttpResponse>),
    /// Invalid URL provided.
    InvalidUrl(String),
    /// I/O error.
    Io(String),
}

impl HttpError {
    /// The response attached to a `Protocol` or `Network` failure.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Protocol(response) | Self::Network(response) => Some(response),
            _ => None,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::Protocol(response) => match response.error() {
                Some(error) => write!(f, "HTTP {}: {error}", response.status_code()),
                None => write!(f, "HTTP {}", response.status_code()),
            },
            Self::Network(response) => {
                write!(
                    f,
                    "Network error: {}",
                    response.error().unwrap_or("connection failed")
                )
            }
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for HttpError {}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A specialized Result type for facade operations.
pub type Result<T> = std::result::Result<T, HttpError>;
