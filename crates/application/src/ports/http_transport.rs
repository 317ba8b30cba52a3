//! HTTP transport port

use async_trait::async_trait;
use courier_domain::{HttpResponse, PreparedRequest};

/// Errors reported by an HTTP transport.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Sends fully resolved requests.
///
/// The engine never performs network I/O itself; it prepares the request,
/// hands it to this port and consumes the response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the response.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if no response was received.
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError>;
}
