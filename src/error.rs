//! Error types for log delivery operations.
//!
//! Two distinct surfaces: [`PostError`] covers everything that can fail
//! *before* a delivery task starts and is the only error a caller ever sees.
//! [`AttemptError`] describes why one network attempt failed; it drives the
//! retry loop and diagnostic logging but is never propagated to the caller,
//! reflecting the fire-and-forget contract.

use thiserror::Error;

/// Result type alias for poster operations.
pub type Result<T> = std::result::Result<T, PostError>;

/// Errors returned to the caller of [`crate::JsonPoster`] operations.
///
/// Delivery outcomes are deliberately absent: once `post` accepts a request,
/// success, exhaustion, and cancellation are side effects only.
#[derive(Debug, Clone, Error)]
pub enum PostError {
    /// Poster has been closed; the shared transport is gone.
    #[error("poster is closed")]
    Closed,

    /// Destination URL could not be parsed.
    #[error("invalid destination url: {message}")]
    InvalidUrl {
        /// Parse error message
        message: String,
    },

    /// HTTP transport could not be configured.
    #[error("failed to configure transport: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Payload could not be serialized to JSON.
    #[error("failed to serialize payload: {message}")]
    Serialization {
        /// Serialization error message
        message: String,
    },
}

impl PostError {
    /// Creates an invalid-URL error from a parse failure.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }
}

/// Why a single delivery attempt failed.
///
/// Every variant is treated identically by the attempt loop: the failure is
/// logged and the schedule decides whether another attempt follows. A non-2xx
/// status is not privileged over a connection reset.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    /// Network-level connectivity failure.
    #[error("network error: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// Request exceeded the transport timeout.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Collector responded with a non-2xx status.
    #[error("collector returned HTTP {status_code}")]
    Status {
        /// HTTP status code
        status_code: u16,
    },

    /// Poster was closed while this delivery was in flight.
    #[error("transport closed")]
    TransportClosed,
}

impl AttemptError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a status error from an HTTP response.
    pub fn status(status_code: u16) -> Self {
        Self::Status { status_code }
    }
}
