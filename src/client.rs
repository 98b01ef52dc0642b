//! Shared HTTP transport for log delivery.
//!
//! Wraps one `reqwest` client (connection pool, default headers, timeout)
//! behind a swappable handle so the poster can release the transport exactly
//! once while deliveries are still in flight. A delivery that touches the
//! transport after close fails that attempt with
//! [`AttemptError::TransportClosed`] and proceeds through its schedule like
//! any other failure.

use std::time::Duration;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE},
    Url,
};
use serde::{Deserialize, Serialize};

use crate::error::{AttemptError, PostError};

/// Content type attached to every delivery request.
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Configuration for the poster's HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterConfig {
    /// Timeout for a single delivery attempt.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// The shared transport handle owned by a poster.
///
/// Read-mostly: delivery tasks only load the client and snapshot the static
/// header set per attempt. Header mutation is meant for setup time, before
/// concurrent post traffic begins; headers apply to subsequently constructed
/// requests only.
#[derive(Debug)]
pub(crate) struct Transport {
    client: ArcSwapOption<reqwest::Client>,
    static_headers: RwLock<HeaderMap>,
    timeout: Duration,
}

impl Transport {
    /// Builds the transport with `Connection: close` semantics and an
    /// `Accept: application/json` default header.
    ///
    /// # Errors
    ///
    /// Returns `PostError::Configuration` if the HTTP client cannot be
    /// configured with the provided settings.
    pub fn new(config: &PosterConfig) -> Result<Self, PostError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(default_headers)
            .build()
            .map_err(|e| PostError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: ArcSwapOption::from_pointee(client),
            static_headers: RwLock::new(HeaderMap::new()),
            timeout: config.timeout,
        })
    }

    /// Adds a static header applied to every subsequently created request.
    ///
    /// Returns false (and leaves the header set untouched) when the name or
    /// value is not a valid HTTP header.
    pub fn add_header(&self, name: &str, value: &str) -> bool {
        let Ok(name) = name.parse::<HeaderName>() else {
            return false;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            return false;
        };

        self.static_headers.write().append(name, value);
        true
    }

    /// Performs one POST of `body` to `url`.
    ///
    /// # Errors
    ///
    /// Categorizes the attempt failure for the retry loop:
    /// - `TransportClosed` when the poster released the client
    /// - `Timeout` when the attempt exceeded the configured timeout
    /// - `Network` for connection-level failures
    /// - `Status` for any non-2xx response
    pub async fn send(&self, url: &Url, body: &Bytes) -> Result<(), AttemptError> {
        let Some(client) = self.client.load_full() else {
            return Err(AttemptError::TransportClosed);
        };

        let static_headers = self.static_headers.read().clone();

        let response = client
            .post(url.clone())
            .headers(static_headers)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::timeout(self.timeout.as_secs())
                } else if e.is_connect() {
                    AttemptError::network(format!("connection failed: {e}"))
                } else {
                    AttemptError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AttemptError::status(status.as_u16()))
        }
    }

    /// Releases the shared client. Returns true only on the first call.
    pub fn close(&self) -> bool {
        self.client.swap(None).is_some()
    }

    /// Whether the transport has been released.
    pub fn is_closed(&self) -> bool {
        self.client.load().is_none()
    }
}
