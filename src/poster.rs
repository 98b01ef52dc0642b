//! The poster façade: fire-and-forget posting with bulk cancellation.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    client::{PosterConfig, Transport},
    delivery,
    error::{PostError, Result},
    registry::{CancelRegistry, RegistryGuard},
    schedule::RetrySchedule,
};

/// Ships JSON payloads to HTTP collectors without blocking the caller.
///
/// Owns one shared transport, the registry of live deliveries, and the
/// in-flight gauge. Created once per process or target; cheap to clone, all
/// clones share the same transport and registry.
///
/// [`JsonPoster::post`] reports nothing back: completion, exhaustion, and
/// cancellation are visible only through logging and the
/// [`active_posts`](JsonPoster::active_posts) gauge. This mirrors the logging
/// pipeline contract where emitting a log event must never stall or fail the
/// caller.
#[derive(Debug, Clone)]
pub struct JsonPoster {
    transport: Arc<Transport>,
    registry: Arc<CancelRegistry>,
    active_posts: Arc<AtomicUsize>,
}

impl JsonPoster {
    /// Creates a poster with the given transport configuration.
    ///
    /// # Errors
    ///
    /// Returns `PostError::Configuration` if the HTTP client cannot be
    /// built. Under normal conditions this does not fail.
    pub fn new(config: PosterConfig) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(Transport::new(&config)?),
            registry: Arc::new(CancelRegistry::new()),
            active_posts: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Creates a poster with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `PostError::Configuration` if the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self> {
        Self::new(PosterConfig::default())
    }

    /// Adds a static header sent with every subsequently created request.
    ///
    /// Intended for setup time, before concurrent posting begins; requests
    /// already constructed keep the headers they were built with. Invalid
    /// header names or values are logged and ignored. Returns `&Self` to
    /// allow chaining.
    pub fn add_header(&self, name: &str, value: &str) -> &Self {
        if !self.transport.add_header(name, value) {
            warn!(header = name, "ignoring invalid static header");
        }
        self
    }

    /// Starts a fire-and-forget delivery of `json` to `url`.
    ///
    /// Registers a cancellation handle, increments the in-flight gauge, and
    /// spawns the attempt loop on the current tokio runtime. Returns as soon
    /// as the task is spawned; the delivery's outcome is never reported back.
    /// An empty schedule produces a delivery that terminates immediately
    /// without any network call.
    ///
    /// # Errors
    ///
    /// Fails fast with `PostError::Closed` after [`close`](Self::close), or
    /// `PostError::InvalidUrl` when the destination does not parse. Delivery
    /// failures are *not* errors here.
    pub fn post(&self, url: &str, json: impl Into<Bytes>, schedule: &RetrySchedule) -> Result<()> {
        if self.transport.is_closed() {
            return Err(PostError::Closed);
        }

        let url: reqwest::Url =
            url.parse().map_err(|e| PostError::invalid_url(format!("{e}")))?;
        let body = json.into();

        // Register and increment before spawning: a cancel_all issued right
        // after post returns is guaranteed to see this delivery.
        let guard = DeliveryGuard::new(self.registry.register(), Arc::clone(&self.active_posts));
        let token = guard.registry.token();
        let transport = Arc::clone(&self.transport);
        let schedule = schedule.clone();

        tokio::spawn(async move {
            let outcome = delivery::run(transport, url, body, schedule, token).await;
            debug!(?outcome, "delivery task finished");
            drop(guard);
            outcome
        });

        Ok(())
    }

    /// Serializes `payload` to JSON and posts it.
    ///
    /// # Errors
    ///
    /// `PostError::Serialization` when the payload cannot be encoded, plus
    /// everything [`post`](Self::post) returns.
    pub fn post_json<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
        schedule: &RetrySchedule,
    ) -> Result<()> {
        let json =
            serde_json::to_vec(payload).map_err(|e| PostError::serialization(e.to_string()))?;
        self.post(url, json, schedule)
    }

    /// Cancels every delivery registered at the time of the call.
    ///
    /// Best-effort bulk cancel: deliveries registered concurrently with the
    /// snapshot may be missed. Safe to call from any thread or task, at any
    /// time, including concurrently with `post`.
    pub fn cancel_all(&self) {
        let live = self.registry.len();
        debug!(live, "cancelling outstanding deliveries");
        self.registry.cancel_all();
    }

    /// Releases the shared transport. Idempotent.
    ///
    /// Does not cancel in-flight deliveries: their next attempt fails with a
    /// transport-closed error and runs through the remaining schedule like
    /// any other failure. Call [`cancel_all`](Self::cancel_all) first for a
    /// clean shutdown. Subsequent `post` calls fail with `PostError::Closed`.
    pub fn close(&self) {
        if self.transport.close() {
            info!("poster closed, transport released");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Number of deliveries currently in flight.
    ///
    /// Incremented when a delivery starts, decremented at its terminal state
    /// regardless of outcome. Always returns to zero once all started
    /// deliveries finish; usable as a backpressure or health signal.
    pub fn active_posts(&self) -> usize {
        self.active_posts.load(Ordering::SeqCst)
    }
}

/// Ties the gauge and registry membership to one delivery's lifetime.
///
/// Dropped at the task's terminal state (or during unwinding), restoring the
/// gauge and unregistering the cancellation handle exactly once.
#[derive(Debug)]
struct DeliveryGuard {
    registry: RegistryGuard,
    gauge: Arc<AtomicUsize>,
}

impl DeliveryGuard {
    fn new(registry: RegistryGuard, gauge: Arc<AtomicUsize>) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        Self { registry, gauge }
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_after_close_fails_fast() {
        let poster = JsonPoster::with_defaults().unwrap();
        poster.close();

        let result =
            poster.post("http://localhost:9/log", "{}", &RetrySchedule::from_secs(&[1]));
        assert!(matches!(result, Err(PostError::Closed)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let poster = JsonPoster::with_defaults().unwrap();
        poster.close();
        poster.close();
        assert!(poster.is_closed());
    }

    #[tokio::test]
    async fn invalid_url_rejected_before_spawn() {
        let poster = JsonPoster::with_defaults().unwrap();

        let result = poster.post("not a url", "{}", &RetrySchedule::from_secs(&[1]));
        assert!(matches!(result, Err(PostError::InvalidUrl { .. })));
        assert_eq!(poster.active_posts(), 0);
    }

    #[tokio::test]
    async fn add_header_chains() {
        let poster = JsonPoster::with_defaults().unwrap();
        poster.add_header("X-One", "1").add_header("X-Two", "2");
        // Invalid names are ignored rather than failing the chain.
        poster.add_header("not a header", "x").add_header("X-Three", "3");
    }

    #[tokio::test]
    async fn gauge_starts_at_zero() {
        let poster = JsonPoster::with_defaults().unwrap();
        assert_eq!(poster.active_posts(), 0);
    }

    #[tokio::test]
    async fn post_json_serializes_payload() {
        let poster = JsonPoster::with_defaults().unwrap();
        poster.close();

        // Serialization happens before the closed check is relevant here;
        // a closed poster still reports Closed for a valid payload.
        #[derive(Serialize)]
        struct Event<'a> {
            level: &'a str,
        }

        let result = poster.post_json(
            "http://localhost:9/log",
            &Event { level: "warn" },
            &RetrySchedule::none(),
        );
        assert!(matches!(result, Err(PostError::Closed)));
    }
}
