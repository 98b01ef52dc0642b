//! Fire-and-forget JSON log shipping over HTTP.
//!
//! This crate implements the delivery engine behind an HTTP log target:
//! serialized log events are posted to a remote collector on independent
//! async tasks, retried on failure according to a caller-supplied schedule,
//! and cancellable in bulk (for example from a shutdown hook).
//!
//! # Guarantees
//!
//! - Posting never blocks the caller
//! - Bounded retries per delivery, with cancellable inter-attempt waits
//! - A live gauge of in-flight deliveries for backpressure signals
//! - Bulk cancellation of every delivery registered at call time
//!
//! # Non-Guarantees
//!
//! - Delivery is best-effort: exhausted retries are logged, never surfaced
//! - No ordering between deliveries
//! - No persistence of undelivered payloads
//!
//! # Architecture
//!
//! [`JsonPoster`] owns one shared HTTP transport. Each call to
//! [`JsonPoster::post`] registers a cancellation token, increments the
//! in-flight gauge, and spawns a delivery task that runs the attempt loop to
//! one of its terminal states (`Succeeded`, `Exhausted`, `Cancelled`)
//! without further input from the caller.
//!
//! # Example
//!
//! ```no_run
//! use logpost::{JsonPoster, RetrySchedule};
//!
//! # async fn example() -> Result<(), logpost::PostError> {
//! let poster = JsonPoster::with_defaults()?;
//! poster.add_header("X-Api-Key", "secret");
//!
//! let schedule = RetrySchedule::from_secs(&[1, 2, 5]);
//! poster.post("https://collector.example.com/log", r#"{"level":"warn"}"#, &schedule)?;
//!
//! // Later, e.g. on shutdown:
//! poster.cancel_all();
//! poster.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod delivery;
pub mod error;
pub mod registry;
pub mod schedule;

mod poster;

// Re-export main public API
pub use client::PosterConfig;
pub use delivery::Outcome;
pub use error::{AttemptError, PostError, Result};
pub use poster::JsonPoster;
pub use schedule::RetrySchedule;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Default user agent sent with every delivery.
pub const DEFAULT_USER_AGENT: &str = concat!("logpost/", env!("CARGO_PKG_VERSION"));
