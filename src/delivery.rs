//! The delivery attempt loop: the retry state machine behind every post.
//!
//! One delivery runs `Idle → Attempting → {Succeeded, Exhausted, Cancelled}`
//! with strictly sequential attempts. Both suspension points, the HTTP send
//! and the inter-attempt wait, race the task's cancellation token so one
//! cancel signal interrupts whichever is active. Exhaustion is silent by
//! design: the outcome is logged, never surfaced to the post caller.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Url;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{client::Transport, schedule::RetrySchedule};

/// Terminal state of one delivery.
///
/// Reported via logging and returned from the spawned task for tests;
/// callers of `post` never observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A 2xx response was received.
    Succeeded {
        /// Attempts performed, including the successful one.
        attempts: usize,
    },
    /// Every scheduled attempt failed (or the schedule was empty).
    Exhausted {
        /// Attempts performed.
        attempts: usize,
    },
    /// Cancellation fired before the delivery could complete.
    Cancelled {
        /// Attempts completed before cancellation.
        attempts: usize,
    },
}

impl Outcome {
    /// Number of network attempts this delivery performed.
    pub fn attempts(&self) -> usize {
        match *self {
            Self::Succeeded { attempts }
            | Self::Exhausted { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }
}

/// Runs one delivery's attempt loop to a terminal state.
///
/// For a schedule of length N: attempt `i` posts the payload; a 2xx response
/// succeeds; on failure the wait at index `i` is applied only when another
/// attempt remains. Cancellation is observed during the send and during the
/// wait.
pub(crate) async fn run(
    transport: Arc<Transport>,
    url: Url,
    body: Bytes,
    schedule: RetrySchedule,
    token: CancellationToken,
) -> Outcome {
    let total = schedule.attempts();
    debug!(url = %url, attempts = total, "starting delivery");

    for index in 0..total {
        let attempt = index + 1;

        let result = tokio::select! {
            result = transport.send(&url, &body) => result,
            () = token.cancelled() => {
                debug!(url = %url, attempt, "delivery cancelled during request");
                return Outcome::Cancelled { attempts: index };
            }
        };

        match result {
            Ok(()) => {
                info!(url = %url, attempt, "log event delivered");
                return Outcome::Succeeded { attempts: attempt };
            },
            Err(error) => {
                warn!(
                    url = %url,
                    attempt,
                    total,
                    error = %error,
                    "delivery attempt failed"
                );

                if let Some(wait) = schedule.wait_after(index) {
                    tokio::select! {
                        () = sleep(wait) => {}
                        () = token.cancelled() => {
                            debug!(url = %url, attempt, "delivery cancelled during retry wait");
                            return Outcome::Cancelled { attempts: attempt };
                        }
                    }
                }
            },
        }
    }

    // Best-effort contract: exhaustion is diagnostic-only.
    warn!(url = %url, attempts = total, "delivery abandoned, retry schedule exhausted");
    Outcome::Exhausted { attempts: total }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::PosterConfig;

    fn transport() -> Arc<Transport> {
        Arc::new(Transport::new(&PosterConfig::default()).unwrap())
    }

    fn url(mock_server: &MockServer) -> Url {
        format!("{}/log", mock_server.uri()).parse().unwrap()
    }

    async fn received(mock_server: &MockServer) -> usize {
        mock_server.received_requests().await.unwrap_or_default().len()
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let outcome = run(
            transport(),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::from_secs(&[1, 2, 5]),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, Outcome::Succeeded { attempts: 1 });
        assert_eq!(received(&mock_server).await, 1);
    }

    #[tokio::test]
    async fn failing_endpoint_exhausts_schedule() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let outcome = run(
            transport(),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::from_millis(&[10, 10, 10]),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, Outcome::Exhausted { attempts: 3 });
        assert_eq!(received(&mock_server).await, 3);
    }

    #[tokio::test]
    async fn succeeds_after_one_failure() {
        let mock_server = MockServer::start().await;

        // First request fails, subsequent requests succeed.
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let outcome = run(
            transport(),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::from_millis(&[10, 20]),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, Outcome::Succeeded { attempts: 2 });
        assert_eq!(received(&mock_server).await, 2);
    }

    #[tokio::test]
    async fn empty_schedule_makes_no_network_call() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let outcome = run(
            transport(),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::none(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, Outcome::Exhausted { attempts: 0 });
        assert_eq!(received(&mock_server).await, 0);
    }

    #[tokio::test]
    async fn cancellation_during_retry_wait_stops_delivery() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(
            transport(),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::new(vec![Duration::from_secs(60), Duration::from_secs(60)]),
            token.clone(),
        ));

        // Let the first attempt fail, then cancel mid-wait.
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled { attempts: 1 });
        assert_eq!(received(&mock_server).await, 1);
    }

    #[tokio::test]
    async fn transport_closed_mid_delivery_counts_as_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let transport = transport();
        let handle = tokio::spawn(run(
            Arc::clone(&transport),
            url(&mock_server),
            Bytes::from("{}"),
            RetrySchedule::from_millis(&[100, 100, 100]),
            CancellationToken::new(),
        ));

        // Close after the first attempt; the rest fail without touching the
        // network and the schedule still runs to exhaustion.
        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.close();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, Outcome::Exhausted { attempts: 3 });
        assert_eq!(received(&mock_server).await, 1);
    }
}
