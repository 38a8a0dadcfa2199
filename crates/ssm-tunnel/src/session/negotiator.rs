//! Fixed-delay, bounded-retry session negotiation.

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::control::{ControlPlaneClient, ControlPlaneError, SessionResult};
use crate::shutdown;

use super::request::SessionRequest;

/// Errors from session negotiation.
#[derive(Debug, thiserror::Error)]
pub enum NegotiateError {
    #[error("Failed to start session after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ControlPlaneError,
    },

    #[error("Session negotiation cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Start a session, retrying up to `request.attempts()` times.
///
/// The delay between attempts is fixed and is skipped after the final
/// attempt. Setting `shutdown` to `true` interrupts the attempt or the delay
/// in progress.
pub async fn negotiate(
    client: &dyn ControlPlaneClient,
    request: &SessionRequest,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SessionResult, NegotiateError> {
    let max_attempts = request.attempts();
    let input = request.to_start_input();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if shutdown::is_cancelled(shutdown) {
            return Err(NegotiateError::Cancelled {
                attempts: attempt - 1,
            });
        }

        info!(
            target_id = %request.instance_id,
            document = %request.document_name,
            attempt,
            max_attempts,
            "Attempting to start session"
        );

        let outcome = tokio::select! {
            res = client.start_session(&input) => res,
            () = shutdown::cancelled(shutdown) => {
                return Err(NegotiateError::Cancelled { attempts: attempt });
            }
        };

        match outcome.and_then(|result| result.validate().map(|()| result)) {
            Ok(result) => {
                info!(session_id = %result.session_id, attempt, "Session started");
                return Ok(result);
            }
            Err(e) => {
                warn!(error = %e, attempt, max_attempts, "Failed to start session");
                last_error = Some(e);
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                () = sleep(request.retry_wait_interval) => {}
                () = shutdown::cancelled(shutdown) => {
                    info!(attempt, "Session negotiation cancelled during retry wait");
                    return Err(NegotiateError::Cancelled { attempts: attempt });
                }
            }
        }
    }

    Err(NegotiateError::Exhausted {
        attempts: max_attempts,
        source: last_error
            .unwrap_or_else(|| ControlPlaneError::Other("no attempt was made".into())),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedControlPlane;
    use std::time::Duration;
    use tokio::time::Instant;

    fn ok_result() -> SessionResult {
        SessionResult::new("abcd123456", "http://127.0.0.1", "xyz0123456")
    }

    fn request(max_retries: u32, wait: Duration) -> SessionRequest {
        SessionRequest::new("i-abcd123456", "document")
            .with_parameter("hello", ["world".to_string()])
            .with_retries(max_retries, wait)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_final_attempt_after_fixed_delays() {
        let client = ScriptedControlPlane::failing_then_ok(4, ok_result());
        let (_tx, mut rx) = watch::channel(false);
        let req = request(5, Duration::from_secs(5));

        let started = Instant::now();
        let result = negotiate(&client, &req, &mut rx).await.unwrap();

        assert_eq!(result, ok_result());
        assert_eq!(client.start_count(), 5);
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let client = ScriptedControlPlane::failing_then_ok(1, ok_result());
        let (_tx, mut rx) = watch::channel(false);
        let req = request(5, Duration::from_secs(5));

        let started = Instant::now();
        negotiate(&client, &req, &mut rx).await.unwrap();

        assert_eq!(client.start_count(), 2);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_makes_one_attempt_without_delay() {
        let client = ScriptedControlPlane::new(vec![Err(ControlPlaneError::Throttled(
            "slow down".into(),
        ))]);
        let (_tx, mut rx) = watch::channel(false);
        let req = request(0, Duration::from_secs(30));

        let started = Instant::now();
        let err = negotiate(&client, &req, &mut rx).await.unwrap_err();

        assert_eq!(client.start_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
        match err {
            NegotiateError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 1);
                assert_eq!(source, ControlPlaneError::Throttled("slow down".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error_and_skips_final_delay() {
        let client = ScriptedControlPlane::failing_then_ok(3, ok_result());
        let (_tx, mut rx) = watch::channel(false);
        let req = request(3, Duration::from_secs(2));

        let started = Instant::now();
        let err = negotiate(&client, &req, &mut rx).await.unwrap_err();

        assert_eq!(client.start_count(), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(
            matches!(err, NegotiateError::Exhausted { source: ControlPlaneError::Unavailable(ref m), .. } if m == "attempt 3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_result_counts_as_failed_attempt() {
        let client = ScriptedControlPlane::new(vec![
            Ok(SessionResult::new("s-1", "", "token")),
            Ok(ok_result()),
        ]);
        let (_tx, mut rx) = watch::channel(false);

        let result = negotiate(&client, &request(2, Duration::from_secs(1)), &mut rx)
            .await
            .unwrap();
        assert_eq!(result.session_id, "abcd123456");
        assert_eq!(client.start_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_retry_wait() {
        let client = ScriptedControlPlane::failing_then_ok(10, ok_result());
        let (tx, mut rx) = watch::channel(false);
        let req = request(10, Duration::from_secs(60));

        let canceller = tokio::spawn(async move {
            sleep(Duration::from_secs(90)).await;
            tx.send(true).ok();
        });

        let started = Instant::now();
        let err = negotiate(&client, &req, &mut rx).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, NegotiateError::Cancelled { attempts: 2 }));
        assert_eq!(client.start_count(), 2);
        assert!(started.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_attempt() {
        let client = ScriptedControlPlane::new(vec![Ok(ok_result())]);
        let (_tx, mut rx) = watch::channel(true);

        let err = negotiate(&client, &request(3, Duration::ZERO), &mut rx)
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiateError::Cancelled { attempts: 0 }));
        assert_eq!(client.start_count(), 0);
    }
}
