//! Deadline and cancellation bounds for suspending registry operations.

use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a bounded operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    TimedOut,
    Cancelled,
}

/// Runs `future` until it completes, `deadline` passes, or `cancellation`
/// fires. Cancellation wins when both are ready.
pub(crate) async fn run_bounded<F: Future>(
    deadline: Instant,
    cancellation: Option<&CancellationToken>,
    future: F,
) -> Result<F::Output, Interrupted> {
    let timed = tokio::time::timeout_at(deadline, future);
    match cancellation {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(Interrupted::Cancelled),
            result = timed => result.map_err(|_| Interrupted::TimedOut),
        },
        None => timed.await.map_err(|_| Interrupted::TimedOut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_within_deadline() {
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(run_bounded(deadline, None, async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn times_out_after_deadline() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let result = run_bounded(deadline, None, tokio::time::sleep(Duration::from_secs(10))).await;
        assert_eq!(result, Err(Interrupted::TimedOut));
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(
            run_bounded(deadline, Some(&token), async { 1 }).await,
            Err(Interrupted::Cancelled)
        );
    }
}
