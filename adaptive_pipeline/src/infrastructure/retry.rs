// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `with_retry` wraps a transient-error-prone async operation with
//! [`storx_uplink_domain::services::BackoffSchedule`]'s
//! exponential-with-full-jitter delays, cancellation-aware between
//! attempts.

use std::future::Future;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::services::BackoffSchedule;

/// Retries `operation` while it returns a retryable [`UplinkError`], up to
/// `schedule.max_retries()` additional attempts beyond the first. Returns
/// `Err(UplinkError::Cancelled)` without invoking `operation` if
/// `cancellation` is already cancelled; checks again between attempts
/// rather than mid-attempt.
pub async fn with_retry<T, F, Fut>(cancellation: &CancellationToken, schedule: BackoffSchedule, mut operation: F) -> Result<T, UplinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UplinkError>>,
{
    if cancellation.is_cancelled() {
        return Err(UplinkError::Cancelled);
    }

    let mut attempt = 0u32;
    loop {
        let result = operation().await;
        match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= schedule.max_retries() => return Err(e),
            Err(e) => {
                attempt += 1;
                let ceiling = schedule.delay_ceiling_ms(attempt);
                let delay_ms = rand::rng().random_range(0..=ceiling);

                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Err(UplinkError::Cancelled),
                    _ = tokio::time::sleep(std::time::Duration::from_millis(delay_ms)) => {}
                }
                tracing::debug!(attempt, delay_ms, error = %e, "retrying after transient error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn cancelled_context_invokes_operation_zero_times() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let result = with_retry(&token, BackoffSchedule::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UplinkError>(())
        })
        .await;
        assert!(matches!(result, Err(UplinkError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retries_transient_errors_and_eventually_fails() {
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let schedule = BackoffSchedule::new(1, 5, 2);
        let result: Result<(), UplinkError> = with_retry(&token, schedule, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UplinkError::TransientNetwork("connection reset".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3, "initial attempt plus 2 retries");
    }

    #[tokio::test]
    async fn succeeds_after_one_transient_failure() {
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let schedule = BackoffSchedule::new(1, 5, 3);
        let result = with_retry(&token, schedule, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(UplinkError::TransientNetwork("connection reset".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), UplinkError> = with_retry(&token, BackoffSchedule::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UplinkError::crypto("bad tag"))
        })
        .await;
        assert!(matches!(result, Err(UplinkError::Crypto(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
