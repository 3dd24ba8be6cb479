//! Retry classification and backoff timing for backend invocations.
//!
//! Transient errors (`Transport`, `RateLimited`, `Timeout`) are retried
//! with exponential backoff; a `Rejected` response is deterministic for
//! the same request, so the same target is never asked again.

use std::time::Duration;

use rand::Rng;

use crate::config::DispatchConfig;
use crate::error::BackendError;

/// Hard floor preventing degenerate tight-loop retries.
const MIN_DELAY_MS: i64 = 100;

/// Returns `true` if the error is transient and the same target is worth
/// another attempt.
pub(crate) fn is_retryable(err: &BackendError) -> bool {
    matches!(
        err,
        BackendError::Transport(_) | BackendError::RateLimited { .. } | BackendError::Timeout(_)
    )
}

/// Exponential backoff delay with 25% jitter, capped at `max_delay`.
///
/// Formula: `base_delay * 2^attempt`, then add uniform jitter in
/// [-25%, +25%], with a 100ms floor.
pub(crate) fn backoff_delay(config: &DispatchConfig, attempt: u32) -> Duration {
    let base_ms = config.base_delay().as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    let capped_ms = exp_ms.min(config.max_delay().as_millis() as u64);

    let jitter_range = capped_ms / 4; // 25%
    let jitter = if jitter_range > 0 {
        let offset = rand::thread_rng().gen_range(0..=jitter_range.saturating_mul(2));
        offset as i64 - jitter_range as i64
    } else {
        0
    };
    let delay_ms = (capped_ms as i64 + jitter).max(MIN_DELAY_MS) as u64;
    Duration::from_millis(delay_ms)
}

/// Delay before the next attempt: a rate-limited backend's own suggestion
/// wins when present (capped at `max_delay`), otherwise exponential
/// backoff.
pub(crate) fn retry_delay(err: &BackendError, config: &DispatchConfig, attempt: u32) -> Duration {
    if let BackendError::RateLimited {
        retry_after: Some(suggested),
    } = err
    {
        return (*suggested).min(config.max_delay());
    }
    backoff_delay(config, attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_ms: u64, max_ms: u64) -> DispatchConfig {
        DispatchConfig {
            max_retries: 3,
            base_delay_ms: base_ms,
            max_delay_ms: max_ms,
            invoke_timeout_ms: 30_000,
        }
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(is_retryable(&BackendError::Transport("503".into())));
        assert!(is_retryable(&BackendError::RateLimited { retry_after: None }));
        assert!(is_retryable(&BackendError::Timeout(Duration::from_secs(5))));
    }

    #[test]
    fn rejection_is_not_retryable() {
        assert!(!is_retryable(&BackendError::Rejected("unsupported".into())));
    }

    #[test]
    fn backoff_grows_exponentially_within_jitter_bounds() {
        let config = config(1_000, 60_000);
        for attempt in 0..4 {
            let expected = 1_000u64 * 2u64.pow(attempt);
            let delay = backoff_delay(&config, attempt).as_millis() as u64;
            let low = expected - expected / 4;
            let high = expected + expected / 4;
            assert!(
                (low..=high).contains(&delay),
                "attempt {attempt}: delay {delay} outside [{low}, {high}]"
            );
        }
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let config = config(1_000, 2_000);
        // 1000 * 2^6 = 64s, cap 2s, jitter at most +25%
        let delay = backoff_delay(&config, 6);
        assert!(delay <= Duration::from_millis(2_500), "{delay:?}");
    }

    #[test]
    fn backoff_never_goes_below_floor() {
        let config = config(1, 10);
        for attempt in 0..5 {
            assert!(backoff_delay(&config, attempt) >= Duration::from_millis(100));
        }
    }

    #[test]
    fn rate_limit_suggestion_wins_over_backoff() {
        let config = config(10_000, 60_000);
        let err = BackendError::RateLimited {
            retry_after: Some(Duration::from_millis(250)),
        };
        assert_eq!(retry_delay(&err, &config, 0), Duration::from_millis(250));
    }

    #[test]
    fn rate_limit_suggestion_is_capped_at_max_delay() {
        let config = config(100, 1_000);
        let err = BackendError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        };
        assert_eq!(retry_delay(&err, &config, 0), Duration::from_secs(1));
    }
}
