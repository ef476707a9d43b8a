//! Exponential back-off with jitter for marketplace calls.

use std::future::Future;
use std::time::Duration;

use crate::error::MarketplaceError;

const MAX_DELAY_MS: u64 = 30_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Transport failures, per-call timeouts, rate limits and 5xx responses are
/// transient. Everything else (GraphQL errors, malformed bodies, not-found,
/// caller mistakes) is returned to the caller on the first occurrence.
pub(crate) fn is_retriable(err: &MarketplaceError) -> bool {
    match err {
        MarketplaceError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        MarketplaceError::Timeout { .. } | MarketplaceError::RateLimited { .. } => true,
        MarketplaceError::UnexpectedStatus { status, .. } => *status >= 500,
        MarketplaceError::Graphql { .. }
        | MarketplaceError::Deserialize { .. }
        | MarketplaceError::NotFound { .. }
        | MarketplaceError::BatchTooLarge { .. }
        | MarketplaceError::MissingCredential(_)
        | MarketplaceError::InvalidUrl { .. }
        | MarketplaceError::IndexingTimedOut { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based): `base_ms × 2^(attempt-1)`,
/// capped, then scaled by a random factor in `[0.75, 1.25)`.
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let capped = base_ms.saturating_mul(1u64 << exponent).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(jittered)
}

/// The back-off delay, stretched to a `Retry-After` hint when the server
/// sent one. Hints are capped like computed delays.
fn next_delay(err: &MarketplaceError, base_ms: u64, attempt: u32) -> Duration {
    let backoff = backoff_delay(base_ms, attempt);
    match err.retry_after() {
        Some(hint) => backoff.max(hint.min(Duration::from_millis(MAX_DELAY_MS))),
        None => backoff,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, MarketplaceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketplaceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = next_delay(&err, backoff_base_ms, attempt);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "marketplace transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn graphql_and_not_found_are_not_retriable() {
        assert!(!is_retriable(&MarketplaceError::Graphql {
            operation: "productByID".to_owned(),
            message: "bad input".to_owned(),
        }));
        assert!(!is_retriable(&MarketplaceError::NotFound {
            id: "B000".to_owned()
        }));
    }

    #[test]
    fn rate_limit_timeout_and_5xx_are_retriable() {
        assert!(is_retriable(&MarketplaceError::RateLimited {
            retry_after_secs: None
        }));
        assert!(is_retriable(&MarketplaceError::Timeout {
            operation: "productByID".to_owned()
        }));
        assert!(is_retriable(&MarketplaceError::UnexpectedStatus {
            status: 503,
            operation: "productByID".to_owned()
        }));
        assert!(!is_retriable(&MarketplaceError::UnexpectedStatus {
            status: 401,
            operation: "productByID".to_owned()
        }));
    }

    #[test]
    fn backoff_delay_stays_within_jitter_band_and_cap() {
        for _ in 0..50 {
            let first = backoff_delay(1_000, 1).as_millis();
            assert!((750..1_250).contains(&first), "first delay {first}");
            let third = backoff_delay(1_000, 3).as_millis();
            assert!((3_000..5_000).contains(&third), "third delay {third}");
            let huge = backoff_delay(1_000, 30).as_millis();
            assert!(huge < 37_500, "capped delay {huge}");
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(MarketplaceError::RateLimited {
                        retry_after_secs: None,
                    })
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_after_hint_stretches_short_backoff() {
        let hinted = MarketplaceError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert_eq!(next_delay(&hinted, 1, 1), Duration::from_secs(2));

        let huge = MarketplaceError::RateLimited {
            retry_after_secs: Some(3_600),
        };
        assert_eq!(next_delay(&huge, 1, 1), Duration::from_millis(MAX_DELAY_MS));

        let bare = MarketplaceError::RateLimited {
            retry_after_secs: None,
        };
        assert!(next_delay(&bare, 1, 1) < Duration::from_millis(2));
    }

    #[tokio::test]
    async fn retry_waits_for_the_server_hint() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let started = std::time::Instant::now();
        let result = retry_with_backoff(1, 1, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MarketplaceError::RateLimited {
                        retry_after_secs: Some(1),
                    })
                } else {
                    Ok(1u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(MarketplaceError::Timeout {
                    operation: "productSearch".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(MarketplaceError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(MarketplaceError::NotFound {
                    id: "B000".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(MarketplaceError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
