use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every request it guards.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Longest caller-supplied request id that is echoed back as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

fn caller_request_id(req: &Request) -> Option<String> {
    let raw = req.headers().get("x-request-id")?.to_str().ok()?.trim();
    (!raw.is_empty() && raw.len() <= MAX_REQUEST_ID_LEN).then(|| raw.to_string())
}

/// Tags every request with a [`RequestId`] extension and echoes it in the
/// `x-request-id` response header. Missing or oversized caller ids are
/// replaced with a fresh `UUIDv4`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = caller_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }
    res
}

/// Counts requests against the shared window. Over the limit the caller
/// gets a `rate_limited` envelope and a `Retry-After` for the window rest.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let retry_after = {
        let mut window = rate_limit.current.lock().await;
        if window.started_at.elapsed() >= rate_limit.window {
            window.started_at = Instant::now();
            window.count = 0;
        }
        if window.count < rate_limit.max_requests {
            window.count += 1;
            None
        } else {
            Some(rate_limit.window.saturating_sub(window.started_at.elapsed()))
        }
    };

    let Some(retry_after) = retry_after else {
        return next.run(req).await;
    };

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    tracing::warn!(%request_id, path = %req.uri().path(), "rate limit exceeded");

    let mut res =
        ApiError::new(request_id, ErrorCode::RateLimited, "rate limit exceeded").into_response();
    res.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after.as_secs().max(1)),
    );
    res
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    fn limited_app(max_requests: usize) -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(max_requests, Duration::from_secs(60)),
                enforce_rate_limit,
            ))
            .layer(axum::middleware::from_fn(request_id))
    }

    fn ping() -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri("/ping")
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn request_id_is_echoed_when_supplied() {
        let response = limited_app(10)
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response.headers().get("x-request-id").map(HeaderValue::as_bytes),
            Some(&b"abc-123"[..])
        );
    }

    #[tokio::test]
    async fn request_id_is_generated_when_missing() {
        let response = limited_app(10).oneshot(ping()).await.expect("response");

        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("generated id");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn requests_over_the_limit_are_rejected() {
        let app = limited_app(2);

        for _ in 0..2 {
            let response = app.clone().oneshot(ping()).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.oneshot(ping()).await.expect("response");

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .expect("retry-after");
        assert!((1..=60).contains(&retry_after));
    }

    #[tokio::test]
    async fn oversized_request_id_is_replaced() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let response = limited_app(10)
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header("x-request-id", long.as_str())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("id");
        assert_ne!(id, long);
        assert!(Uuid::parse_str(id).is_ok());
    }
}
