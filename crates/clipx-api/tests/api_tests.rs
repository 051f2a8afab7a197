//! API integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use clipx_api::{create_router, ApiConfig, AppState};
use clipx_extract::{ExtractionPipeline, RateLimit, ResponseCache, SourceStrategy, StrategyFindings, StrategyOutcome};
use clipx_models::{PostReference, VideoCandidate};

/// Strategy returning a fixed outcome.
struct Fixed {
    outcome: StrategyOutcome,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceStrategy for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn attempt(&self, _post: &PostReference) -> StrategyOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Strategy that panics mid-request.
struct Exploding;

#[async_trait]
impl SourceStrategy for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    async fn attempt(&self, _post: &PostReference) -> StrategyOutcome {
        panic!("upstream parser bug")
    }
}

fn router_with(strategies: Vec<Box<dyn SourceStrategy>>) -> Router {
    let pipeline = ExtractionPipeline::new(
        strategies,
        Arc::new(ResponseCache::new(Duration::from_secs(3600))),
        Duration::from_secs(5),
    );
    let state = AppState::with_pipeline(ApiConfig::default(), pipeline, 15);
    create_router(state, None)
}

fn router_returning(outcome: StrategyOutcome) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let strategy = Fixed {
        outcome,
        calls: calls.clone(),
    };
    (router_with(vec![Box::new(strategy)]), calls)
}

fn found() -> StrategyOutcome {
    StrategyOutcome::Found(StrategyFindings {
        candidates: vec![
            VideoCandidate::from_url_hint("https://video.example/clip_1280x720.mp4"),
            VideoCandidate::with_bitrate("u1", 3_000_000),
        ],
        caption: None,
        preview_image: Some("https://pbs.example/thumb.jpg".to_string()),
    })
}

fn extract_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_extract_success() {
    let (app, _) = router_returning(found());

    let body = json!({ "url": "https://x.com/user/status/123?foo=bar" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["tweetId"], "123");
    assert_eq!(json["title"], "Twitter Video");
    assert_eq!(json["previewImage"], "https://pbs.example/thumb.jpg");
    assert_eq!(json["videos"][0]["url"], "u1");
    assert_eq!(json["videos"][0]["quality"], "1080p");
    assert_eq!(json["videos"][0]["bitrate"], 3_000_000);
    assert_eq!(json["videos"][1]["quality"], "720p");
    assert!(json["videos"][1].get("bitrate").is_none());
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (app, calls) = router_returning(found());

    let (status, json) = send(app, extract_request(json!({}).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "URL is required" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_url_is_bad_request() {
    let (app, _) = router_returning(found());

    let body = json!({ "url": "https://example.com/user/status/123" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid Twitter URL");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = router_returning(found());

    let (status, json) = send(app, extract_request("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_bad_request() {
    let (app, calls) = router_returning(found());

    let padding = "a".repeat(70 * 1024);
    let body = json!({ "url": "https://x.com/user/status/1", "padding": padding }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len())
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "Invalid request body" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_video_is_not_found() {
    let (app, _) = router_returning(StrategyOutcome::empty());

    let body = json!({ "url": "https://twitter.com/user/status/9" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["rateLimited"], false);
    assert!(json["error"].as_str().unwrap().starts_with("No video found in this tweet."));
}

#[tokio::test]
async fn test_upstream_rate_limit_is_flagged_not_found() {
    let (app, _) = router_returning(StrategyOutcome::RateLimited(RateLimit::Upstream { reset_at: None }));

    let body = json!({ "url": "https://twitter.com/user/status/9" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["rateLimited"], true);
    assert!(json["error"].as_str().unwrap().contains("15 minutes"));
}

#[tokio::test]
async fn test_governor_denial_is_too_many_requests() {
    let (app, _) = router_returning(StrategyOutcome::RateLimited(RateLimit::Governor {
        retry_after: Duration::from_secs(15 * 60),
    }));

    let body = json!({ "url": "https://x.com/user/status/5" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        json,
        json!({
            "error": "Too many requests. Please try again in a few minutes.",
            "rateLimited": true,
            "retryAfterMinutes": 15
        })
    );
}

#[tokio::test]
async fn test_panic_is_internal_error_without_detail() {
    let app = router_with(vec![Box::new(Exploding)]);

    let body = json!({ "url": "https://x.com/user/status/5" }).to_string();
    let (status, json) = send(app, extract_request(body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": "Failed to extract video. Please try again later." }));
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let (app, calls) = router_returning(found());

    for _ in 0..2 {
        let body = json!({ "url": "https://x.com/user/status/77" }).to_string();
        let (status, _) = send(app.clone(), extract_request(body)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = router_returning(StrategyOutcome::empty());

    for uri in ["/health", "/healthz"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, json) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
    }
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let (app, _) = router_returning(StrategyOutcome::empty());

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let (app, _) = router_returning(StrategyOutcome::empty());

    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["X-Content-Type-Options"], "nosniff");
    assert_eq!(headers["X-Frame-Options"], "DENY");
    assert_eq!(headers["X-Request-ID"], "req-42");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = router_returning(StrategyOutcome::empty());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/extract")
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_per_ip_rate_limit() {
    let pipeline = ExtractionPipeline::new(
        vec![Box::new(Fixed {
            outcome: found(),
            calls: Arc::new(AtomicUsize::new(0)),
        })],
        Arc::new(ResponseCache::new(Duration::from_secs(3600))),
        Duration::from_secs(5),
    );
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..Default::default()
    };
    let app = create_router(AppState::with_pipeline(config, pipeline, 15), None);

    let mut responses = Vec::new();
    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/extract")
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::from(json!({ "url": "https://x.com/user/status/1" }).to_string()))
            .unwrap();
        responses.push(send(app.clone(), request).await);
    }

    assert_eq!(responses[0].0, StatusCode::OK);
    assert_eq!(responses[1].0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        responses[1].1,
        json!({
            "error": "Too many requests. Please try again in a few minutes.",
            "rateLimited": true,
            "retryAfterMinutes": 1
        })
    );
}
