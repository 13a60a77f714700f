//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/encrypt", post(handlers::encrypt))
        .route("/decrypt", post(handlers::decrypt))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use axum_test::TestServer;
    use common::protocol::{DecryptResponse, EncryptResponse, ErrorResponse};
    use processor::crypto::{DekRing, AES_256_GCM_SIV, KEY_LEN};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        // 503 because the test key ring is empty.
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn round_trip_over_http() {
        let ring = DekRing::new();
        ring.insert("dek-1", &[9u8; KEY_LEN]).unwrap();
        let server = TestServer::new(build(AppState::new(Arc::new(ring), "local"))).unwrap();

        let original = json!({
            "id": "42",
            "PK": "pk",
            "NonSensitive": "visible",
            "SensitiveStr": "abc",
            "SensitiveInt": 5
        });
        let resp = server
            .post("/encrypt")
            .json(&json!({
                "payload": original,
                "options": {
                    "DataEncryptionKeyId": "dek-1",
                    "EncryptionAlgorithm": AES_256_GCM_SIV,
                    "PathsToEncrypt": ["/SensitiveStr", "/SensitiveInt"]
                }
            }))
            .await;
        resp.assert_status_ok();
        let encrypted = resp.json::<EncryptResponse>().payload;
        assert_eq!(encrypted["NonSensitive"], "visible");
        assert_eq!(encrypted["_ei"]["EncryptionFormatVersion"], 3);

        let resp = server
            .post("/decrypt")
            .json(&json!({ "payload": encrypted }))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<DecryptResponse>().payload, original);
    }

    #[tokio::test]
    async fn not_found_body_is_structured() {
        let server = TestServer::new(build(AppState::default())).unwrap();
        let resp = server.get("/nope").await;
        resp.assert_status(axum::http::StatusCode::NOT_FOUND);
        assert_eq!(resp.json::<ErrorResponse>().code, "not_found");
    }
}
