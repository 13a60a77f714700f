//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{
        DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse,
        HealthResponse,
    },
    ServiceError,
};
use processor::DiagnosticsContext;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::state::AppState;

/// `POST /encrypt`: encrypt the top-level properties named in
/// `options.PathsToEncrypt` and append the `_ei` envelope.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn encrypt(
    State(state): State<AppState>,
    body: Result<Json<EncryptRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected(rejection),
    };
    if !state.is_ready().await {
        return error_response(ServiceError::Unavailable("key provider is not ready".into()));
    }

    let mut payload = req.payload;
    let mut diagnostics = DiagnosticsContext::new();
    if let Err(e) = state
        .processor
        .encrypt_document(&mut payload, &req.options, &mut diagnostics)
        .await
    {
        return error_response(e.into());
    }
    debug!(diagnostics = %diagnostics.to_json(), "encrypt completed");

    (StatusCode::OK, Json(EncryptResponse { payload })).into_response()
}

/// `POST /decrypt`: restore every property listed in the payload's envelope.
///
/// A payload without an envelope is returned unchanged.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn decrypt(
    State(state): State<AppState>,
    body: Result<Json<DecryptRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected(rejection),
    };
    if !state.is_ready().await {
        return error_response(ServiceError::Unavailable("key provider is not ready".into()));
    }

    let mut payload = req.payload;
    let mut diagnostics = DiagnosticsContext::new();
    let props = match state
        .processor
        .decrypt_document(&mut payload, &mut diagnostics)
        .await
    {
        Ok(p) => p,
        Err(e) => return error_response(e.into()),
    };
    debug!(diagnostics = %diagnostics.to_json(), "decrypt completed");

    let decrypted_paths = props.map(|p| p.encrypted_paths).unwrap_or_default();
    (StatusCode::OK, Json(DecryptResponse { payload, decrypted_paths })).into_response()
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` when the key provider is ready, `503 Service Unavailable`
/// otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let ready = state.is_ready().await;
    let (status_code, status_str) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        provider: state.provider.to_string(),
        ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(code = err.code(), error = %err, "request failed");
    } else {
        debug!(code = err.code(), error = %err, "request rejected");
    }
    let body = ErrorResponse::new(err.code(), err.public_message());
    (status, Json(body)).into_response()
}

fn rejected(rejection: JsonRejection) -> Response {
    let body = ErrorResponse::new("bad_request", rejection.body_text());
    (rejection.status(), Json(body)).into_response()
}
