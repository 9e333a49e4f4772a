//! # HTTP API
//!
//! Builds the axum router that exposes the wallet server's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                               | Description               |
//! |--------|------------------------------------|---------------------------|
//! | POST   | `/api/transactions/NewTransaction` | Submit a transfer         |
//! | GET    | `/health`                          | Liveness probe            |
//! | GET    | `/metrics`                         | Prometheus metrics        |
//!
//! Failures answer with `{"error": {"kind", "message", "retryable"}}` and a
//! status derived from the error kind.

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nova_wallet::{ErrorKind, SubmissionPipeline, SubmitError, TransferRequest};

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reported in `/health`.
    pub version: String,
    pub pipeline: Arc<SubmissionPipeline>,
    pub metrics: SharedMetrics,
}

impl FromRef<AppState> for SharedMetrics {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.metrics)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/transactions/NewTransaction", post(new_transaction_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Body of `POST /api/transactions/NewTransaction`.
#[derive(Deserialize)]
pub struct NewTransactionRequest {
    pub username: String,
    pub password: String,
    pub recipient: String,
    /// Decimal string; see [`decimal_text`].
    #[serde(deserialize_with = "decimal_text")]
    pub amount: String,
    /// Free-form payload, sent as UTF-8 text.
    #[serde(default)]
    pub payload: String,
}

impl fmt::Debug for NewTransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewTransactionRequest")
            .field("username", &self.username)
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// Amounts must be JSON strings. A JSON number has already been through
/// `f64` by the time it is seen here and may have lost digits, so it is
/// refused rather than rounded.
fn decimal_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct DecimalText;

    impl<'de> Visitor<'de> for DecimalText {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal string such as \"10.5\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> Result<String, E> {
            Err(E::custom(NUMERIC_AMOUNT))
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> Result<String, E> {
            Err(E::custom(NUMERIC_AMOUNT))
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<String, E> {
            Err(E::custom(NUMERIC_AMOUNT))
        }
    }

    deserializer.deserialize_any(DecimalText)
}

const NUMERIC_AMOUNT: &str = "amount must be a decimal string, not a JSON number";

/// Message sent for failures whose detail stays in the server log.
const INTERNAL_ERROR_MESSAGE: &str = "internal wallet error";

impl From<NewTransactionRequest> for TransferRequest {
    fn from(req: NewTransactionRequest) -> Self {
        TransferRequest {
            username: req.username,
            password: req.password,
            recipient: req.recipient,
            amount: req.amount,
            payload: req.payload.into_bytes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Policy => StatusCode::FORBIDDEN,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Signing => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Verification => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Ordering => StatusCode::CONFLICT,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Publish => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(kind: ErrorKind, message: String) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            kind,
            message,
            retryable: kind.is_retryable(),
        },
    };
    (status_for(kind), Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 while the server is up.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "version": state.version,
        "pending": state.pipeline.pending().len(),
    });
    (StatusCode::OK, Json(body))
}

/// `POST /api/transactions/NewTransaction` — submit one transfer.
async fn new_transaction_handler(
    State(state): State<AppState>,
    body: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => {
            return error_response(ErrorKind::Validation, rejection.body_text());
        }
    };

    let started = Instant::now();
    let result = state.pipeline.submit(req.into()).await;
    let outcome = result.as_ref().map(|_| ()).map_err(SubmitError::kind);
    state.metrics.observe_submission(outcome, started.elapsed());

    match result {
        Ok(tx) => (StatusCode::OK, Json(tx)).into_response(),
        Err(err) => {
            let kind = err.kind();
            let message = match kind {
                ErrorKind::Persistence | ErrorKind::Signing => {
                    tracing::error!(kind = %kind, error = %err, "submission failed inside the wallet");
                    INTERNAL_ERROR_MESSAGE.to_string()
                }
                _ => err.to_string(),
            };
            error_response(kind, message)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
