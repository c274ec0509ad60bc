//! # REST API
//!
//! Builds the axum router for the node's HTTP interface. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                        |
//! |--------|-------------------------------|------------------------------------|
//! | GET    | `/health`                     | Liveness probe                     |
//! | GET    | `/status`                     | Node status summary                |
//! | POST   | `/registers`                  | Initiate register creation         |
//! | POST   | `/registers/:id/finalize`     | Finalize creation with attestations|
//! | POST   | `/registers/:id/transactions` | Submit a transaction               |
//! | POST   | `/registers/:id/dockets`      | Trigger a docket build             |
//! | GET    | `/registers/:id`              | Register summary + chain tip       |
//! | GET    | `/registers/:id/mempool`      | Pending transaction ids in order   |
//!
//! ## Error mapping
//!
//! Validation rejections at submit are answered in-band with HTTP 200 and
//! `{isValid: false, added: false, reason}` -- the request was handled, the
//! transaction was judged. Everything else gets a real status code:
//! governance 403, capacity 429, unknown register 404, lifecycle/protocol
//! conflicts 409, malformed protocol input 422, collaborator failures 502.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use keystone_ledger::register::{RegisterOwner, SignedAttestation};
use keystone_ledger::transaction::{IntakeError, Transaction};
use keystone_ledger::{
    BuildOutcome, CreationError, DocketPipeline, PipelineError, Register,
    RegisterCreationCoordinator, RegisterDirectory, TransactionIntake,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone -- everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<RegisterDirectory>,
    pub intake: Arc<TransactionIntake>,
    pub pipeline: Arc<DocketPipeline>,
    pub coordinator: Arc<RegisterCreationCoordinator>,
    pub metrics: SharedMetrics,
    /// The node's reported version string.
    pub version: String,
    /// When this node process started.
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/registers", post(initiate_register_handler))
        .route("/registers/:id", get(register_summary_handler))
        .route("/registers/:id/finalize", post(finalize_register_handler))
        .route("/registers/:id/transactions", post(submit_transaction_handler))
        .route("/registers/:id/dockets", post(build_docket_handler))
        .route("/registers/:id/mempool", get(mempool_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Request body for `POST /registers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owners: Vec<RegisterOwner>,
}

/// Request body for `POST /registers/:id/finalize`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub nonce: String,
    pub attestations: Vec<SignedAttestation>,
}

/// In-band rejection body for submit (HTTP 200).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionResponse {
    pub is_valid: bool,
    pub added: bool,
    pub reason: String,
}

/// Response payload for `GET /registers/:id`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSummary {
    #[serde(flatten)]
    pub register: Register,
    pub docket_number: u64,
    pub docket_hash: String,
    pub pending_transactions: usize,
}

/// Response payload for `GET /registers/:id/mempool`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MempoolResponse {
    pub register_id: String,
    pub pending: Vec<String>,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub registers: usize,
    pub active_registers: usize,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
}

/// Generic error body returned with non-200 statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` -- liveness probe for orchestrators. Intentionally does
/// not check collaborator health; that belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /status` -- node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        registers: state.directory.len(),
        active_registers: state.directory.active_register_ids().len(),
        started_at: state.started_at,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// `POST /registers` -- phase one of register creation.
async fn initiate_register_handler(
    State(state): State<AppState>,
    Json(req): Json<InitiateRequest>,
) -> Response {
    match state
        .coordinator
        .initiate(&req.name, &req.description, req.owners)
    {
        Ok(outcome) => {
            state.metrics.registers_known.set(state.directory.len() as i64);
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// `POST /registers/:id/finalize` -- phase three of register creation.
async fn finalize_register_handler(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> Response {
    match state
        .coordinator
        .finalize(&register_id, &req.nonce, &req.attestations)
        .await
    {
        Ok(register) => {
            state.metrics.registers_activated_total.inc();
            (StatusCode::OK, Json(register)).into_response()
        }
        Err(e @ CreationError::UnknownRegister(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e @ CreationError::NonceConsumed(_)) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// `POST /registers/:id/transactions` -- transaction submission.
async fn submit_transaction_handler(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
    Json(tx): Json<Transaction>,
) -> Response {
    if tx.register_id != register_id {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "transaction register id does not match the path",
        );
    }

    match state.intake.submit(tx) {
        Ok(receipt) => {
            state.metrics.transactions_submitted_total.inc();
            if let Some(entry) = state.directory.get(&register_id) {
                state
                    .metrics
                    .transactions_pending
                    .set(entry.mempool.len() as i64);
            }
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(e) => {
            state.metrics.transactions_rejected_total.inc();
            match e {
                IntakeError::Forbidden => error_response(StatusCode::FORBIDDEN, e.to_string()),
                IntakeError::CapacityExceeded => {
                    error_response(StatusCode::TOO_MANY_REQUESTS, e.to_string())
                }
                IntakeError::UnknownRegister(_) => {
                    error_response(StatusCode::NOT_FOUND, e.to_string())
                }
                IntakeError::RegisterNotActive(_) => {
                    error_response(StatusCode::CONFLICT, e.to_string())
                }
                // Validation verdicts ride back in-band: the request was
                // fine, the transaction was not.
                other => (
                    StatusCode::OK,
                    Json(RejectionResponse {
                        is_valid: false,
                        added: false,
                        reason: other.to_string(),
                    }),
                )
                    .into_response(),
            }
        }
    }
}

/// `POST /registers/:id/dockets` -- on-demand build trigger.
async fn build_docket_handler(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
) -> Response {
    match state.pipeline.build_docket(&register_id).await {
        Ok(BuildOutcome::NoPendingTransactions) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "no pending transactions" })),
        )
            .into_response(),
        Ok(BuildOutcome::Committed(committed)) => {
            state.metrics.dockets_committed_total.inc();
            if let Some(entry) = state.directory.get(&register_id) {
                state
                    .metrics
                    .transactions_pending
                    .set(entry.mempool.len() as i64);
            }
            (StatusCode::OK, Json(committed)).into_response()
        }
        Err(e) => {
            let status = match &e {
                PipelineError::UnknownRegister(_) => StatusCode::NOT_FOUND,
                PipelineError::RegisterNotActive(_) | PipelineError::BuildInProgress => {
                    StatusCode::CONFLICT
                }
                PipelineError::NoActiveValidators
                | PipelineError::Signing(_)
                | PipelineError::Write(_) => {
                    state.metrics.docket_failures_total.inc();
                    StatusCode::BAD_GATEWAY
                }
                PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, e.to_string())
        }
    }
}

/// `GET /registers/:id` -- register record plus chain tip.
async fn register_summary_handler(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
) -> Response {
    let Some(entry) = state.directory.get(&register_id) else {
        return error_response(StatusCode::NOT_FOUND, format!("register {register_id} does not exist"));
    };

    let tip = entry.chain.lock().await.clone();
    (
        StatusCode::OK,
        Json(RegisterSummary {
            register: entry.snapshot(),
            docket_number: tip.docket_number,
            docket_hash: tip.docket_hash,
            pending_transactions: entry.mempool.len(),
        }),
    )
        .into_response()
}

/// `GET /registers/:id/mempool` -- pending ids in docket order.
async fn mempool_handler(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
) -> Response {
    let Some(entry) = state.directory.get(&register_id) else {
        return error_response(StatusCode::NOT_FOUND, format!("register {register_id} does not exist"));
    };

    let pending = entry
        .mempool
        .peek(entry.mempool.capacity())
        .into_iter()
        .map(|tx| tx.transaction_id)
        .collect();

    (
        StatusCode::OK,
        Json(MempoolResponse {
            register_id,
            pending,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
