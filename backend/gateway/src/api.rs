//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::commitment::CommitmentView;
use crate::db::{self, Sponsorship};
use crate::errors::{ContractError, ErrorKind, GatewayError, Rejection};
use crate::projector::{project, Projection};
use crate::signer::validate_address;
use crate::sponsor::{Sponsor, SponsorRequest};
use crate::vault::VaultClient;

#[derive(Clone)]
pub struct AppState {
    pub vault: VaultClient,
    pub sponsor: Arc<Sponsor>,
    pub pool: SqlitePool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sponsor", post(sponsor))
        .route("/commitments/:id", get(get_commitment))
        .route("/creators/:address/commitments", get(creator_commitments))
        .route("/validators/:address/commitments", get(validator_commitments))
        .route("/sponsorships/:address", get(sponsorships))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

#[derive(Serialize)]
pub struct CommitmentResponse {
    pub commitment: CommitmentView,
    pub projection: Projection,
}

#[derive(Serialize)]
pub struct CommitmentListResponse {
    pub address: String,
    pub count: usize,
    pub commitments: Vec<CommitmentResponse>,
}

#[derive(Serialize)]
pub struct SponsorshipsResponse {
    pub address: String,
    pub count: usize,
    pub sponsorships: Vec<Sponsorship>,
}

pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &GatewayError) -> StatusCode {
    if matches!(err, GatewayError::Contract(Rejection::Vault(ContractError::NotFound))) {
        return StatusCode::NOT_FOUND;
    }
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Funds => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Network => StatusCode::BAD_GATEWAY,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind: self.0.kind(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /sponsor`
///
/// Mints the faucet allocation to `userAddress` with the relay's key. Only
/// `action: "faucet"` is accepted.
pub async fn sponsor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SponsorRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return ApiError(GatewayError::Validation(rejection.body_text())).into_response()
        }
    };
    match state.sponsor.grant(&request).await {
        Ok(granted) => (StatusCode::OK, Json(granted)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// `GET /commitments/:id`
///
/// The record as stored on the ledger plus its projected status and timeline.
pub async fn get_commitment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<CommitmentResponse> {
    let commitment = state.vault.get(id).await?;
    let projection = project(&commitment, now());
    Ok(Json(CommitmentResponse {
        commitment,
        projection,
    }))
}

async fn list(vault: &VaultClient, address: String, ids: Vec<u64>) -> ApiResult<CommitmentListResponse> {
    let now = now();
    let mut commitments = Vec::with_capacity(ids.len());
    for id in ids {
        let commitment = vault.get(id).await?;
        let projection = project(&commitment, now);
        commitments.push(CommitmentResponse {
            commitment,
            projection,
        });
    }
    Ok(Json(CommitmentListResponse {
        address,
        count: commitments.len(),
        commitments,
    }))
}

/// `GET /creators/:address/commitments`
pub async fn creator_commitments(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<CommitmentListResponse> {
    let ids = state.vault.by_creator(&address).await?;
    list(&state.vault, address, ids).await
}

/// `GET /validators/:address/commitments`
pub async fn validator_commitments(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<CommitmentListResponse> {
    let ids = state.vault.by_validator(&address).await?;
    list(&state.vault, address, ids).await
}

/// `GET /sponsorships/:address`
pub async fn sponsorships(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<SponsorshipsResponse> {
    validate_address(&address)?;
    let sponsorships = db::sponsorships_for(&state.pool, &address).await?;
    Ok(Json(SponsorshipsResponse {
        address,
        count: sponsorships.len(),
        sponsorships,
    }))
}
