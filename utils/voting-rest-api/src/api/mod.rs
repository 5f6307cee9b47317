pub mod models;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;
use voting_ledger_bridge::{BridgeError, CandidateRecord, LedgerClient};

use self::models::{
    DeploymentResponse, ErrorResponse, TransactionStatusResponse, TxHashParam, VoteBody,
    VoteResponse,
};
use crate::AppState;

const VOTE_RECORDED: &str = "Voto registrado exitosamente";

pub fn router<L: LedgerClient>(app_state: AppState<L>) -> Router {
    Router::new()
        .route("/candidatos", get(list_candidates::<L>))
        .route("/votar", post(vote::<L>))
        .route("/transacciones/:tx_hash", get(transaction_status::<L>))
        .route("/despliegue", get(deployment::<L>))
        .with_state(app_state)
}

/// A [`BridgeError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BridgeError::NotDeployed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Signing(_) | BridgeError::Revert(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BridgeError::Call { .. }
            | BridgeError::Submission(_)
            | BridgeError::Connection(_) => StatusCode::BAD_GATEWAY,
            BridgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BridgeError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BridgeError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(category = self.0.category(), error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

async fn list_candidates<L: LedgerClient>(
    State(state): State<AppState<L>>,
) -> Result<Json<Vec<CandidateRecord>>, ApiError> {
    let listing = state.bridge.list_candidates().await?;
    state.metrics.record_listing(listing.strategy);
    Ok(Json(listing.candidates))
}

async fn vote<L: LedgerClient>(
    State(state): State<AppState<L>>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<VoteResponse>, ApiError> {
    let fallback = if state.http.use_default_credential {
        state.bridge.deployment().default_credential.clone()
    } else {
        None
    };

    let result = match body {
        Ok(Json(body)) => match body.into_request(fallback) {
            Ok(request) => state.bridge.submit_vote(&request).await,
            Err(err) => Err(err),
        },
        Err(rejection) => Err(ApiError::from(rejection).0),
    };
    state.metrics.record_vote(result.as_ref().map(|_| ()));

    let receipt = result?;
    Ok(Json(VoteResponse {
        message: VOTE_RECORDED,
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
    }))
}

async fn transaction_status<L: LedgerClient>(
    State(state): State<AppState<L>>,
    tx_hash: Result<Path<TxHashParam>, PathRejection>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let Path(TxHashParam(tx_hash)) = tx_hash?;
    let status = state.bridge.transaction_status(tx_hash).await?;
    Ok(Json(status.into()))
}

async fn deployment<L: LedgerClient>(State(state): State<AppState<L>>) -> Json<DeploymentResponse> {
    let deployment = state.bridge.deployment();
    Json(DeploymentResponse {
        contract_address: deployment.contract_address,
        forwarder_address: deployment.forwarder_address,
    })
}
