use axum::extract::State;
use axum::Json;
use serde::Serialize;

use pchain_core::mapper::GENESIS_OPERATION_TYPE;
use pchain_core::rosetta::{NetworkListResponse, NetworkRequest, NetworkStatusResponse, STATUS_SUCCESS};
use pchain_core::txs::OperationType;

use super::error::{AppError, RosettaError};
use super::SharedState;

const ROSETTA_VERSION: &str = "1.4.13";

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Serialize)]
pub(super) struct OperationStatus {
    status: &'static str,
    successful: bool,
}

#[derive(Serialize)]
pub(super) struct Version {
    rosetta_version: &'static str,
    node_version: &'static str,
    middleware_version: &'static str,
}

#[derive(Serialize)]
pub(super) struct Allow {
    operation_statuses: Vec<OperationStatus>,
    operation_types: Vec<&'static str>,
    errors: Vec<RosettaError>,
    historical_balance_lookup: bool,
}

#[derive(Serialize)]
pub(super) struct NetworkOptionsResponse {
    version: Version,
    allow: Allow,
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn list(State(state): State<SharedState>) -> Json<NetworkListResponse> {
    Json(state.backend.network_list())
}

pub(super) async fn options(
    State(state): State<SharedState>,
    Json(request): Json<NetworkRequest>,
) -> Result<Json<NetworkOptionsResponse>, AppError> {
    state.backend_for(&request.network_identifier)?;

    let mut operation_types: Vec<&'static str> =
        OperationType::ALL.iter().map(OperationType::as_str).collect();
    operation_types.push(GENESIS_OPERATION_TYPE);

    Ok(Json(NetworkOptionsResponse {
        version: Version {
            rosetta_version: ROSETTA_VERSION,
            node_version: "unknown",
            middleware_version: env!("CARGO_PKG_VERSION"),
        },
        allow: Allow {
            operation_statuses: vec![OperationStatus {
                status: STATUS_SUCCESS,
                successful: true,
            }],
            operation_types,
            errors: AppError::catalog(),
            historical_balance_lookup: false,
        },
    }))
}

pub(super) async fn status(
    State(state): State<SharedState>,
    Json(request): Json<NetworkRequest>,
) -> Result<Json<NetworkStatusResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.network_status().await?))
}
