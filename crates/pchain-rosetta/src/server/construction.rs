use axum::extract::State;
use axum::Json;

use pchain_core::rosetta::{
    ConstructionCombineRequest, ConstructionCombineResponse, ConstructionDeriveRequest,
    ConstructionDeriveResponse, ConstructionHashRequest, ConstructionMetadataRequest,
    ConstructionMetadataResponse, ConstructionParseRequest, ConstructionParseResponse,
    ConstructionPayloadsRequest, ConstructionPayloadsResponse, ConstructionPreprocessRequest,
    ConstructionPreprocessResponse, ConstructionSubmitRequest, TransactionIdentifierResponse,
};

use super::error::AppError;
use super::SharedState;

// ==============================================================================
// Offline Stages
// ==============================================================================

pub(super) async fn derive(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionDeriveRequest>,
) -> Result<Json<ConstructionDeriveResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_derive(&request)?))
}

pub(super) async fn preprocess(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionPreprocessRequest>,
) -> Result<Json<ConstructionPreprocessResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_preprocess(&request)?))
}

pub(super) async fn payloads(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionPayloadsRequest>,
) -> Result<Json<ConstructionPayloadsResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_payloads(&request)?))
}

pub(super) async fn parse(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionParseRequest>,
) -> Result<Json<ConstructionParseResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_parse(&request)?))
}

pub(super) async fn combine(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionCombineRequest>,
) -> Result<Json<ConstructionCombineResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_combine(&request)?))
}

pub(super) async fn hash(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionHashRequest>,
) -> Result<Json<TransactionIdentifierResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_hash(&request)?))
}

// ==============================================================================
// Online Stages
// ==============================================================================

pub(super) async fn metadata(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionMetadataRequest>,
) -> Result<Json<ConstructionMetadataResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.construction_metadata(&request).await?))
}

pub(super) async fn submit(
    State(state): State<SharedState>,
    Json(request): Json<ConstructionSubmitRequest>,
) -> Result<Json<TransactionIdentifierResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    tracing::info!("submitting signed transaction");
    Ok(Json(backend.construction_submit(&request).await?))
}
