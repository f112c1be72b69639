use axum::extract::State;
use axum::Json;

use pchain_core::rosetta::{
    BlockRequest, BlockResponse, BlockTransactionRequest, BlockTransactionResponse,
};

use super::error::AppError;
use super::SharedState;

pub(super) async fn block(
    State(state): State<SharedState>,
    Json(request): Json<BlockRequest>,
) -> Result<Json<BlockResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    let block = backend.block(&request.block_identifier).await?;
    Ok(Json(BlockResponse { block }))
}

pub(super) async fn block_transaction(
    State(state): State<SharedState>,
    Json(request): Json<BlockTransactionRequest>,
) -> Result<Json<BlockTransactionResponse>, AppError> {
    let backend = state.backend_for(&request.network_identifier)?;
    Ok(Json(backend.block_transaction(&request).await?))
}
