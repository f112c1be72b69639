use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pchain_core::CoreError;

// ==============================================================================
// Error Type
// ==============================================================================

/// Rosetta error object. Every failure is answered with HTTP 500 and this
/// body, as Rosetta clients expect.
#[derive(Debug, Serialize)]
pub(crate) struct RosettaError {
    pub code: u32,
    pub message: &'static str,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub(crate) enum AppError {
    UnsupportedNetwork,
    InvalidRequest(String),
    NotFound(String),
    Unavailable(String),
    Construction(String),
    Internal(String),
}

impl AppError {
    /// All errors this server can return, for `/network/options`.
    pub(crate) fn catalog() -> Vec<RosettaError> {
        [
            Self::UnsupportedNetwork,
            Self::InvalidRequest(String::new()),
            Self::NotFound(String::new()),
            Self::Unavailable(String::new()),
            Self::Construction(String::new()),
            Self::Internal(String::new()),
        ]
        .into_iter()
        .map(|err| err.into_rosetta().0)
        .collect()
    }

    fn into_rosetta(self) -> (RosettaError, Option<String>) {
        let (code, message, retriable, detail) = match self {
            Self::UnsupportedNetwork => (1, "network is not supported", false, None),
            Self::InvalidRequest(msg) => (2, "invalid request", false, Some(msg)),
            Self::NotFound(msg) => (3, "not found", false, Some(msg)),
            Self::Unavailable(msg) => (4, "node is unavailable", true, Some(msg)),
            Self::Construction(msg) => (5, "construction failed", false, Some(msg)),
            Self::Internal(msg) => (6, "internal error", false, Some(msg)),
        };
        (
            RosettaError {
                code,
                message,
                retriable,
                details: None,
            },
            detail,
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (mut body, detail) = self.into_rosetta();
        body.details = detail
            .filter(|detail| !detail.is_empty())
            .map(|detail| serde_json::json!({ "error": detail }));

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Rpc(_) => Self::Unavailable(err.to_string()),
            CoreError::Decode(_) | CoreError::Encode(_) | CoreError::InvalidId(_) => {
                Self::InvalidRequest(err.to_string())
            }
            CoreError::BlockNotFound(_)
            | CoreError::TxNotFound(_)
            | CoreError::TxNotInBlock { .. }
            | CoreError::GenesisNotIndexed => Self::NotFound(err.to_string()),
            CoreError::Construction(_) => Self::Construction(err.to_string()),
            CoreError::Config(_)
            | CoreError::MissingGenesis(_)
            | CoreError::Init { .. }
            | CoreError::Io(_) => {
                tracing::error!(%err, "unexpected backend error");
                Self::Internal(err.to_string())
            }
        }
    }
}
