mod block;
mod construction;
mod error;
mod network;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use pchain_core::rosetta::NetworkIdentifier;
use pchain_core::Backend;

use error::AppError;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub backend: Arc<Backend>,
}

type SharedState = Arc<AppState>;

impl AppState {
    /// The backend, if it serves `network`.
    fn backend_for(&self, network: &NetworkIdentifier) -> Result<&Backend, AppError> {
        if self.backend.should_handle(network) {
            Ok(&self.backend)
        } else {
            tracing::debug!(network = %network.network, "declined request for foreign network");
            Err(AppError::UnsupportedNetwork)
        }
    }
}

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let shared = Arc::new(state);

    let data_api = Router::new()
        .route("/network/list", post(network::list))
        .route("/network/options", post(network::options))
        .route("/network/status", post(network::status))
        .route("/block", post(block::block))
        .route("/block/transaction", post(block::block_transaction));

    let construction_api = Router::new()
        .route("/construction/derive", post(construction::derive))
        .route("/construction/preprocess", post(construction::preprocess))
        .route("/construction/metadata", post(construction::metadata))
        .route("/construction/payloads", post(construction::payloads))
        .route("/construction/parse", post(construction::parse))
        .route("/construction/combine", post(construction::combine))
        .route("/construction/hash", post(construction::hash))
        .route("/construction/submit", post(construction::submit));

    Router::new()
        .merge(data_api)
        .merge(construction_api)
        .fallback(route_not_found)
        .layer(cors)
        .with_state(shared)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("route not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pchain_core::block::StatelessBlock;
    use pchain_core::error::RpcError;
    use pchain_core::genesis::GenesisState;
    use pchain_core::rpc::{Container, TxFees, UtxoCursor, UtxoPage};
    use pchain_core::{BackendConfig, CoreError, Id, PChainRpc, StaticGenesisSource};
    use tower::ServiceExt;

    const NETWORK_ID: u32 = 5;
    const GENESIS_TIME: u64 = 1_600_000_000;

    #[derive(Clone, Copy, PartialEq)]
    enum FakeRpcMode {
        Ok,
        RpcFailure,
    }

    struct FakeRpc {
        mode: FakeRpcMode,
    }

    fn genesis_bytes() -> Vec<u8> {
        GenesisState {
            utxos: vec![],
            validators: vec![],
            chains: vec![],
            timestamp: GENESIS_TIME,
            initial_supply: 0,
            message: "test".to_string(),
        }
        .to_bytes()
    }

    fn genesis_id() -> Id {
        Id::new([0x77; 32])
    }

    fn block_one() -> Vec<u8> {
        StatelessBlock::BanffCommit {
            time: GENESIS_TIME + 10,
            parent_id: genesis_id(),
            height: 1,
        }
        .to_bytes()
    }

    #[async_trait]
    impl PChainRpc for FakeRpc {
        async fn get_container_by_index(&self, index: u64) -> Result<Container, CoreError> {
            if index != 0 {
                return Err(CoreError::BlockNotFound(index.to_string()));
            }
            Ok(Container {
                id: Id::from_content(&block_one()),
                bytes: block_one(),
                index,
            })
        }

        async fn get_container_by_id(&self, id: &Id) -> Result<Container, CoreError> {
            Err(CoreError::BlockNotFound(id.to_string()))
        }

        async fn get_height(&self) -> Result<u64, CoreError> {
            match self.mode {
                FakeRpcMode::Ok => Ok(1),
                FakeRpcMode::RpcFailure => Err(CoreError::Rpc(RpcError::ServerError {
                    code: -32000,
                    message: "node is bootstrapping".to_string(),
                })),
            }
        }

        async fn get_network_id(&self) -> Result<u32, CoreError> {
            Ok(NETWORK_ID)
        }

        async fn get_blockchain_id(&self, alias: &str) -> Result<Id, CoreError> {
            match alias {
                "C" => Ok(Id::new([0xCC; 32])),
                "X" => Ok(Id::new([0xDD; 32])),
                other => Err(CoreError::InvalidId(other.to_string())),
            }
        }

        async fn get_tx(&self, tx_id: &Id) -> Result<Vec<u8>, CoreError> {
            Err(CoreError::TxNotFound(*tx_id))
        }

        async fn get_utxos(
            &self,
            _addresses: &[String],
            _source_chain: Option<&str>,
            _limit: u32,
            _start: Option<&UtxoCursor>,
        ) -> Result<UtxoPage, CoreError> {
            Ok(UtxoPage {
                utxos: vec![],
                end_index: UtxoCursor::default(),
                num_fetched: 0,
            })
        }

        async fn get_tx_fees(&self) -> Result<TxFees, CoreError> {
            Ok(TxFees {
                tx_fee: 1_000_000,
                ..TxFees::default()
            })
        }

        async fn issue_tx(&self, tx: &[u8]) -> Result<Id, CoreError> {
            Ok(Id::from_content(tx))
        }
    }

    async fn test_router(mode: FakeRpcMode) -> Router {
        let source = StaticGenesisSource::new().with_network(NETWORK_ID, genesis_bytes());
        let backend = Backend::initialize(
            Arc::new(FakeRpc { mode }),
            &source,
            BackendConfig::new("Fuji", Id::new([0x21; 32])),
        )
        .await
        .map_err(|err| err.to_string())
        .expect("backend must initialize");
        build_router(AppState {
            backend: Arc::new(backend),
        })
    }

    fn fuji_p() -> serde_json::Value {
        serde_json::json!({
            "blockchain": "Avalanche",
            "network": "Fuji",
            "sub_network_identifier": { "network": "P" }
        })
    }

    async fn post_json(
        router: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request must build"),
            )
            .await
            .expect("router should serve request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("response body must be readable");
        let json = serde_json::from_slice(&bytes).expect("response body must be valid JSON");
        (status, json)
    }

    #[tokio::test]
    async fn network_list_returns_p_chain() {
        let (status, json) =
            post_json(test_router(FakeRpcMode::Ok).await, "/network/list", serde_json::json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["network_identifiers"][0], fuji_p());
    }

    #[tokio::test]
    async fn network_status_reports_genesis_and_tip() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/network/status",
            serde_json::json!({ "network_identifier": fuji_p() }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["current_block_identifier"]["index"], 1);
        assert_eq!(
            json["genesis_block_identifier"]["hash"],
            genesis_id().to_string()
        );
        assert_eq!(
            json["current_block_timestamp"],
            (GENESIS_TIME + 10) * 1000
        );
    }

    #[tokio::test]
    async fn foreign_network_is_rejected() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/network/status",
            serde_json::json!({
                "network_identifier": {
                    "blockchain": "Avalanche",
                    "network": "Fuji",
                    "sub_network_identifier": { "network": "C" }
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 1);
        assert_eq!(json["retriable"], false);
    }

    #[tokio::test]
    async fn node_failure_is_retriable() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::RpcFailure).await,
            "/network/status",
            serde_json::json!({ "network_identifier": fuji_p() }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 4);
        assert_eq!(json["retriable"], true);
        assert!(json["details"]["error"]
            .as_str()
            .is_some_and(|detail| detail.contains("bootstrapping")));
    }

    #[tokio::test]
    async fn genesis_block_by_index() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/block",
            serde_json::json!({
                "network_identifier": fuji_p(),
                "block_identifier": { "index": 0 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["block"]["block_identifier"]["hash"], genesis_id().to_string());
        assert_eq!(
            json["block"]["parent_block_identifier"]["hash"],
            Id::from_content(&genesis_bytes()).to_string()
        );
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/block",
            serde_json::json!({
                "network_identifier": fuji_p(),
                "block_identifier": { "index": 7 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 3);
    }

    #[tokio::test]
    async fn derive_returns_p_chain_address() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/construction/derive",
            serde_json::json!({
                "network_identifier": fuji_p(),
                "public_key": {
                    "hex_bytes": "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
                    "curve_type": "secp256k1"
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["account_identifier"]["address"]
            .as_str()
            .is_some_and(|address| address.starts_with("P-fuji1")));
    }

    #[tokio::test]
    async fn malformed_envelope_is_a_construction_error() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/construction/hash",
            serde_json::json!({
                "network_identifier": fuji_p(),
                "signed_transaction": "not an envelope"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 5);
    }

    #[tokio::test]
    async fn options_lists_operation_types_and_errors() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/network/options",
            serde_json::json!({ "network_identifier": fuji_p() }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let types = json["allow"]["operation_types"]
            .as_array()
            .expect("operation types must be an array");
        assert!(types.contains(&serde_json::json!("IMPORT_AVAX")));
        assert!(types.contains(&serde_json::json!("GENESIS")));
        assert_eq!(
            json["allow"]["errors"].as_array().map(Vec::len),
            Some(6)
        );
    }

    #[tokio::test]
    async fn unknown_route_is_rosetta_error() {
        let (status, json) = post_json(
            test_router(FakeRpcMode::Ok).await,
            "/account/balance",
            serde_json::json!({}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 3);
    }
}
