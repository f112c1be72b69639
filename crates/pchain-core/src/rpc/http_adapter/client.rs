use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::future::try_join_all;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header;
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};
use crate::ids::{encode_hex_checksummed, Id};

use super::super::types::{Container, TxFees, UtxoCursor, UtxoPage};
use super::super::PChainRpc;
use super::connection::NodeEndpoints;
use super::parsing::{
    parse_container, parse_hex_payload, parse_id, parse_tx_fees, parse_u64, parse_utxo_page,
};
use super::protocol::{JsonRpcRequest, JsonRpcResponse};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// avalanchego JSON-RPC client over HTTP(S).
///
/// Node calls (`info.*`, `platform.*`) go to `rpc_url`; block index lookups
/// go to `indexer_url`, which may point at the same node.
pub struct HttpPChainClient {
    client: reqwest::Client,
    info_url: String,
    platform_url: String,
    index_url: String,
    limiter: Option<DirectRateLimiter>,
    next_id: AtomicU64,
}

impl HttpPChainClient {
    /// If `requests_per_second` is set, every outbound HTTP request waits
    /// for the limiter first.
    pub fn new(
        rpc_url: &str,
        indexer_url: &str,
        requests_per_second: Option<u32>,
    ) -> Result<Self, CoreError> {
        let node = NodeEndpoints::from_base(rpc_url)?;
        let indexer = NodeEndpoints::from_base(indexer_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .map_err(RpcError::Transport)?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            info_url: node.info,
            platform_url: node.platform,
            index_url: indexer.block_index,
            limiter,
            next_id: AtomicU64::new(initial_request_id()),
        })
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn rpc_call(
        &self,
        url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, CoreError> {
        self.wait_for_rate_limit().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(rpc.id = id, rpc.method = method, "rpc call");
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(RpcError::Transport)?;
        let status = response.status();

        let body = response.text().await.map_err(RpcError::Transport)?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "rpc response body");

        JsonRpcResponse::decode(&body)?.into_result()
    }
}

#[async_trait]
impl PChainRpc for HttpPChainClient {
    async fn get_container_by_index(&self, index: u64) -> Result<Container, CoreError> {
        let raw = self
            .rpc_call(
                &self.index_url,
                "index.getContainerByIndex",
                serde_json::json!({ "index": index.to_string(), "encoding": "hex" }),
            )
            .await
            .map_err(|err| normalize_not_found(err, || CoreError::BlockNotFound(index.to_string())))?;
        parse_container(&raw)
    }

    async fn get_container_by_id(&self, id: &Id) -> Result<Container, CoreError> {
        let raw = self
            .rpc_call(
                &self.index_url,
                "index.getContainerByID",
                serde_json::json!({ "id": id.to_string(), "encoding": "hex" }),
            )
            .await
            .map_err(|err| normalize_not_found(err, || CoreError::BlockNotFound(id.to_string())))?;
        parse_container(&raw)
    }

    async fn get_height(&self) -> Result<u64, CoreError> {
        let raw = self
            .rpc_call(&self.platform_url, "platform.getHeight", serde_json::json!({}))
            .await?;
        parse_u64(raw.get("height"), "height")
    }

    async fn get_network_id(&self) -> Result<u32, CoreError> {
        let raw = self
            .rpc_call(&self.info_url, "info.getNetworkID", serde_json::json!({}))
            .await?;
        let network_id = parse_u64(raw.get("networkID"), "networkID")?;
        u32::try_from(network_id).map_err(|_| {
            CoreError::Rpc(RpcError::InvalidResponse(format!(
                "networkID out of range: {network_id}"
            )))
        })
    }

    async fn get_blockchain_id(&self, alias: &str) -> Result<Id, CoreError> {
        let raw = self
            .rpc_call(
                &self.info_url,
                "info.getBlockchainID",
                serde_json::json!({ "alias": alias }),
            )
            .await?;
        parse_id(raw.get("blockchainID"), "blockchainID")
    }

    async fn get_tx(&self, tx_id: &Id) -> Result<Vec<u8>, CoreError> {
        let raw = self
            .rpc_call(
                &self.platform_url,
                "platform.getTx",
                serde_json::json!({ "txID": tx_id.to_string(), "encoding": "hex" }),
            )
            .await
            .map_err(|err| normalize_not_found(err, || CoreError::TxNotFound(*tx_id)))?;
        parse_hex_payload(raw.get("tx"), "tx")
    }

    async fn get_txs(&self, tx_ids: &[Id]) -> Result<Vec<Vec<u8>>, CoreError> {
        // No batch support on the platform API; the limiter still paces these.
        let calls: Vec<_> = tx_ids.iter().map(|tx_id| self.get_tx(tx_id)).collect();
        try_join_all(calls).await
    }

    async fn get_utxos(
        &self,
        addresses: &[String],
        source_chain: Option<&str>,
        limit: u32,
        start: Option<&UtxoCursor>,
    ) -> Result<UtxoPage, CoreError> {
        let mut params = serde_json::json!({
            "addresses": addresses,
            "limit": limit,
            "encoding": "hex",
        });
        if let Some(source_chain) = source_chain {
            params["sourceChain"] = serde_json::json!(source_chain);
        }
        if let Some(start) = start {
            params["startIndex"] = serde_json::json!(start);
        }
        let raw = self
            .rpc_call(&self.platform_url, "platform.getUTXOs", params)
            .await?;
        parse_utxo_page(&raw)
    }

    async fn get_tx_fees(&self) -> Result<TxFees, CoreError> {
        let raw = self
            .rpc_call(&self.info_url, "info.getTxFee", serde_json::json!({}))
            .await?;
        parse_tx_fees(&raw)
    }

    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, CoreError> {
        let raw = self
            .rpc_call(
                &self.platform_url,
                "platform.issueTx",
                serde_json::json!({ "tx": encode_hex_checksummed(tx), "encoding": "hex" }),
            )
            .await?;
        parse_id(raw.get("txID"), "txID")
    }
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

// ==============================================================================
// RPC Error Normalization
// ==============================================================================

/// Convert "missing item" server errors into a typed not-found error so the
/// HTTP layer can tell them apart from node failures.
fn normalize_not_found(err: CoreError, not_found: impl FnOnce() -> CoreError) -> CoreError {
    match err {
        CoreError::Rpc(RpcError::ServerError { ref message, .. }) if is_not_found_message(message) => {
            not_found()
        }
        other => other,
    }
}

fn is_not_found_message(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("not found") || msg.contains("no container")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_server_error_maps_to_typed_error() {
        let tx_id = Id::new([1; 32]);
        let err = CoreError::Rpc(RpcError::ServerError {
            code: -32000,
            message: "couldn't get tx: not found".to_string(),
        });

        let mapped = normalize_not_found(err, || CoreError::TxNotFound(tx_id));
        assert!(matches!(mapped, CoreError::TxNotFound(found) if found == tx_id));
    }

    #[test]
    fn missing_container_maps_to_block_not_found() {
        let err = CoreError::Rpc(RpcError::ServerError {
            code: -32000,
            message: "no container with index 99".to_string(),
        });

        let mapped = normalize_not_found(err, || CoreError::BlockNotFound("99".to_owned()));
        assert!(matches!(mapped, CoreError::BlockNotFound(ref id) if id == "99"));
    }

    #[test]
    fn other_server_error_preserved() {
        let err = CoreError::Rpc(RpcError::ServerError {
            code: -32603,
            message: "Internal error".to_string(),
        });

        let mapped = normalize_not_found(err, || CoreError::TxNotFound(Id::EMPTY));
        assert!(matches!(
            mapped,
            CoreError::Rpc(RpcError::ServerError { code: -32603, .. })
        ));
    }

    #[test]
    fn non_rpc_error_preserved() {
        let err = CoreError::Config("bad".to_string());
        let mapped = normalize_not_found(err, || CoreError::TxNotFound(Id::EMPTY));
        assert!(matches!(mapped, CoreError::Config(message) if message == "bad"));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let err = HttpPChainClient::new("http://127.0.0.1:9650", "http://127.0.0.1:9650", Some(0))
            .err()
            .expect("zero requests per second must be rejected");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn endpoints_are_derived_from_bases() {
        let client = HttpPChainClient::new("http://node:9650/", "http://indexer:9650", None)
            .expect("client must build");
        assert_eq!(client.platform_url, "http://node:9650/ext/bc/P");
        assert_eq!(client.info_url, "http://node:9650/ext/info");
        assert_eq!(client.index_url, "http://indexer:9650/ext/index/P/block");
    }
}
