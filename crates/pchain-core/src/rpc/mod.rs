//! Node and indexer RPC abstraction.
//!
//! Defines the [`PChainRpc`] trait and provides an HTTP JSON-RPC
//! implementation ([`HttpPChainClient`]) plus a test mock (`mock::MockRpc`).

mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use http_adapter::HttpPChainClient;
pub use types::{Container, TxFees, UtxoCursor, UtxoPage};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::Id;

/// The node calls the adapter needs: the P-chain block index, the platform
/// API and the info API.
///
/// Implementations own transport, encoding and response decoding. None of
/// them retry.
#[async_trait]
pub trait PChainRpc: Send + Sync {
    /// Indexer container at `index`. Index 0 is the block at height 1.
    async fn get_container_by_index(&self, index: u64) -> Result<Container, CoreError>;

    async fn get_container_by_id(&self, id: &Id) -> Result<Container, CoreError>;

    /// Height of the last accepted block.
    async fn get_height(&self) -> Result<u64, CoreError>;

    async fn get_network_id(&self) -> Result<u32, CoreError>;

    /// Chain id for an alias such as `"C"` or `"X"`.
    async fn get_blockchain_id(&self, alias: &str) -> Result<Id, CoreError>;

    /// Signed bytes of an accepted transaction.
    async fn get_tx(&self, tx_id: &Id) -> Result<Vec<u8>, CoreError>;

    /// Fetch many transactions. Implementations may issue these concurrently.
    async fn get_txs(&self, tx_ids: &[Id]) -> Result<Vec<Vec<u8>>, CoreError> {
        let mut results = Vec::with_capacity(tx_ids.len());
        for tx_id in tx_ids {
            results.push(self.get_tx(tx_id).await?);
        }
        Ok(results)
    }

    /// One page of UTXOs owned by `addresses`. With `source_chain` set, lists
    /// atomic UTXOs exported from that chain instead.
    async fn get_utxos(
        &self,
        addresses: &[String],
        source_chain: Option<&str>,
        limit: u32,
        start: Option<&UtxoCursor>,
    ) -> Result<UtxoPage, CoreError>;

    async fn get_tx_fees(&self) -> Result<TxFees, CoreError>;

    /// Broadcast signed bytes, returning the transaction id the node computed.
    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, CoreError>;
}
