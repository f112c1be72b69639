use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::Id;

use super::types::{Container, TxFees, UtxoCursor, UtxoPage};
use super::PChainRpc;

/// A mock node for testing. Serves canned containers, transactions and UTXOs
/// populated via the builder pattern, and records the calls that matter to
/// the assertions.
pub struct MockRpc {
    containers: Vec<Container>,
    txs: HashMap<Id, Vec<u8>>,
    utxos: HashMap<(Option<String>, String), Vec<Vec<u8>>>,
    chain_ids: HashMap<String, Id>,
    network_id: u32,
    height: Option<u64>,
    fees: TxFees,
    issued_tx_id: Option<Id>,
    requested_indices: Mutex<Vec<u64>>,
    issued: Mutex<Vec<Vec<u8>>>,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        MockRpcBuilder {
            containers: Vec::new(),
            txs: HashMap::new(),
            utxos: HashMap::new(),
            chain_ids: HashMap::new(),
            network_id: 5,
            height: None,
            fees: TxFees {
                tx_fee: 1_000_000,
                ..TxFees::default()
            },
            issued_tx_id: None,
        }
    }

    /// Indexer positions requested so far, in call order.
    pub fn requested_indices(&self) -> Vec<u64> {
        self.requested_indices
            .lock()
            .expect("requested_indices lock must not be poisoned")
            .clone()
    }

    /// Bytes passed to `issue_tx`, in call order.
    pub fn issued(&self) -> Vec<Vec<u8>> {
        self.issued
            .lock()
            .expect("issued lock must not be poisoned")
            .clone()
    }
}

pub struct MockRpcBuilder {
    containers: Vec<Container>,
    txs: HashMap<Id, Vec<u8>>,
    utxos: HashMap<(Option<String>, String), Vec<Vec<u8>>>,
    chain_ids: HashMap<String, Id>,
    network_id: u32,
    height: Option<u64>,
    fees: TxFees,
    issued_tx_id: Option<Id>,
}

impl MockRpcBuilder {
    /// Appends a block to the index. The first block added sits at index 0,
    /// which is height 1.
    pub fn with_block(mut self, bytes: Vec<u8>) -> Self {
        let index = self.containers.len() as u64;
        self.containers.push(Container {
            id: Id::from_content(&bytes),
            bytes,
            index,
        });
        self
    }

    /// Adds a block whose container id differs from the content hash, as
    /// with proposer-wrapped blocks.
    pub fn with_container(mut self, id: Id, bytes: Vec<u8>) -> Self {
        let index = self.containers.len() as u64;
        self.containers.push(Container { id, bytes, index });
        self
    }

    pub fn with_tx(mut self, tx_id: Id, bytes: Vec<u8>) -> Self {
        self.txs.insert(tx_id, bytes);
        self
    }

    pub fn with_utxos(mut self, address: &str, utxos: Vec<Vec<u8>>) -> Self {
        self.utxos.insert((None, address.to_owned()), utxos);
        self
    }

    /// Atomic UTXOs exported to the P-chain from `source_chain`.
    pub fn with_atomic_utxos(mut self, source_chain: &str, address: &str, utxos: Vec<Vec<u8>>) -> Self {
        self.utxos
            .insert((Some(source_chain.to_owned()), address.to_owned()), utxos);
        self
    }

    pub fn with_chain_id(mut self, alias: &str, id: Id) -> Self {
        self.chain_ids.insert(alias.to_owned(), id);
        self
    }

    pub fn with_network_id(mut self, network_id: u32) -> Self {
        self.network_id = network_id;
        self
    }

    /// Overrides the reported height. Defaults to the number of blocks added.
    pub fn with_height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_fees(mut self, fees: TxFees) -> Self {
        self.fees = fees;
        self
    }

    /// Id returned by `issue_tx`. Defaults to the hash of the issued bytes.
    pub fn with_issued_tx_id(mut self, id: Id) -> Self {
        self.issued_tx_id = Some(id);
        self
    }

    pub fn build(self) -> MockRpc {
        MockRpc {
            containers: self.containers,
            txs: self.txs,
            utxos: self.utxos,
            chain_ids: self.chain_ids,
            network_id: self.network_id,
            height: self.height,
            fees: self.fees,
            issued_tx_id: self.issued_tx_id,
            requested_indices: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PChainRpc for MockRpc {
    async fn get_container_by_index(&self, index: u64) -> Result<Container, CoreError> {
        self.requested_indices
            .lock()
            .expect("requested_indices lock must not be poisoned")
            .push(index);
        self.containers
            .get(index as usize)
            .cloned()
            .ok_or_else(|| CoreError::BlockNotFound(index.to_string()))
    }

    async fn get_container_by_id(&self, id: &Id) -> Result<Container, CoreError> {
        self.containers
            .iter()
            .find(|container| container.id == *id)
            .cloned()
            .ok_or_else(|| CoreError::BlockNotFound(id.to_string()))
    }

    async fn get_height(&self) -> Result<u64, CoreError> {
        Ok(self.height.unwrap_or(self.containers.len() as u64))
    }

    async fn get_network_id(&self) -> Result<u32, CoreError> {
        Ok(self.network_id)
    }

    async fn get_blockchain_id(&self, alias: &str) -> Result<Id, CoreError> {
        self.chain_ids
            .get(alias)
            .copied()
            .ok_or_else(|| CoreError::InvalidId(format!("unknown chain alias {alias}")))
    }

    async fn get_tx(&self, tx_id: &Id) -> Result<Vec<u8>, CoreError> {
        self.txs
            .get(tx_id)
            .cloned()
            .ok_or(CoreError::TxNotFound(*tx_id))
    }

    async fn get_utxos(
        &self,
        addresses: &[String],
        source_chain: Option<&str>,
        limit: u32,
        start: Option<&UtxoCursor>,
    ) -> Result<UtxoPage, CoreError> {
        let all: Vec<Vec<u8>> = addresses
            .iter()
            .filter_map(|address| {
                self.utxos
                    .get(&(source_chain.map(str::to_owned), address.clone()))
            })
            .flatten()
            .cloned()
            .collect();

        // The cursor's `utxo` field carries the offset of the next item.
        let offset = start
            .and_then(|cursor| cursor.utxo.parse::<usize>().ok())
            .unwrap_or(0);
        let page: Vec<Vec<u8>> = all
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        let num_fetched = page.len() as u32;
        Ok(UtxoPage {
            utxos: page,
            end_index: UtxoCursor {
                address: addresses.last().cloned().unwrap_or_default(),
                utxo: (offset + num_fetched as usize).to_string(),
            },
            num_fetched,
        })
    }

    async fn get_tx_fees(&self) -> Result<TxFees, CoreError> {
        Ok(self.fees)
    }

    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, CoreError> {
        self.issued
            .lock()
            .expect("issued lock must not be poisoned")
            .push(tx.to_vec());
        Ok(self.issued_tx_id.unwrap_or_else(|| Id::from_content(tx)))
    }
}
