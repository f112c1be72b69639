//! Genesis resolution.
//!
//! The indexer never stores the genesis block, so it is synthesized from the
//! platform genesis state: its parent id is the hash of the state bytes, its
//! own id is the parent id recorded by the block at height 1, and its
//! transactions are the genesis validators followed by the genesis chains.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::block::{BlockType, ParsedBlock, Proposer};
use crate::codec::{Decode, Encode, Packer, Unpacker};
use crate::error::{CoreError, DecodeError};
use crate::ids::{decode_hex_checksummed, Id};
use crate::indexer::BlockParser;
use crate::txs::components::{Utxo, UtxoId};
use crate::txs::Tx;

// ==============================================================================
// Genesis State
// ==============================================================================

/// A UTXO allocated at genesis, with its allocation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisUtxo {
    pub utxo: Utxo,
    pub message: Vec<u8>,
}

/// Platform genesis state as serialized in the network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisState {
    pub utxos: Vec<GenesisUtxo>,
    pub validators: Vec<Tx>,
    pub chains: Vec<Tx>,
    /// Unix seconds.
    pub timestamp: u64,
    pub initial_supply: u64,
    pub message: String,
}

impl GenesisState {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(bytes);
        u.version()?;
        let utxos = u.list_with("genesis utxos", 1, |u| {
            let utxo = Utxo::decode(u)?;
            let message = u.bytes("genesis utxo message")?.to_vec();
            Ok(GenesisUtxo { utxo, message })
        })?;
        let validators = u.list_with("genesis validators", 1, Tx::decode_embedded)?;
        let chains = u.list_with("genesis chains", 1, Tx::decode_embedded)?;
        let state = Self {
            utxos,
            validators,
            chains,
            timestamp: u.u64("genesis timestamp")?,
            initial_supply: u.u64("genesis initial supply")?,
            message: u.string("genesis message")?,
        };
        u.finish("genesis state")?;
        Ok(state)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_version();
        packer.count(self.utxos.len());
        for genesis_utxo in &self.utxos {
            genesis_utxo.utxo.encode(&mut packer);
            packer.bytes(&genesis_utxo.message);
        }
        packer.list(&self.validators);
        packer.list(&self.chains);
        packer.u64(self.timestamp);
        packer.u64(self.initial_supply);
        packer.string(&self.message);
        packer.into_bytes()
    }
}

// ==============================================================================
// Parsed Genesis Block
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisBlockData {
    pub message: String,
    pub initial_supply: u64,
    pub utxos: Vec<GenesisUtxo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGenesisBlock {
    pub block: ParsedBlock,
    pub data: GenesisBlockData,
}

impl ParsedGenesisBlock {
    /// Genesis allocation with the given id, if any.
    pub fn utxo(&self, utxo_id: &UtxoId) -> Option<&Utxo> {
        self.data
            .utxos
            .iter()
            .map(|genesis_utxo| &genesis_utxo.utxo)
            .find(|utxo| utxo.utxo_id == *utxo_id)
    }

    /// Genesis transaction with the given id, if any.
    pub fn transaction(&self, tx_id: &Id) -> Option<&Tx> {
        self.block.transactions.iter().find(|tx| tx.id() == *tx_id)
    }
}

// ==============================================================================
// Genesis Sources
// ==============================================================================

/// Supplies the platform genesis state bytes for a network.
#[async_trait]
pub trait GenesisSource: Send + Sync {
    async fn genesis_bytes(&self, network_id: u32) -> Result<Vec<u8>, CoreError>;
}

/// Genesis states held in memory, keyed by network id.
#[derive(Debug, Clone, Default)]
pub struct StaticGenesisSource {
    states: HashMap<u32, Vec<u8>>,
}

impl StaticGenesisSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network_id: u32, bytes: Vec<u8>) -> Self {
        self.states.insert(network_id, bytes);
        self
    }
}

#[async_trait]
impl GenesisSource for StaticGenesisSource {
    async fn genesis_bytes(&self, network_id: u32) -> Result<Vec<u8>, CoreError> {
        self.states
            .get(&network_id)
            .cloned()
            .ok_or(CoreError::MissingGenesis(network_id))
    }
}

/// Genesis state read from a file holding checksummed `0x` hex, as printed
/// by the node's genesis tooling.
#[derive(Debug, Clone)]
pub struct FileGenesisSource {
    path: PathBuf,
    network_id: Option<u32>,
}

impl FileGenesisSource {
    /// Serves the file for whichever network the node reports.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            network_id: None,
        }
    }

    /// Serves the file only for `network_id`.
    pub fn for_network(path: impl Into<PathBuf>, network_id: u32) -> Self {
        Self {
            path: path.into(),
            network_id: Some(network_id),
        }
    }
}

#[async_trait]
impl GenesisSource for FileGenesisSource {
    async fn genesis_bytes(&self, network_id: u32) -> Result<Vec<u8>, CoreError> {
        if self.network_id.is_some_and(|expected| expected != network_id) {
            return Err(CoreError::MissingGenesis(network_id));
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        decode_hex_checksummed(contents.trim())
    }
}

// ==============================================================================
// Resolution
// ==============================================================================

/// Builds the genesis pseudo-block for `network_id`.
///
/// Fetches block 1 to learn the genesis block id.
pub async fn resolve_genesis(
    parser: &BlockParser,
    source: &dyn GenesisSource,
    network_id: u32,
) -> Result<ParsedGenesisBlock, CoreError> {
    let bytes = source.genesis_bytes(network_id).await?;
    let state = GenesisState::from_bytes(&bytes)?;
    let first = parser.parse_block_at_height(1).await?;

    let GenesisState {
        utxos,
        validators,
        chains,
        timestamp,
        initial_supply,
        message,
    } = state;
    let mut transactions = validators;
    transactions.extend(chains);

    let timestamp = i64::try_from(timestamp).map_err(|_| {
        DecodeError::InvalidEncoding(format!("genesis timestamp out of range: {timestamp}"))
    })?;

    let block = ParsedBlock {
        height: 0,
        block_id: first.parent_id,
        container_id: first.parent_id,
        parent_id: Id::from_content(&bytes),
        block_type: BlockType::Genesis,
        timestamp_ms: timestamp.saturating_mul(1000),
        proposer: Proposer::default(),
        transactions,
    };
    info!(
        network_id,
        block_id = %block.block_id,
        txs = block.transactions.len(),
        utxos = utxos.len(),
        "resolved genesis block"
    );

    Ok(ParsedGenesisBlock {
        block,
        data: GenesisBlockData {
            message,
            initial_supply,
            utxos,
        },
    })
}
