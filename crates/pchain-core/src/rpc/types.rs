//! Wire-level results of node calls.

use serde::{Deserialize, Serialize};

use crate::ids::Id;

/// A block as stored by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: Id,
    pub bytes: Vec<u8>,
    pub index: u64,
}

/// Resume position for UTXO paging.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UtxoCursor {
    pub address: String,
    pub utxo: String,
}

#[derive(Debug, Clone, Default)]
pub struct UtxoPage {
    /// Versioned UTXO bytes.
    pub utxos: Vec<Vec<u8>>,
    pub end_index: UtxoCursor,
    pub num_fetched: u32,
}

/// Fee schedule from `info.getTxFee`, in nAVAX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFees {
    pub tx_fee: u64,
    pub create_subnet_tx_fee: u64,
    pub create_blockchain_tx_fee: u64,
    pub add_primary_network_validator_fee: u64,
    pub add_primary_network_delegator_fee: u64,
}
