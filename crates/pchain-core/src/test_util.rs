//! Shared test helpers for `pchain-core` unit tests.
//!
//! Builders for owners, inputs, outputs, transactions and proposer envelopes
//! so that tests across modules share a single source of truth for dummy
//! data construction. Single bytes stand in for ids where tests only need
//! them to be distinct.

use crate::codec::Packer;
use crate::ids::{Id, ShortId};
use crate::txs::components::{
    Credential, Input, OutputOwners, TransferInput, TransferableInput, TransferableOutput, UtxoId,
    SIGNATURE_LEN,
};
use crate::txs::{BaseTx, ImportTx, RewardValidatorTx, Tx, UnsignedTx};

pub const TEST_NETWORK_ID: u32 = 5;

// ==============================================================================
// Id Helpers
// ==============================================================================

/// Asset id the fixtures treat as AVAX.
pub fn avax_asset() -> Id {
    Id::new([0x21; 32])
}

/// Chain id the fixtures treat as the C-chain.
pub fn c_chain() -> Id {
    Id::new([0xCC; 32])
}

/// Chain id the fixtures treat as the X-chain.
pub fn x_chain() -> Id {
    Id::new([0xDD; 32])
}

pub fn short_id(b: u8) -> ShortId {
    ShortId::new([b; 20])
}

pub fn utxo(b: u8, output_index: u32) -> UtxoId {
    UtxoId::new(Id::new([b; 32]), output_index)
}

// ==============================================================================
// Owner, Input And Output Builders
// ==============================================================================

pub fn single_owner(b: u8) -> OutputOwners {
    OutputOwners::single(short_id(b))
}

pub fn multisig_owner(threshold: u32, bs: &[u8]) -> OutputOwners {
    OutputOwners {
        locktime: 0,
        threshold,
        addresses: bs.iter().map(|b| short_id(*b)).collect(),
    }
}

pub fn transfer_output(amount: u64, owners: OutputOwners) -> TransferableOutput {
    TransferableOutput::new(avax_asset(), amount, owners)
}

pub fn transfer_input(utxo_id: UtxoId, amount: u64, sig_indices: Vec<u32>) -> TransferableInput {
    TransferableInput {
        utxo_id,
        asset_id: avax_asset(),
        input: Input::Transfer(TransferInput {
            amount,
            sig_indices,
        }),
    }
}

// ==============================================================================
// Transaction Builders
// ==============================================================================

pub fn base_tx(outputs: Vec<TransferableOutput>, inputs: Vec<TransferableInput>) -> BaseTx {
    BaseTx {
        network_id: TEST_NETWORK_ID,
        blockchain_id: Id::EMPTY,
        outputs,
        inputs,
        memo: Vec::new(),
    }
}

/// Import from the fixture C-chain.
pub fn import_tx(
    outputs: Vec<TransferableOutput>,
    imported_inputs: Vec<TransferableInput>,
) -> ImportTx {
    ImportTx {
        base: base_tx(outputs, Vec::new()),
        source_chain: c_chain(),
        imported_inputs,
    }
}

pub fn reward_tx(b: u8) -> Tx {
    Tx::new(
        UnsignedTx::RewardValidator(RewardValidatorTx {
            tx_id: Id::new([b; 32]),
        }),
        Vec::new(),
    )
}

/// A one-in, one-out import signed with a dummy credential.
pub fn signed_import_tx(b: u8) -> Tx {
    let unsigned = import_tx(
        vec![transfer_output(u64::from(b) * 1_000, single_owner(b))],
        vec![transfer_input(utxo(b, 0), u64::from(b) * 1_000 + 1, vec![0])],
    );
    Tx::new(
        UnsignedTx::Import(unsigned),
        vec![Credential {
            signatures: vec![[b; SIGNATURE_LEN]],
        }],
    )
}

// ==============================================================================
// Proposer Envelopes
// ==============================================================================

pub fn signed_envelope(
    parent_id: Id,
    timestamp: i64,
    p_chain_height: u64,
    certificate: &[u8],
    inner: &[u8],
) -> Vec<u8> {
    let mut packer = Packer::with_version();
    packer.u32(0);
    packer.id(&parent_id);
    packer.i64(timestamp);
    packer.u64(p_chain_height);
    packer.bytes(certificate);
    packer.bytes(inner);
    packer.bytes(&[0xEE; 64]);
    packer.into_bytes()
}

pub fn option_envelope(parent_id: Id, inner: &[u8]) -> Vec<u8> {
    let mut packer = Packer::with_version();
    packer.u32(1);
    packer.id(&parent_id);
    packer.bytes(inner);
    packer.into_bytes()
}
