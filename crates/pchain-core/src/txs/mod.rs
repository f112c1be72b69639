//! P-chain transaction catalog.
//!
//! Every unsigned variant implements [`AvaxTx`], the capability view the
//! operation mapper and construction pipeline depend on. [`Tx`] pairs an
//! unsigned body with its credentials and caches the signed bytes and id.

pub mod components;
pub mod unsigned;

use serde::{Deserialize, Serialize};

use crate::codec::{Decode, Encode, Packer, Unpacker};
use crate::error::{DecodeError, EncodeError};
use crate::ids::{sha256, Id, NodeId};

use components::{Credential, OutputOwners, TransferableInput, TransferableOutput, Validator};
pub use unsigned::*;

// ==============================================================================
// Operation Types
// ==============================================================================

/// Rosetta operation type, one per transaction variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    #[serde(rename = "IMPORT_AVAX")]
    Import,
    #[serde(rename = "EXPORT_AVAX")]
    Export,
    AddValidator,
    AddDelegator,
    AddSubnetValidator,
    CreateChain,
    CreateSubnet,
    AdvanceTime,
    RewardValidator,
    RemoveSubnetValidator,
    TransformSubnet,
    AddPermissionlessValidator,
    AddPermissionlessDelegator,
}

impl OperationType {
    pub const ALL: [OperationType; 13] = [
        Self::Import,
        Self::Export,
        Self::AddValidator,
        Self::AddDelegator,
        Self::AddSubnetValidator,
        Self::CreateChain,
        Self::CreateSubnet,
        Self::AdvanceTime,
        Self::RewardValidator,
        Self::RemoveSubnetValidator,
        Self::TransformSubnet,
        Self::AddPermissionlessValidator,
        Self::AddPermissionlessDelegator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "IMPORT_AVAX",
            Self::Export => "EXPORT_AVAX",
            Self::AddValidator => "ADD_VALIDATOR",
            Self::AddDelegator => "ADD_DELEGATOR",
            Self::AddSubnetValidator => "ADD_SUBNET_VALIDATOR",
            Self::CreateChain => "CREATE_CHAIN",
            Self::CreateSubnet => "CREATE_SUBNET",
            Self::AdvanceTime => "ADVANCE_TIME",
            Self::RewardValidator => "REWARD_VALIDATOR",
            Self::RemoveSubnetValidator => "REMOVE_SUBNET_VALIDATOR",
            Self::TransformSubnet => "TRANSFORM_SUBNET",
            Self::AddPermissionlessValidator => "ADD_PERMISSIONLESS_VALIDATOR",
            Self::AddPermissionlessDelegator => "ADD_PERMISSIONLESS_DELEGATOR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == s)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// Capability Trait
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Spends a UTXO on this chain.
    Spend,
    /// Consumes an atomic UTXO exported from another chain.
    Import,
}

#[derive(Debug, Clone, Copy)]
pub struct InputRef<'a> {
    pub kind: InputKind,
    pub input: &'a TransferableInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// A UTXO created on this chain at `index`.
    Create { index: u32 },
    Export,
    Stake,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputRef<'a> {
    pub kind: OutputKind,
    pub output: &'a TransferableOutput,
}

/// Variant-specific fields surfaced as transaction metadata.
#[derive(Debug, Clone, Default)]
pub struct TxDetails<'a> {
    pub validator: Option<&'a Validator>,
    pub node_id: Option<NodeId>,
    pub subnet_id: Option<Id>,
    pub delegation_shares: Option<u32>,
    pub rewards_owner: Option<&'a OutputOwners>,
    pub source_chain: Option<Id>,
    pub destination_chain: Option<Id>,
    pub chain_name: Option<&'a str>,
    pub timestamp: Option<u64>,
    pub staking_tx_id: Option<Id>,
}

pub trait AvaxTx {
    fn op_type(&self) -> OperationType;

    fn base(&self) -> Option<&BaseTx> {
        None
    }

    fn imported_inputs(&self) -> &[TransferableInput] {
        &[]
    }

    fn exported_outputs(&self) -> &[TransferableOutput] {
        &[]
    }

    fn stake_outputs(&self) -> &[TransferableOutput] {
        &[]
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails::default()
    }

    /// Consumed inputs in credential order: base inputs, then imported ones.
    fn inputs(&self) -> Vec<InputRef<'_>> {
        let spends = self.base().map(|b| b.inputs.as_slice()).unwrap_or_default();
        spends
            .iter()
            .map(|input| InputRef {
                kind: InputKind::Spend,
                input,
            })
            .chain(self.imported_inputs().iter().map(|input| InputRef {
                kind: InputKind::Import,
                input,
            }))
            .collect()
    }

    /// Produced outputs: base outputs, then exported, then staked.
    fn outputs(&self) -> Vec<OutputRef<'_>> {
        let created = self.base().map(|b| b.outputs.as_slice()).unwrap_or_default();
        created
            .iter()
            .enumerate()
            .map(|(index, output)| OutputRef {
                kind: OutputKind::Create {
                    index: index as u32,
                },
                output,
            })
            .chain(self.exported_outputs().iter().map(|output| OutputRef {
                kind: OutputKind::Export,
                output,
            }))
            .chain(self.stake_outputs().iter().map(|output| OutputRef {
                kind: OutputKind::Stake,
                output,
            }))
            .collect()
    }

    /// Output spendable at `index` once the transaction is accepted.
    /// Stake outputs are indexed after the base outputs.
    fn produced_output(&self, index: u32) -> Option<&TransferableOutput> {
        let created = self.base().map(|b| b.outputs.as_slice()).unwrap_or_default();
        created
            .iter()
            .chain(self.stake_outputs())
            .nth(index as usize)
    }
}

// ==============================================================================
// Signed Transaction
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    pub unsigned: UnsignedTx,
    pub credentials: Vec<Credential>,
    id: Id,
    bytes: Vec<u8>,
    unsigned_len: usize,
}

impl Tx {
    pub fn new(unsigned: UnsignedTx, credentials: Vec<Credential>) -> Self {
        let (packer, unsigned_len) = Self::pack(&unsigned, &credentials);
        Self::assemble(unsigned, credentials, packer.into_bytes(), unsigned_len)
    }

    /// Like `new`, but fails when a list, memo or string is too long for its
    /// length prefix.
    pub fn try_new(unsigned: UnsignedTx, credentials: Vec<Credential>) -> Result<Self, EncodeError> {
        let (packer, unsigned_len) = Self::pack(&unsigned, &credentials);
        Ok(Self::assemble(unsigned, credentials, packer.finish()?, unsigned_len))
    }

    fn pack(unsigned: &UnsignedTx, credentials: &[Credential]) -> (Packer, usize) {
        let mut packer = Packer::with_version();
        unsigned.encode(&mut packer);
        let unsigned_len = packer.len();
        packer.list(credentials);
        (packer, unsigned_len)
    }

    fn assemble(unsigned: UnsignedTx, credentials: Vec<Credential>, bytes: Vec<u8>, unsigned_len: usize) -> Self {
        Self {
            unsigned,
            credentials,
            id: Id::from_content(&bytes),
            bytes,
            unsigned_len,
        }
    }

    /// Decodes versioned signed bytes, rejecting trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut unpacker = Unpacker::new(bytes);
        unpacker.version()?;
        let tx = Self::decode_embedded(&mut unpacker)?;
        unpacker.finish("transaction")?;
        Ok(tx)
    }

    /// Decodes a transaction nested inside a block or genesis state, where
    /// it carries no version prefix of its own.
    pub(crate) fn decode_embedded(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let start = unpacker.offset();
        let unsigned = UnsignedTx::decode(unpacker)?;
        let unsigned_body = unpacker.offset() - start;
        let credentials = unpacker.list::<Credential>("credentials")?;

        let raw = unpacker.consumed_since(start);
        let mut bytes = Vec::with_capacity(raw.len() + 2);
        bytes.extend_from_slice(&crate::codec::CODEC_VERSION.to_be_bytes());
        bytes.extend_from_slice(raw);

        Ok(Self {
            unsigned,
            credentials,
            id: Id::from_content(&bytes),
            bytes,
            unsigned_len: 2 + unsigned_body,
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Content hash of the signed bytes; identical to [`Tx::id`].
    pub fn hash(&self) -> Id {
        Id::from_content(&self.bytes)
    }

    /// Signed bytes, version prefix included.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn unsigned_bytes(&self) -> &[u8] {
        &self.bytes[..self.unsigned_len]
    }

    /// sha256 of the unsigned bytes, the message every credential signs.
    pub fn signing_payload(&self) -> [u8; 32] {
        sha256(self.unsigned_bytes())
    }

    pub fn as_avax(&self) -> &dyn AvaxTx {
        self.unsigned.as_avax()
    }
}

/// Embedded form: the signed bytes without their version prefix.
impl Encode for Tx {
    fn encode(&self, packer: &mut Packer) {
        packer.raw(&self.bytes[2..]);
    }
}

impl Decode for Tx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Self::decode_embedded(unpacker)
    }
}
