//! Building blocks shared by every transaction: owners, transferable
//! inputs and outputs, credentials, validators and signers.

use std::fmt;
use std::str::FromStr;

use crate::codec::{Decode, Encode, Packer, Unpacker};
use crate::error::{CoreError, DecodeError};
use crate::ids::{Id, NodeId, ShortId};

pub const TRANSFER_INPUT_TYPE_ID: u32 = 5;
pub const TRANSFER_OUTPUT_TYPE_ID: u32 = 7;
pub const CREDENTIAL_TYPE_ID: u32 = 9;
pub const SUBNET_AUTH_TYPE_ID: u32 = 10;
pub const OUTPUT_OWNERS_TYPE_ID: u32 = 11;
pub const LOCKED_INPUT_TYPE_ID: u32 = 21;
pub const LOCKED_OUTPUT_TYPE_ID: u32 = 22;
pub const EMPTY_SIGNER_TYPE_ID: u32 = 27;
pub const POP_SIGNER_TYPE_ID: u32 = 28;

pub const SIGNATURE_LEN: usize = 65;
pub const BLS_PUBLIC_KEY_LEN: usize = 48;
pub const BLS_SIGNATURE_LEN: usize = 96;

fn expect_type_id(
    unpacker: &mut Unpacker<'_>,
    what: &'static str,
    expected: u32,
) -> Result<(), DecodeError> {
    match unpacker.u32(what)? {
        id if id == expected => Ok(()),
        type_id => Err(DecodeError::UnknownTypeId { what, type_id }),
    }
}

// ==============================================================================
// UTXO Identity
// ==============================================================================

/// Reference to an output: creating transaction and output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }
}

/// Rendered as `<cb58 tx id>:<index>`, the coin identifier.
impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

impl FromStr for UtxoId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tx, index) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidId(format!("coin `{s}` is not `<tx id>:<index>`")))?;
        let output_index = index
            .parse()
            .map_err(|e| CoreError::InvalidId(format!("coin `{s}` has a bad index: {e}")))?;
        Ok(Self::new(tx.parse()?, output_index))
    }
}

impl Encode for UtxoId {
    fn encode(&self, packer: &mut Packer) {
        packer.id(&self.tx_id);
        packer.u32(self.output_index);
    }
}

impl Decode for UtxoId {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            tx_id: unpacker.id("utxo tx id")?,
            output_index: unpacker.u32("utxo output index")?,
        })
    }
}

// ==============================================================================
// Owners
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addresses: Vec<ShortId>,
}

impl OutputOwners {
    /// Single-address, threshold-one owner with no locktime.
    pub fn single(address: ShortId) -> Self {
        Self {
            locktime: 0,
            threshold: 1,
            addresses: vec![address],
        }
    }

    /// The sole owner, if there is exactly one address.
    pub fn sole_address(&self) -> Option<&ShortId> {
        match self.addresses.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl Encode for OutputOwners {
    fn encode(&self, packer: &mut Packer) {
        packer.u64(self.locktime);
        packer.u32(self.threshold);
        packer.count(self.addresses.len());
        for address in &self.addresses {
            packer.short_id(address);
        }
    }
}

impl Decode for OutputOwners {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            locktime: unpacker.u64("owners locktime")?,
            threshold: unpacker.u32("owners threshold")?,
            addresses: unpacker.list_with("owner addresses", 20, |u| u.short_id("owner address"))?,
        })
    }
}

/// `OutputOwners` behind its interface type id, as used for reward and
/// subnet owners.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Owner(pub OutputOwners);

impl Encode for Owner {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(OUTPUT_OWNERS_TYPE_ID);
        self.0.encode(packer);
    }
}

impl Decode for Owner {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        expect_type_id(unpacker, "owner", OUTPUT_OWNERS_TYPE_ID)?;
        Ok(Self(OutputOwners::decode(unpacker)?))
    }
}

// ==============================================================================
// Outputs
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl Encode for TransferOutput {
    fn encode(&self, packer: &mut Packer) {
        packer.u64(self.amount);
        self.owners.encode(packer);
    }
}

impl Decode for TransferOutput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            amount: unpacker.u64("output amount")?,
            owners: OutputOwners::decode(unpacker)?,
        })
    }
}

/// An output body: plain transfer, or a transfer wrapped in a stakeable lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Transfer(TransferOutput),
    Locked { locktime: u64, output: TransferOutput },
}

impl Output {
    pub fn transfer(&self) -> &TransferOutput {
        match self {
            Self::Transfer(out) | Self::Locked { output: out, .. } => out,
        }
    }

    pub fn amount(&self) -> u64 {
        self.transfer().amount
    }

    pub fn owners(&self) -> &OutputOwners {
        &self.transfer().owners
    }

    pub fn stake_locktime(&self) -> Option<u64> {
        match self {
            Self::Locked { locktime, .. } => Some(*locktime),
            Self::Transfer(_) => None,
        }
    }
}

impl Encode for Output {
    fn encode(&self, packer: &mut Packer) {
        match self {
            Self::Transfer(out) => {
                packer.u32(TRANSFER_OUTPUT_TYPE_ID);
                out.encode(packer);
            }
            Self::Locked { locktime, output } => {
                packer.u32(LOCKED_OUTPUT_TYPE_ID);
                packer.u64(*locktime);
                packer.u32(TRANSFER_OUTPUT_TYPE_ID);
                output.encode(packer);
            }
        }
    }
}

impl Decode for Output {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        match unpacker.u32("output type")? {
            TRANSFER_OUTPUT_TYPE_ID => Ok(Self::Transfer(TransferOutput::decode(unpacker)?)),
            LOCKED_OUTPUT_TYPE_ID => {
                let locktime = unpacker.u64("output stake locktime")?;
                expect_type_id(unpacker, "locked output", TRANSFER_OUTPUT_TYPE_ID)?;
                Ok(Self::Locked {
                    locktime,
                    output: TransferOutput::decode(unpacker)?,
                })
            }
            type_id => Err(DecodeError::UnknownTypeId {
                what: "output",
                type_id,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: Output,
}

impl TransferableOutput {
    pub fn new(asset_id: Id, amount: u64, owners: OutputOwners) -> Self {
        Self {
            asset_id,
            output: Output::Transfer(TransferOutput { amount, owners }),
        }
    }
}

impl Encode for TransferableOutput {
    fn encode(&self, packer: &mut Packer) {
        packer.id(&self.asset_id);
        self.output.encode(packer);
    }
}

impl Decode for TransferableOutput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            asset_id: unpacker.id("output asset id")?,
            output: Output::decode(unpacker)?,
        })
    }
}

// ==============================================================================
// Inputs
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInput {
    pub amount: u64,
    pub sig_indices: Vec<u32>,
}

impl Encode for TransferInput {
    fn encode(&self, packer: &mut Packer) {
        packer.u64(self.amount);
        packer.list(&self.sig_indices);
    }
}

impl Decode for TransferInput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            amount: unpacker.u64("input amount")?,
            sig_indices: unpacker.list_with("sig indices", 4, |u| u.u32("sig index"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Transfer(TransferInput),
    Locked { locktime: u64, input: TransferInput },
}

impl Input {
    pub fn transfer(&self) -> &TransferInput {
        match self {
            Self::Transfer(input) | Self::Locked { input, .. } => input,
        }
    }

    pub fn amount(&self) -> u64 {
        self.transfer().amount
    }

    pub fn sig_indices(&self) -> &[u32] {
        &self.transfer().sig_indices
    }
}

impl Encode for Input {
    fn encode(&self, packer: &mut Packer) {
        match self {
            Self::Transfer(input) => {
                packer.u32(TRANSFER_INPUT_TYPE_ID);
                input.encode(packer);
            }
            Self::Locked { locktime, input } => {
                packer.u32(LOCKED_INPUT_TYPE_ID);
                packer.u64(*locktime);
                packer.u32(TRANSFER_INPUT_TYPE_ID);
                input.encode(packer);
            }
        }
    }
}

impl Decode for Input {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        match unpacker.u32("input type")? {
            TRANSFER_INPUT_TYPE_ID => Ok(Self::Transfer(TransferInput::decode(unpacker)?)),
            LOCKED_INPUT_TYPE_ID => {
                let locktime = unpacker.u64("input stake locktime")?;
                expect_type_id(unpacker, "locked input", TRANSFER_INPUT_TYPE_ID)?;
                Ok(Self::Locked {
                    locktime,
                    input: TransferInput::decode(unpacker)?,
                })
            }
            type_id => Err(DecodeError::UnknownTypeId {
                what: "input",
                type_id,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl Encode for TransferableInput {
    fn encode(&self, packer: &mut Packer) {
        self.utxo_id.encode(packer);
        packer.id(&self.asset_id);
        self.input.encode(packer);
    }
}

impl Decode for TransferableInput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            utxo_id: UtxoId::decode(unpacker)?,
            asset_id: unpacker.id("input asset id")?,
            input: Input::decode(unpacker)?,
        })
    }
}

// ==============================================================================
// UTXO
// ==============================================================================

/// A stored unspent output as returned by `platform.getUTXOs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub output: Output,
}

impl Utxo {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        crate::codec::from_bytes(bytes, "utxo")
    }
}

impl Encode for Utxo {
    fn encode(&self, packer: &mut Packer) {
        self.utxo_id.encode(packer);
        packer.id(&self.asset_id);
        self.output.encode(packer);
    }
}

impl Decode for Utxo {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            utxo_id: UtxoId::decode(unpacker)?,
            asset_id: unpacker.id("utxo asset id")?,
            output: Output::decode(unpacker)?,
        })
    }
}

// ==============================================================================
// Credentials And Authorization
// ==============================================================================

/// Recoverable secp256k1 signatures (`r ‖ s ‖ v`) for one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credential {
    pub signatures: Vec<[u8; SIGNATURE_LEN]>,
}

impl Encode for Credential {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(CREDENTIAL_TYPE_ID);
        packer.count(self.signatures.len());
        for sig in &self.signatures {
            packer.raw(sig);
        }
    }
}

impl Decode for Credential {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        expect_type_id(unpacker, "credential", CREDENTIAL_TYPE_ID)?;
        Ok(Self {
            signatures: unpacker.list_with("signatures", SIGNATURE_LEN, |u| {
                u.fixed::<SIGNATURE_LEN>("signature")
            })?,
        })
    }
}

/// Signature indices authorizing a subnet operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubnetAuth {
    pub sig_indices: Vec<u32>,
}

impl Encode for SubnetAuth {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(SUBNET_AUTH_TYPE_ID);
        packer.list(&self.sig_indices);
    }
}

impl Decode for SubnetAuth {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        expect_type_id(unpacker, "subnet auth", SUBNET_AUTH_TYPE_ID)?;
        Ok(Self {
            sig_indices: unpacker.list_with("subnet auth indices", 4, |u| u.u32("sig index"))?,
        })
    }
}

// ==============================================================================
// Staking
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub node_id: NodeId,
    pub start: u64,
    pub end: u64,
    pub weight: u64,
}

impl Encode for Validator {
    fn encode(&self, packer: &mut Packer) {
        packer.node_id(&self.node_id);
        packer.u64(self.start);
        packer.u64(self.end);
        packer.u64(self.weight);
    }
}

impl Decode for Validator {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            node_id: unpacker.node_id("validator node id")?,
            start: unpacker.u64("validator start")?,
            end: unpacker.u64("validator end")?,
            weight: unpacker.u64("validator weight")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signer {
    Empty,
    ProofOfPossession {
        public_key: [u8; BLS_PUBLIC_KEY_LEN],
        proof: [u8; BLS_SIGNATURE_LEN],
    },
}

impl Encode for Signer {
    fn encode(&self, packer: &mut Packer) {
        match self {
            Self::Empty => packer.u32(EMPTY_SIGNER_TYPE_ID),
            Self::ProofOfPossession { public_key, proof } => {
                packer.u32(POP_SIGNER_TYPE_ID);
                packer.raw(public_key);
                packer.raw(proof);
            }
        }
    }
}

impl Decode for Signer {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        match unpacker.u32("signer type")? {
            EMPTY_SIGNER_TYPE_ID => Ok(Self::Empty),
            POP_SIGNER_TYPE_ID => Ok(Self::ProofOfPossession {
                public_key: unpacker.fixed("bls public key")?,
                proof: unpacker.fixed("bls proof of possession")?,
            }),
            type_id => Err(DecodeError::UnknownTypeId {
                what: "signer",
                type_id,
            }),
        }
    }
}
