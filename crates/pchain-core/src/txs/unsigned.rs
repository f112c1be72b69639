//! Unsigned transaction bodies, one struct per catalog entry.

use crate::codec::{Decode, Encode, Packer, Unpacker};
use crate::error::DecodeError;
use crate::ids::{Id, NodeId};

use super::components::{
    Owner, OutputOwners, Signer, SubnetAuth, TransferableInput, TransferableOutput, Validator,
};
use super::{AvaxTx, OperationType, TxDetails};

pub const ADD_VALIDATOR_TX_TYPE_ID: u32 = 12;
pub const ADD_SUBNET_VALIDATOR_TX_TYPE_ID: u32 = 13;
pub const ADD_DELEGATOR_TX_TYPE_ID: u32 = 14;
pub const CREATE_CHAIN_TX_TYPE_ID: u32 = 15;
pub const CREATE_SUBNET_TX_TYPE_ID: u32 = 16;
pub const IMPORT_TX_TYPE_ID: u32 = 17;
pub const EXPORT_TX_TYPE_ID: u32 = 18;
pub const ADVANCE_TIME_TX_TYPE_ID: u32 = 19;
pub const REWARD_VALIDATOR_TX_TYPE_ID: u32 = 20;
pub const REMOVE_SUBNET_VALIDATOR_TX_TYPE_ID: u32 = 23;
pub const TRANSFORM_SUBNET_TX_TYPE_ID: u32 = 24;
pub const ADD_PERMISSIONLESS_VALIDATOR_TX_TYPE_ID: u32 = 25;
pub const ADD_PERMISSIONLESS_DELEGATOR_TX_TYPE_ID: u32 = 26;

// ==============================================================================
// Base
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub outputs: Vec<TransferableOutput>,
    pub inputs: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

impl Encode for BaseTx {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(self.network_id);
        packer.id(&self.blockchain_id);
        packer.list(&self.outputs);
        packer.list(&self.inputs);
        packer.bytes(&self.memo);
    }
}

impl Decode for BaseTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            network_id: unpacker.u32("network id")?,
            blockchain_id: unpacker.id("blockchain id")?,
            outputs: unpacker.list("outputs")?,
            inputs: unpacker.list("inputs")?,
            memo: unpacker.bytes("memo")?.to_vec(),
        })
    }
}

// ==============================================================================
// Cross-Chain
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: Id,
    pub imported_inputs: Vec<TransferableInput>,
}

impl Encode for ImportTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        packer.id(&self.source_chain);
        packer.list(&self.imported_inputs);
    }
}

impl Decode for ImportTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            source_chain: unpacker.id("source chain")?,
            imported_inputs: unpacker.list("imported inputs")?,
        })
    }
}

impl AvaxTx for ImportTx {
    fn op_type(&self) -> OperationType {
        OperationType::Import
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn imported_inputs(&self) -> &[TransferableInput] {
        &self.imported_inputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            source_chain: Some(self.source_chain),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: Id,
    pub exported_outputs: Vec<TransferableOutput>,
}

impl Encode for ExportTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        packer.id(&self.destination_chain);
        packer.list(&self.exported_outputs);
    }
}

impl Decode for ExportTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            destination_chain: unpacker.id("destination chain")?,
            exported_outputs: unpacker.list("exported outputs")?,
        })
    }
}

impl AvaxTx for ExportTx {
    fn op_type(&self) -> OperationType {
        OperationType::Export
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn exported_outputs(&self) -> &[TransferableOutput] {
        &self.exported_outputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            destination_chain: Some(self.destination_chain),
            ..TxDetails::default()
        }
    }
}

// ==============================================================================
// Primary Network Staking
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake_outputs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    pub delegation_shares: u32,
}

impl Encode for AddValidatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        self.validator.encode(packer);
        packer.list(&self.stake_outputs);
        Owner(self.rewards_owner.clone()).encode(packer);
        packer.u32(self.delegation_shares);
    }
}

impl Decode for AddValidatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            validator: Validator::decode(unpacker)?,
            stake_outputs: unpacker.list("stake outputs")?,
            rewards_owner: Owner::decode(unpacker)?.0,
            delegation_shares: unpacker.u32("delegation shares")?,
        })
    }
}

impl AvaxTx for AddValidatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::AddValidator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn stake_outputs(&self) -> &[TransferableOutput] {
        &self.stake_outputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            validator: Some(&self.validator),
            rewards_owner: Some(&self.rewards_owner),
            delegation_shares: Some(self.delegation_shares),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake_outputs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl Encode for AddDelegatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        self.validator.encode(packer);
        packer.list(&self.stake_outputs);
        Owner(self.rewards_owner.clone()).encode(packer);
    }
}

impl Decode for AddDelegatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            validator: Validator::decode(unpacker)?,
            stake_outputs: unpacker.list("stake outputs")?,
            rewards_owner: Owner::decode(unpacker)?.0,
        })
    }
}

impl AvaxTx for AddDelegatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::AddDelegator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn stake_outputs(&self) -> &[TransferableOutput] {
        &self.stake_outputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            validator: Some(&self.validator),
            rewards_owner: Some(&self.rewards_owner),
            ..TxDetails::default()
        }
    }
}

// ==============================================================================
// Subnets And Chains
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub subnet_auth: SubnetAuth,
}

impl Encode for AddSubnetValidatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        self.validator.encode(packer);
        packer.id(&self.subnet_id);
        self.subnet_auth.encode(packer);
    }
}

impl Decode for AddSubnetValidatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            validator: Validator::decode(unpacker)?,
            subnet_id: unpacker.id("subnet id")?,
            subnet_auth: SubnetAuth::decode(unpacker)?,
        })
    }
}

impl AvaxTx for AddSubnetValidatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::AddSubnetValidator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            validator: Some(&self.validator),
            subnet_id: Some(self.subnet_id),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveSubnetValidatorTx {
    pub base: BaseTx,
    pub node_id: NodeId,
    pub subnet_id: Id,
    pub subnet_auth: SubnetAuth,
}

impl Encode for RemoveSubnetValidatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        packer.node_id(&self.node_id);
        packer.id(&self.subnet_id);
        self.subnet_auth.encode(packer);
    }
}

impl Decode for RemoveSubnetValidatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            node_id: unpacker.node_id("node id")?,
            subnet_id: unpacker.id("subnet id")?,
            subnet_auth: SubnetAuth::decode(unpacker)?,
        })
    }
}

impl AvaxTx for RemoveSubnetValidatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::RemoveSubnetValidator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            node_id: Some(self.node_id),
            subnet_id: Some(self.subnet_id),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub chain_name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub genesis_data: Vec<u8>,
    pub subnet_auth: SubnetAuth,
}

impl Encode for CreateChainTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        packer.id(&self.subnet_id);
        packer.string(&self.chain_name);
        packer.id(&self.vm_id);
        packer.list(&self.fx_ids);
        packer.bytes(&self.genesis_data);
        self.subnet_auth.encode(packer);
    }
}

impl Decode for CreateChainTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            subnet_id: unpacker.id("subnet id")?,
            chain_name: unpacker.string("chain name")?,
            vm_id: unpacker.id("vm id")?,
            fx_ids: unpacker.list_with("fx ids", 32, |u| u.id("fx id"))?,
            genesis_data: unpacker.bytes("chain genesis data")?.to_vec(),
            subnet_auth: SubnetAuth::decode(unpacker)?,
        })
    }
}

impl AvaxTx for CreateChainTx {
    fn op_type(&self) -> OperationType {
        OperationType::CreateChain
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            subnet_id: Some(self.subnet_id),
            chain_name: Some(&self.chain_name),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

impl Encode for CreateSubnetTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        Owner(self.owner.clone()).encode(packer);
    }
}

impl Decode for CreateSubnetTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            owner: Owner::decode(unpacker)?.0,
        })
    }
}

impl AvaxTx for CreateSubnetTx {
    fn op_type(&self) -> OperationType {
        OperationType::CreateSubnet
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSubnetTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub asset_id: Id,
    pub initial_supply: u64,
    pub maximum_supply: u64,
    pub min_consumption_rate: u64,
    pub max_consumption_rate: u64,
    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_stake_duration: u32,
    pub max_stake_duration: u32,
    pub min_delegation_fee: u32,
    pub min_delegator_stake: u64,
    pub max_validator_weight_factor: u8,
    pub uptime_requirement: u32,
    pub subnet_auth: SubnetAuth,
}

impl Encode for TransformSubnetTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        packer.id(&self.subnet_id);
        packer.id(&self.asset_id);
        packer.u64(self.initial_supply);
        packer.u64(self.maximum_supply);
        packer.u64(self.min_consumption_rate);
        packer.u64(self.max_consumption_rate);
        packer.u64(self.min_validator_stake);
        packer.u64(self.max_validator_stake);
        packer.u32(self.min_stake_duration);
        packer.u32(self.max_stake_duration);
        packer.u32(self.min_delegation_fee);
        packer.u64(self.min_delegator_stake);
        packer.u8(self.max_validator_weight_factor);
        packer.u32(self.uptime_requirement);
        self.subnet_auth.encode(packer);
    }
}

impl Decode for TransformSubnetTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            subnet_id: unpacker.id("subnet id")?,
            asset_id: unpacker.id("subnet asset id")?,
            initial_supply: unpacker.u64("initial supply")?,
            maximum_supply: unpacker.u64("maximum supply")?,
            min_consumption_rate: unpacker.u64("min consumption rate")?,
            max_consumption_rate: unpacker.u64("max consumption rate")?,
            min_validator_stake: unpacker.u64("min validator stake")?,
            max_validator_stake: unpacker.u64("max validator stake")?,
            min_stake_duration: unpacker.u32("min stake duration")?,
            max_stake_duration: unpacker.u32("max stake duration")?,
            min_delegation_fee: unpacker.u32("min delegation fee")?,
            min_delegator_stake: unpacker.u64("min delegator stake")?,
            max_validator_weight_factor: unpacker.u8("max validator weight factor")?,
            uptime_requirement: unpacker.u32("uptime requirement")?,
            subnet_auth: SubnetAuth::decode(unpacker)?,
        })
    }
}

impl AvaxTx for TransformSubnetTx {
    fn op_type(&self) -> OperationType {
        OperationType::TransformSubnet
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            subnet_id: Some(self.subnet_id),
            ..TxDetails::default()
        }
    }
}

// ==============================================================================
// Permissionless Staking
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPermissionlessValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub signer: Signer,
    pub stake_outputs: Vec<TransferableOutput>,
    pub validator_rewards_owner: OutputOwners,
    pub delegator_rewards_owner: OutputOwners,
    pub delegation_shares: u32,
}

impl Encode for AddPermissionlessValidatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        self.validator.encode(packer);
        packer.id(&self.subnet_id);
        self.signer.encode(packer);
        packer.list(&self.stake_outputs);
        Owner(self.validator_rewards_owner.clone()).encode(packer);
        Owner(self.delegator_rewards_owner.clone()).encode(packer);
        packer.u32(self.delegation_shares);
    }
}

impl Decode for AddPermissionlessValidatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            validator: Validator::decode(unpacker)?,
            subnet_id: unpacker.id("subnet id")?,
            signer: Signer::decode(unpacker)?,
            stake_outputs: unpacker.list("stake outputs")?,
            validator_rewards_owner: Owner::decode(unpacker)?.0,
            delegator_rewards_owner: Owner::decode(unpacker)?.0,
            delegation_shares: unpacker.u32("delegation shares")?,
        })
    }
}

impl AvaxTx for AddPermissionlessValidatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::AddPermissionlessValidator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn stake_outputs(&self) -> &[TransferableOutput] {
        &self.stake_outputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            validator: Some(&self.validator),
            subnet_id: Some(self.subnet_id),
            rewards_owner: Some(&self.validator_rewards_owner),
            delegation_shares: Some(self.delegation_shares),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPermissionlessDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub stake_outputs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl Encode for AddPermissionlessDelegatorTx {
    fn encode(&self, packer: &mut Packer) {
        self.base.encode(packer);
        self.validator.encode(packer);
        packer.id(&self.subnet_id);
        packer.list(&self.stake_outputs);
        Owner(self.rewards_owner.clone()).encode(packer);
    }
}

impl Decode for AddPermissionlessDelegatorTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            base: BaseTx::decode(unpacker)?,
            validator: Validator::decode(unpacker)?,
            subnet_id: unpacker.id("subnet id")?,
            stake_outputs: unpacker.list("stake outputs")?,
            rewards_owner: Owner::decode(unpacker)?.0,
        })
    }
}

impl AvaxTx for AddPermissionlessDelegatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::AddPermissionlessDelegator
    }

    fn base(&self) -> Option<&BaseTx> {
        Some(&self.base)
    }

    fn stake_outputs(&self) -> &[TransferableOutput] {
        &self.stake_outputs
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            validator: Some(&self.validator),
            subnet_id: Some(self.subnet_id),
            rewards_owner: Some(&self.rewards_owner),
            ..TxDetails::default()
        }
    }
}

// ==============================================================================
// Block-Internal
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceTimeTx {
    /// Unix seconds.
    pub time: u64,
}

impl AvaxTx for AdvanceTimeTx {
    fn op_type(&self) -> OperationType {
        OperationType::AdvanceTime
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            timestamp: Some(self.time),
            ..TxDetails::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardValidatorTx {
    pub tx_id: Id,
}

impl AvaxTx for RewardValidatorTx {
    fn op_type(&self) -> OperationType {
        OperationType::RewardValidator
    }

    fn details(&self) -> TxDetails<'_> {
        TxDetails {
            staking_tx_id: Some(self.tx_id),
            ..TxDetails::default()
        }
    }
}

// ==============================================================================
// Tagged Union
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTx {
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    AddDelegator(AddDelegatorTx),
    CreateChain(CreateChainTx),
    CreateSubnet(CreateSubnetTx),
    Import(ImportTx),
    Export(ExportTx),
    AdvanceTime(AdvanceTimeTx),
    RewardValidator(RewardValidatorTx),
    RemoveSubnetValidator(RemoveSubnetValidatorTx),
    TransformSubnet(TransformSubnetTx),
    AddPermissionlessValidator(AddPermissionlessValidatorTx),
    AddPermissionlessDelegator(AddPermissionlessDelegatorTx),
}

impl UnsignedTx {
    pub fn type_id(&self) -> u32 {
        match self {
            Self::AddValidator(_) => ADD_VALIDATOR_TX_TYPE_ID,
            Self::AddSubnetValidator(_) => ADD_SUBNET_VALIDATOR_TX_TYPE_ID,
            Self::AddDelegator(_) => ADD_DELEGATOR_TX_TYPE_ID,
            Self::CreateChain(_) => CREATE_CHAIN_TX_TYPE_ID,
            Self::CreateSubnet(_) => CREATE_SUBNET_TX_TYPE_ID,
            Self::Import(_) => IMPORT_TX_TYPE_ID,
            Self::Export(_) => EXPORT_TX_TYPE_ID,
            Self::AdvanceTime(_) => ADVANCE_TIME_TX_TYPE_ID,
            Self::RewardValidator(_) => REWARD_VALIDATOR_TX_TYPE_ID,
            Self::RemoveSubnetValidator(_) => REMOVE_SUBNET_VALIDATOR_TX_TYPE_ID,
            Self::TransformSubnet(_) => TRANSFORM_SUBNET_TX_TYPE_ID,
            Self::AddPermissionlessValidator(_) => ADD_PERMISSIONLESS_VALIDATOR_TX_TYPE_ID,
            Self::AddPermissionlessDelegator(_) => ADD_PERMISSIONLESS_DELEGATOR_TX_TYPE_ID,
        }
    }

    /// The capability view every variant implements.
    pub fn as_avax(&self) -> &dyn AvaxTx {
        match self {
            Self::AddValidator(tx) => tx,
            Self::AddSubnetValidator(tx) => tx,
            Self::AddDelegator(tx) => tx,
            Self::CreateChain(tx) => tx,
            Self::CreateSubnet(tx) => tx,
            Self::Import(tx) => tx,
            Self::Export(tx) => tx,
            Self::AdvanceTime(tx) => tx,
            Self::RewardValidator(tx) => tx,
            Self::RemoveSubnetValidator(tx) => tx,
            Self::TransformSubnet(tx) => tx,
            Self::AddPermissionlessValidator(tx) => tx,
            Self::AddPermissionlessDelegator(tx) => tx,
        }
    }

    /// Versioned unsigned bytes; their sha256 is what gets signed.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        crate::codec::from_bytes(bytes, "unsigned transaction")
    }
}

impl Encode for UnsignedTx {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(self.type_id());
        match self {
            Self::AddValidator(tx) => tx.encode(packer),
            Self::AddSubnetValidator(tx) => tx.encode(packer),
            Self::AddDelegator(tx) => tx.encode(packer),
            Self::CreateChain(tx) => tx.encode(packer),
            Self::CreateSubnet(tx) => tx.encode(packer),
            Self::Import(tx) => tx.encode(packer),
            Self::Export(tx) => tx.encode(packer),
            Self::AdvanceTime(tx) => packer.u64(tx.time),
            Self::RewardValidator(tx) => packer.id(&tx.tx_id),
            Self::RemoveSubnetValidator(tx) => tx.encode(packer),
            Self::TransformSubnet(tx) => tx.encode(packer),
            Self::AddPermissionlessValidator(tx) => tx.encode(packer),
            Self::AddPermissionlessDelegator(tx) => tx.encode(packer),
        }
    }
}

impl Decode for UnsignedTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let tx = match unpacker.u32("transaction type")? {
            ADD_VALIDATOR_TX_TYPE_ID => Self::AddValidator(AddValidatorTx::decode(unpacker)?),
            ADD_SUBNET_VALIDATOR_TX_TYPE_ID => {
                Self::AddSubnetValidator(AddSubnetValidatorTx::decode(unpacker)?)
            }
            ADD_DELEGATOR_TX_TYPE_ID => Self::AddDelegator(AddDelegatorTx::decode(unpacker)?),
            CREATE_CHAIN_TX_TYPE_ID => Self::CreateChain(CreateChainTx::decode(unpacker)?),
            CREATE_SUBNET_TX_TYPE_ID => Self::CreateSubnet(CreateSubnetTx::decode(unpacker)?),
            IMPORT_TX_TYPE_ID => Self::Import(ImportTx::decode(unpacker)?),
            EXPORT_TX_TYPE_ID => Self::Export(ExportTx::decode(unpacker)?),
            ADVANCE_TIME_TX_TYPE_ID => Self::AdvanceTime(AdvanceTimeTx {
                time: unpacker.u64("advance time")?,
            }),
            REWARD_VALIDATOR_TX_TYPE_ID => Self::RewardValidator(RewardValidatorTx {
                tx_id: unpacker.id("rewarded staker tx id")?,
            }),
            REMOVE_SUBNET_VALIDATOR_TX_TYPE_ID => {
                Self::RemoveSubnetValidator(RemoveSubnetValidatorTx::decode(unpacker)?)
            }
            TRANSFORM_SUBNET_TX_TYPE_ID => {
                Self::TransformSubnet(TransformSubnetTx::decode(unpacker)?)
            }
            ADD_PERMISSIONLESS_VALIDATOR_TX_TYPE_ID => {
                Self::AddPermissionlessValidator(AddPermissionlessValidatorTx::decode(unpacker)?)
            }
            ADD_PERMISSIONLESS_DELEGATOR_TX_TYPE_ID => {
                Self::AddPermissionlessDelegator(AddPermissionlessDelegatorTx::decode(unpacker)?)
            }
            other => return Err(DecodeError::UnsupportedTxType(other)),
        };
        Ok(tx)
    }
}
