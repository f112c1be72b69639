//! Transaction construction.
//!
//! The eight Rosetta construction stages: derive, preprocess, metadata,
//! payloads, parse, combine, hash and submit. Only metadata and submit talk
//! to the node; the rest are pure functions of a [`ConstructionContext`].
//!
//! Supported intents are imports, exports, and primary network validator
//! and delegator registrations. Transactions travel between stages as a
//! JSON [`TxEnvelope`] holding checksummed hex bytes and, per input in
//! credential order, the addresses expected to sign.

use std::collections::HashMap;

use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use bitcoin::secp256k1::{Message, PublicKey as Secp256k1PublicKey, Secp256k1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codec::to_bytes;
use crate::error::{ConstructionError, CoreError};
use crate::ids::{
    decode_hex_checksummed, encode_hex_checksummed, ChainAliases, Id, NodeId, ShortId,
    P_CHAIN_ALIAS,
};
use crate::mapper::{
    InputAccounts, MappingMode, TxMapper, OP_EXPORT, OP_IMPORT, OP_INPUT, OP_META_TYPE, OP_OUTPUT,
    OP_STAKE,
};
use crate::rosetta::{
    AccountIdentifier, Metadata, Operation, PublicKey, Signature, SignatureType, SigningPayload,
    CURVE_SECP256K1,
};
use crate::rpc::{PChainRpc, TxFees, UtxoCursor};
use crate::txs::components::{
    Credential, Input, OutputOwners, TransferInput, TransferableInput, TransferableOutput, Utxo,
    UtxoId, Validator, SIGNATURE_LEN,
};
use crate::txs::{
    AddDelegatorTx, AddValidatorTx, BaseTx, ExportTx, ImportTx, OperationType, Tx, UnsignedTx,
};

/// Page size for `platform.getUTXOs`.
pub const UTXO_PAGE_SIZE: u32 = 1024;

/// Largest memo the P-chain accepts, in bytes.
pub const MAX_MEMO_LEN: usize = 256;

/// Static inputs every stage needs, fixed at backend initialization.
#[derive(Debug, Clone)]
pub struct ConstructionContext {
    pub hrp: String,
    pub network_id: u32,
    pub asset_id: Id,
    pub aliases: ChainAliases,
}

impl ConstructionContext {
    fn mapper(&self) -> TxMapper<'_> {
        TxMapper::new(
            &self.hrp,
            self.asset_id,
            &self.aliases,
            MappingMode::Construction,
        )
    }
}

// ==============================================================================
// Stage Payloads
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRequest {
    pub coin: String,
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingRequest {
    pub node_id: NodeId,
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<u32>,
    pub reward_address: String,
}

/// Output of preprocess, input of metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    pub tx_type: OperationType,
    #[serde(default)]
    pub coins: Vec<CoinRequest>,
    #[serde(default)]
    pub imported_coins: Vec<CoinRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking: Option<StakingRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// A requested coin bound to its UTXO and the signatures it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub coin: String,
    pub account: String,
    pub amount: u64,
    pub sig_indices: Vec<u32>,
    pub signers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u64>,
}

/// Output of metadata, input of payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionMetadata {
    pub tx_type: OperationType,
    pub network_id: u32,
    pub blockchain_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chain_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_chain_id: Option<Id>,
    #[serde(default)]
    pub inputs: Vec<ResolvedInput>,
    #[serde(default)]
    pub imported_inputs: Vec<ResolvedInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking: Option<StakingRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSigners {
    pub coin_identifier: String,
    pub account_identifier: AccountIdentifier,
    pub signers: Vec<AccountIdentifier>,
}

/// Wire form of an unsigned or signed transaction between stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnvelope {
    /// Checksummed hex of the versioned transaction bytes. Unsigned
    /// envelopes hold the unsigned bytes only.
    pub tx: String,
    pub signers: Vec<InputSigners>,
}

impl TxEnvelope {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw)
            .map_err(|e| ConstructionError::InvalidEnvelope(e.to_string()).into())
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self)
            .map_err(|e| ConstructionError::InvalidEnvelope(e.to_string()).into())
    }

    fn bytes(&self) -> Result<Vec<u8>, CoreError> {
        decode_hex_checksummed(&self.tx)
            .map_err(|e| ConstructionError::InvalidEnvelope(e.to_string()).into())
    }

    fn unsigned_tx(&self) -> Result<Tx, CoreError> {
        let unsigned = UnsignedTx::from_bytes(&self.bytes()?)?;
        Ok(Tx::new(unsigned, Vec::new()))
    }

    fn signed_tx(&self) -> Result<Tx, CoreError> {
        Ok(Tx::from_bytes(&self.bytes()?)?)
    }

    fn input_accounts(&self) -> InputAccounts {
        self.signers
            .iter()
            .map(|input| (input.coin_identifier.clone(), input.account_identifier.clone()))
            .collect()
    }
}

// ==============================================================================
// Intent Classification
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    Import,
    Output,
    Export,
    Stake,
}

#[derive(Debug, Clone)]
struct IntentInput {
    coin: String,
    account: String,
    amount: u64,
    role: Role,
}

#[derive(Debug, Clone)]
struct IntentOutput {
    owner: ShortId,
    amount: u64,
    role: Role,
}

#[derive(Debug, Clone)]
struct Intent {
    tx_type: OperationType,
    inputs: Vec<IntentInput>,
    outputs: Vec<IntentOutput>,
    source_chain: Option<String>,
    destination_chain: Option<String>,
}

fn supported(tx_type: &str) -> Result<OperationType, ConstructionError> {
    match OperationType::parse(tx_type) {
        Some(
            ty @ (OperationType::Import
            | OperationType::Export
            | OperationType::AddValidator
            | OperationType::AddDelegator),
        ) => Ok(ty),
        _ => Err(ConstructionError::UnsupportedOperationType(
            tx_type.to_owned(),
        )),
    }
}

fn meta_str<'m>(metadata: &'m Metadata, key: &str) -> Option<&'m str> {
    metadata.get(key).and_then(serde_json::Value::as_str)
}

fn parse_intent(operations: &[Operation], hrp: &str) -> Result<Intent, ConstructionError> {
    let first = operations.first().ok_or(ConstructionError::EmptyOperations)?;
    let tx_type = supported(&first.op_type)?;

    let mut intent = Intent {
        tx_type,
        inputs: Vec::new(),
        outputs: Vec::new(),
        source_chain: None,
        destination_chain: None,
    };

    for (index, op) in operations.iter().enumerate() {
        let invalid = |reason: String| ConstructionError::InvalidOperation { index, reason };
        if op.op_type != first.op_type {
            return Err(ConstructionError::MixedOperationTypes {
                first: first.op_type.clone(),
                other: op.op_type.clone(),
            });
        }
        let account = op
            .account
            .as_ref()
            .ok_or_else(|| invalid("missing account".to_owned()))?;
        let (amount, negative) = op
            .amount
            .as_ref()
            .and_then(|amount| amount.magnitude())
            .ok_or_else(|| invalid("missing or malformed amount".to_owned()))?;

        let role = match meta_str(&op.metadata, OP_META_TYPE) {
            Some(OP_INPUT) => Role::Input,
            Some(OP_IMPORT) => Role::Import,
            Some(OP_OUTPUT) => Role::Output,
            Some(OP_EXPORT) => Role::Export,
            Some(OP_STAKE) => Role::Stake,
            Some(other) => return Err(invalid(format!("unknown operation role `{other}`"))),
            None if negative && tx_type == OperationType::Import => Role::Import,
            None if negative => Role::Input,
            None => Role::Output,
        };
        let expects_debit = matches!(role, Role::Input | Role::Import);
        if expects_debit != negative {
            return Err(invalid(format!(
                "amount sign does not match a {} operation",
                if expects_debit { "debit" } else { "credit" }
            )));
        }

        let parsed = ShortId::from_address(&account.address)
            .map_err(|e| invalid(e.to_string()))?;
        if parsed.hrp != hrp {
            return Err(invalid(format!(
                "address `{}` is not on network `{hrp}`",
                account.address
            )));
        }

        match role {
            Role::Input | Role::Import => {
                let coin = op
                    .coin_change
                    .as_ref()
                    .map(|change| change.coin_identifier.identifier.clone())
                    .or_else(|| meta_str(&op.metadata, "utxo_id").map(str::to_owned))
                    .ok_or_else(|| invalid("missing coin identifier".to_owned()))?;
                coin.parse::<UtxoId>()
                    .map_err(|e| invalid(e.to_string()))?;
                if role == Role::Import {
                    if let Some(source) = meta_str(&op.metadata, "source_chain") {
                        intent.source_chain = Some(source.to_owned());
                    }
                }
                intent.inputs.push(IntentInput {
                    coin,
                    account: account.address.clone(),
                    amount,
                    role,
                });
            }
            Role::Output | Role::Export | Role::Stake => {
                if role == Role::Export {
                    let destination = meta_str(&op.metadata, "destination_chain")
                        .map(str::to_owned)
                        .or_else(|| {
                            (parsed.chain_alias != P_CHAIN_ALIAS).then(|| parsed.chain_alias.clone())
                        });
                    if destination.is_some() {
                        intent.destination_chain = destination;
                    }
                }
                intent.outputs.push(IntentOutput {
                    owner: parsed.short_id,
                    amount,
                    role,
                });
            }
        }
    }

    Ok(intent)
}

// ==============================================================================
// 1. Derive
// ==============================================================================

/// Address of a compressed secp256k1 public key on the P-chain.
pub fn derive(ctx: &ConstructionContext, public_key: &PublicKey) -> Result<AccountIdentifier, CoreError> {
    if public_key.curve_type != CURVE_SECP256K1 {
        return Err(ConstructionError::InvalidPublicKey(format!(
            "unsupported curve `{}`",
            public_key.curve_type
        ))
        .into());
    }
    let bytes = hex::decode(public_key.hex_bytes.trim_start_matches("0x"))
        .map_err(|e| ConstructionError::InvalidPublicKey(e.to_string()))?;
    if bytes.len() != 33 {
        return Err(ConstructionError::InvalidPublicKey(format!(
            "expected 33 compressed bytes, got {}",
            bytes.len()
        ))
        .into());
    }
    Secp256k1PublicKey::from_slice(&bytes)
        .map_err(|e| ConstructionError::InvalidPublicKey(e.to_string()))?;

    let address = ShortId::from_public_key(&bytes).to_address(P_CHAIN_ALIAS, &ctx.hrp)?;
    Ok(AccountIdentifier::new(address))
}

// ==============================================================================
// 2. Preprocess
// ==============================================================================

fn meta_u64(metadata: &Metadata, key: &'static str) -> Result<Option<u64>, ConstructionError> {
    match metadata.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConstructionError::InvalidMetadata(format!("{key} must be unsigned"))),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| ConstructionError::InvalidMetadata(format!("{key} must be unsigned"))),
        Some(_) => Err(ConstructionError::InvalidMetadata(format!(
            "{key} must be unsigned"
        ))),
    }
}

fn staking_request(
    tx_type: OperationType,
    metadata: &Metadata,
) -> Result<Option<StakingRequest>, ConstructionError> {
    if !matches!(
        tx_type,
        OperationType::AddValidator | OperationType::AddDelegator
    ) {
        return Ok(None);
    }
    let node_id = meta_str(metadata, "node_id")
        .ok_or(ConstructionError::MissingMetadata("node_id"))?
        .parse::<NodeId>()
        .map_err(|e| ConstructionError::InvalidMetadata(e.to_string()))?;
    let start = meta_u64(metadata, "start")?.ok_or(ConstructionError::MissingMetadata("start"))?;
    let end = meta_u64(metadata, "end")?.ok_or(ConstructionError::MissingMetadata("end"))?;
    if end <= start {
        return Err(ConstructionError::InvalidMetadata(
            "staking end must be after start".to_owned(),
        ));
    }
    let shares = match meta_u64(metadata, "shares")? {
        Some(shares) => Some(u32::try_from(shares).map_err(|_| {
            ConstructionError::InvalidMetadata("shares out of range".to_owned())
        })?),
        None if tx_type == OperationType::AddValidator => {
            return Err(ConstructionError::MissingMetadata("shares"))
        }
        None => None,
    };
    let reward_address = meta_str(metadata, "reward_address")
        .ok_or(ConstructionError::MissingMetadata("reward_address"))?
        .to_owned();
    ShortId::from_address(&reward_address)
        .map_err(|e| ConstructionError::InvalidMetadata(e.to_string()))?;

    Ok(Some(StakingRequest {
        node_id,
        start,
        end,
        shares,
        reward_address,
    }))
}

/// Options for the metadata stage plus the accounts that must sign.
pub fn preprocess(
    ctx: &ConstructionContext,
    operations: &[Operation],
    metadata: &Metadata,
) -> Result<(PreprocessOptions, Vec<AccountIdentifier>), CoreError> {
    let intent = parse_intent(operations, &ctx.hrp)?;

    let mut options = PreprocessOptions {
        tx_type: intent.tx_type,
        coins: Vec::new(),
        imported_coins: Vec::new(),
        source_chain: None,
        destination_chain: None,
        staking: staking_request(intent.tx_type, metadata)?,
        memo: meta_str(metadata, "memo").map(str::to_owned),
    };
    memo_bytes(options.memo.as_deref())?;

    let mut required: Vec<AccountIdentifier> = Vec::new();
    for input in &intent.inputs {
        let request = CoinRequest {
            coin: input.coin.clone(),
            account: input.account.clone(),
        };
        match input.role {
            Role::Import => options.imported_coins.push(request),
            _ => options.coins.push(request),
        }
        let account = AccountIdentifier::new(input.account.clone());
        if !required.contains(&account) {
            required.push(account);
        }
    }

    match intent.tx_type {
        OperationType::Import => {
            let source = meta_str(metadata, "source_chain")
                .map(str::to_owned)
                .or(intent.source_chain)
                .ok_or(ConstructionError::MissingMetadata("source_chain"))?;
            ctx.aliases.chain_id(&source)?;
            options.source_chain = Some(source);
        }
        OperationType::Export => {
            let destination = meta_str(metadata, "destination_chain")
                .map(str::to_owned)
                .or(intent.destination_chain)
                .ok_or(ConstructionError::MissingMetadata("destination_chain"))?;
            ctx.aliases.chain_id(&destination)?;
            options.destination_chain = Some(destination);
        }
        _ => {}
    }

    debug!(
        tx_type = %options.tx_type,
        coins = options.coins.len(),
        imported = options.imported_coins.len(),
        "preprocessed construction intent"
    );
    Ok((options, required))
}

// ==============================================================================
// 3. Metadata
// ==============================================================================

async fn fetch_utxos(
    rpc: &dyn PChainRpc,
    addresses: &[String],
    source_chain: Option<&str>,
) -> Result<HashMap<String, Utxo>, CoreError> {
    let mut utxos = HashMap::new();
    let mut cursor: Option<UtxoCursor> = None;
    loop {
        let page = rpc
            .get_utxos(addresses, source_chain, UTXO_PAGE_SIZE, cursor.as_ref())
            .await?;
        for bytes in &page.utxos {
            let utxo = Utxo::from_bytes(bytes)?;
            utxos.insert(utxo.utxo_id.to_string(), utxo);
        }
        if page.num_fetched < UTXO_PAGE_SIZE {
            return Ok(utxos);
        }
        cursor = Some(page.end_index);
    }
}

/// P-chain renderings of the distinct signer addresses, the form
/// `platform.getUTXOs` accepts.
fn query_addresses(requests: &[CoinRequest], hrp: &str) -> Result<Vec<String>, CoreError> {
    let mut out = Vec::new();
    for request in requests {
        let short_id = ShortId::from_address(&request.account)?.short_id;
        let address = short_id.to_address(P_CHAIN_ALIAS, hrp)?;
        if !out.contains(&address) {
            out.push(address);
        }
    }
    Ok(out)
}

fn resolve_coin(
    request: &CoinRequest,
    utxos: &HashMap<String, Utxo>,
    signers: &HashMap<ShortId, String>,
    asset_id: Id,
) -> Result<ResolvedInput, CoreError> {
    let utxo = utxos
        .get(&request.coin)
        .ok_or_else(|| ConstructionError::CoinNotFound(request.coin.clone()))?;
    if utxo.asset_id != asset_id {
        return Err(ConstructionError::InvalidMetadata(format!(
            "coin {} is not AVAX",
            request.coin
        ))
        .into());
    }

    let owners = utxo.output.owners();
    let threshold = owners.threshold as usize;
    let mut sig_indices = Vec::with_capacity(threshold);
    let mut names = Vec::with_capacity(threshold);
    for (index, address) in owners.addresses.iter().enumerate() {
        if sig_indices.len() == threshold {
            break;
        }
        if let Some(name) = signers.get(address) {
            sig_indices.push(index as u32);
            names.push(name.clone());
        }
    }
    if sig_indices.len() < threshold {
        return Err(ConstructionError::InsufficientSigners {
            coin: request.coin.clone(),
            threshold: owners.threshold,
            available: sig_indices.len(),
        }
        .into());
    }

    Ok(ResolvedInput {
        coin: request.coin.clone(),
        account: request.account.clone(),
        amount: utxo.output.amount(),
        sig_indices,
        signers: names,
        locktime: utxo.output.stake_locktime(),
    })
}

fn fee_for(tx_type: OperationType, fees: &TxFees) -> u64 {
    match tx_type {
        OperationType::AddValidator => fees.add_primary_network_validator_fee,
        OperationType::AddDelegator => fees.add_primary_network_delegator_fee,
        _ => fees.tx_fee,
    }
}

/// Binds each requested coin to its UTXO and fetches the fee.
pub async fn metadata(
    ctx: &ConstructionContext,
    rpc: &dyn PChainRpc,
    options: &PreprocessOptions,
) -> Result<ConstructionMetadata, CoreError> {
    let mut signers: HashMap<ShortId, String> = HashMap::new();
    for request in options.coins.iter().chain(&options.imported_coins) {
        let short_id = ShortId::from_address(&request.account)?.short_id;
        signers
            .entry(short_id)
            .or_insert_with(|| request.account.clone());
    }

    let mut inputs = Vec::with_capacity(options.coins.len());
    if !options.coins.is_empty() {
        let addresses = query_addresses(&options.coins, &ctx.hrp)?;
        let utxos = fetch_utxos(rpc, &addresses, None).await?;
        for request in &options.coins {
            inputs.push(resolve_coin(request, &utxos, &signers, ctx.asset_id)?);
        }
    }

    let source_chain_id = options
        .source_chain
        .as_deref()
        .map(|alias| ctx.aliases.chain_id(alias))
        .transpose()?;
    let destination_chain_id = options
        .destination_chain
        .as_deref()
        .map(|alias| ctx.aliases.chain_id(alias))
        .transpose()?;

    let mut imported_inputs = Vec::with_capacity(options.imported_coins.len());
    if !options.imported_coins.is_empty() {
        let source = options
            .source_chain
            .as_deref()
            .ok_or(ConstructionError::MissingMetadata("source_chain"))?;
        let addresses = query_addresses(&options.imported_coins, &ctx.hrp)?;
        let utxos = fetch_utxos(rpc, &addresses, Some(source)).await?;
        for request in &options.imported_coins {
            imported_inputs.push(resolve_coin(request, &utxos, &signers, ctx.asset_id)?);
        }
    }

    let fees = rpc.get_tx_fees().await?;
    Ok(ConstructionMetadata {
        tx_type: options.tx_type,
        network_id: ctx.network_id,
        blockchain_id: Id::EMPTY,
        source_chain_id,
        destination_chain_id,
        inputs,
        imported_inputs,
        staking: options.staking.clone(),
        memo: options.memo.clone(),
        fee: fee_for(options.tx_type, &fees),
    })
}

// ==============================================================================
// 4. Payloads
// ==============================================================================

fn transferable_input(
    resolved: &ResolvedInput,
    asset_id: Id,
) -> Result<TransferableInput, CoreError> {
    let transfer = TransferInput {
        amount: resolved.amount,
        sig_indices: resolved.sig_indices.clone(),
    };
    Ok(TransferableInput {
        utxo_id: resolved.coin.parse()?,
        asset_id,
        input: match resolved.locktime {
            Some(locktime) => Input::Locked {
                locktime,
                input: transfer,
            },
            None => Input::Transfer(transfer),
        },
    })
}

/// Inputs sorted by UTXO id, each paired with its signer record.
fn sorted_inputs(
    resolved: &[ResolvedInput],
    asset_id: Id,
) -> Result<Vec<(TransferableInput, InputSigners)>, CoreError> {
    let mut out = resolved
        .iter()
        .map(|resolved| -> Result<_, CoreError> {
            let input = transferable_input(resolved, asset_id)?;
            let signers = InputSigners {
                coin_identifier: resolved.coin.clone(),
                account_identifier: AccountIdentifier::new(resolved.account.clone()),
                signers: resolved
                    .signers
                    .iter()
                    .map(|s| AccountIdentifier::new(s.clone()))
                    .collect(),
            };
            Ok((input, signers))
        })
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| a.0.utxo_id.cmp(&b.0.utxo_id));
    Ok(out)
}

fn sorted_outputs(intent: &Intent, role: Role, asset_id: Id) -> Vec<TransferableOutput> {
    let mut outputs: Vec<TransferableOutput> = intent
        .outputs
        .iter()
        .filter(|output| output.role == role)
        .map(|output| {
            TransferableOutput::new(asset_id, output.amount, OutputOwners::single(output.owner))
        })
        .collect();
    outputs.sort_by_cached_key(to_bytes);
    outputs
}

fn check_inputs_match(intent: &Intent, metadata: &ConstructionMetadata) -> Result<(), ConstructionError> {
    for (index, input) in intent.inputs.iter().enumerate() {
        let resolved = match input.role {
            Role::Import => &metadata.imported_inputs,
            _ => &metadata.inputs,
        };
        let found = resolved
            .iter()
            .find(|r| r.coin == input.coin)
            .ok_or_else(|| ConstructionError::CoinNotFound(input.coin.clone()))?;
        if found.amount != input.amount {
            return Err(ConstructionError::InvalidOperation {
                index,
                reason: format!(
                    "coin {} holds {} but the operation spends {}",
                    input.coin, found.amount, input.amount
                ),
            });
        }
    }
    Ok(())
}

fn memo_bytes(memo: Option<&str>) -> Result<Vec<u8>, ConstructionError> {
    let memo = memo.unwrap_or_default().as_bytes();
    if memo.len() > MAX_MEMO_LEN {
        return Err(ConstructionError::InvalidMetadata(format!(
            "memo of {} bytes exceeds {MAX_MEMO_LEN}",
            memo.len()
        )));
    }
    Ok(memo.to_vec())
}

/// Sum of client-supplied amounts; overflow means the request is malformed.
fn checked_total(
    amounts: impl IntoIterator<Item = u64>,
    what: &str,
) -> Result<u64, ConstructionError> {
    amounts
        .into_iter()
        .try_fold(0u64, u64::checked_add)
        .ok_or_else(|| ConstructionError::InvalidMetadata(format!("{what} overflow u64")))
}

/// Builds the unsigned transaction and one signing payload per required
/// signature, in credential order.
pub fn payloads(
    ctx: &ConstructionContext,
    operations: &[Operation],
    metadata: &ConstructionMetadata,
) -> Result<(TxEnvelope, Vec<SigningPayload>), CoreError> {
    let intent = parse_intent(operations, &ctx.hrp)?;
    if intent.tx_type != metadata.tx_type {
        return Err(ConstructionError::InvalidMetadata(format!(
            "metadata was prepared for {} but operations are {}",
            metadata.tx_type, intent.tx_type
        ))
        .into());
    }
    check_inputs_match(&intent, metadata)?;

    let spent = checked_total(
        metadata
            .inputs
            .iter()
            .chain(&metadata.imported_inputs)
            .map(|input| input.amount),
        "input amounts",
    )?;
    let produced = checked_total(intent.outputs.iter().map(|output| output.amount), "output amounts")?;
    let required = checked_total([produced, metadata.fee], "outputs plus fee")?;
    if spent < required {
        return Err(ConstructionError::InvalidMetadata(format!(
            "inputs of {spent} do not cover outputs of {produced} plus fee {}",
            metadata.fee
        ))
        .into());
    }

    let spends = sorted_inputs(&metadata.inputs, ctx.asset_id)?;
    let imports = sorted_inputs(&metadata.imported_inputs, ctx.asset_id)?;
    let base = BaseTx {
        network_id: metadata.network_id,
        blockchain_id: metadata.blockchain_id,
        outputs: sorted_outputs(&intent, Role::Output, ctx.asset_id),
        inputs: spends.iter().map(|(input, _)| input.clone()).collect(),
        memo: memo_bytes(metadata.memo.as_deref())?,
    };

    let unsigned = match metadata.tx_type {
        OperationType::Import => UnsignedTx::Import(ImportTx {
            base,
            source_chain: metadata
                .source_chain_id
                .ok_or(ConstructionError::MissingMetadata("source_chain_id"))?,
            imported_inputs: imports.iter().map(|(input, _)| input.clone()).collect(),
        }),
        OperationType::Export => UnsignedTx::Export(ExportTx {
            base,
            destination_chain: metadata
                .destination_chain_id
                .ok_or(ConstructionError::MissingMetadata("destination_chain_id"))?,
            exported_outputs: sorted_outputs(&intent, Role::Export, ctx.asset_id),
        }),
        OperationType::AddValidator | OperationType::AddDelegator => {
            let staking = metadata
                .staking
                .as_ref()
                .ok_or(ConstructionError::MissingMetadata("staking"))?;
            let stake_outputs = sorted_outputs(&intent, Role::Stake, ctx.asset_id);
            let weight = checked_total(stake_outputs.iter().map(|o| o.output.amount()), "stake")?;
            if weight == 0 {
                return Err(ConstructionError::MissingMetadata("stake").into());
            }
            let validator = Validator {
                node_id: staking.node_id,
                start: staking.start,
                end: staking.end,
                weight,
            };
            let rewards_owner =
                OutputOwners::single(ShortId::from_address(&staking.reward_address)?.short_id);
            if metadata.tx_type == OperationType::AddValidator {
                UnsignedTx::AddValidator(AddValidatorTx {
                    base,
                    validator,
                    stake_outputs,
                    rewards_owner,
                    delegation_shares: staking
                        .shares
                        .ok_or(ConstructionError::MissingMetadata("shares"))?,
                })
            } else {
                UnsignedTx::AddDelegator(AddDelegatorTx {
                    base,
                    validator,
                    stake_outputs,
                    rewards_owner,
                })
            }
        }
        other => {
            return Err(ConstructionError::UnsupportedOperationType(other.to_string()).into())
        }
    };

    let tx = Tx::try_new(unsigned, Vec::new())?;
    let signing_hash = hex::encode(tx.signing_payload());
    let signers: Vec<InputSigners> = spends
        .into_iter()
        .chain(imports)
        .map(|(_, signers)| signers)
        .collect();
    let payloads = signers
        .iter()
        .flat_map(|input| &input.signers)
        .map(|signer| SigningPayload {
            account_identifier: signer.clone(),
            hex_bytes: signing_hash.clone(),
            signature_type: SignatureType::EcdsaRecovery,
        })
        .collect();

    let envelope = TxEnvelope {
        tx: encode_hex_checksummed(tx.unsigned_bytes()),
        signers,
    };
    Ok((envelope, payloads))
}

// ==============================================================================
// 5. Parse
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConstruction {
    pub operations: Vec<Operation>,
    /// Distinct signers, reported for signed transactions only.
    pub signers: Vec<AccountIdentifier>,
    pub metadata: Metadata,
}

pub fn parse(
    ctx: &ConstructionContext,
    signed: bool,
    transaction: &str,
) -> Result<ParsedConstruction, CoreError> {
    let envelope = TxEnvelope::from_json(transaction)?;
    let tx = if signed {
        envelope.signed_tx()?
    } else {
        envelope.unsigned_tx()?
    };

    let mapper = ctx.mapper();
    let operations = mapper.operations(tx.as_avax(), tx.id(), &envelope.input_accounts())?;
    let metadata = mapper.tx_metadata(tx.as_avax())?;

    let mut signers: Vec<AccountIdentifier> = Vec::new();
    if signed {
        for signer in envelope.signers.iter().flat_map(|input| &input.signers) {
            if !signers.contains(signer) {
                signers.push(signer.clone());
            }
        }
    }
    Ok(ParsedConstruction {
        operations,
        signers,
        metadata,
    })
}

// ==============================================================================
// 6. Combine
// ==============================================================================

fn recover_signer(
    index: usize,
    signature: &Signature,
    message: &Message,
) -> Result<[u8; SIGNATURE_LEN], CoreError> {
    let signer = signature.signing_payload.account_identifier.address.clone();
    let invalid = || ConstructionError::InvalidSignature {
        index,
        signer: signer.clone(),
    };

    let bytes = hex::decode(signature.hex_bytes.trim_start_matches("0x")).map_err(|_| invalid())?;
    let mut raw: [u8; SIGNATURE_LEN] = bytes.as_slice().try_into().map_err(|_| invalid())?;
    // Accept both raw (0..=3) and Ethereum-style (27..=30) recovery ids.
    if raw[64] >= 27 {
        raw[64] -= 27;
    }
    let recovery_id = RecoveryId::from_i32(i32::from(raw[64])).map_err(|_| invalid())?;
    let recoverable =
        RecoverableSignature::from_compact(&raw[..64], recovery_id).map_err(|_| invalid())?;
    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(message, &recoverable)
        .map_err(|_| invalid())?;

    let expected = ShortId::from_address(&signer)?.short_id;
    if ShortId::from_public_key(&public_key.serialize()) != expected {
        return Err(invalid().into());
    }
    Ok(raw)
}

/// Attaches `signatures`, which must follow the signer order of the
/// unsigned envelope.
pub fn combine(
    unsigned_transaction: &str,
    signatures: &[Signature],
) -> Result<TxEnvelope, CoreError> {
    let envelope = TxEnvelope::from_json(unsigned_transaction)?;
    let unsigned_tx = envelope.unsigned_tx()?;

    let expected: Vec<&AccountIdentifier> = envelope
        .signers
        .iter()
        .flat_map(|input| &input.signers)
        .collect();
    if expected.len() != signatures.len() {
        return Err(ConstructionError::SignatureCountMismatch {
            expected: expected.len(),
            received: signatures.len(),
        }
        .into());
    }
    for (index, (want, got)) in expected.iter().zip(signatures).enumerate() {
        if got.signing_payload.account_identifier.address != want.address {
            return Err(ConstructionError::SignatureOrderMismatch {
                index,
                expected: want.address.clone(),
                received: got.signing_payload.account_identifier.address.clone(),
            }
            .into());
        }
    }

    let message = Message::from_digest(unsigned_tx.signing_payload());
    let mut recovered = signatures
        .iter()
        .enumerate()
        .map(|(index, signature)| recover_signer(index, signature, &message));
    let mut credentials = Vec::with_capacity(envelope.signers.len());
    for input in &envelope.signers {
        let signatures = (&mut recovered)
            .take(input.signers.len())
            .collect::<Result<Vec<_>, _>>()?;
        credentials.push(Credential { signatures });
    }

    let signed = Tx::try_new(unsigned_tx.unsigned, credentials)?;
    info!(tx_id = %signed.id(), "combined signatures");
    Ok(TxEnvelope {
        tx: encode_hex_checksummed(signed.bytes()),
        signers: envelope.signers,
    })
}

// ==============================================================================
// 7. Hash And 8. Submit
// ==============================================================================

pub fn hash(signed_transaction: &str) -> Result<Id, CoreError> {
    Ok(TxEnvelope::from_json(signed_transaction)?.signed_tx()?.id())
}

/// Broadcasts the signed bytes as they are.
pub async fn submit(rpc: &dyn PChainRpc, signed_transaction: &str) -> Result<Id, CoreError> {
    let bytes = TxEnvelope::from_json(signed_transaction)?.bytes()?;
    let tx_id = rpc.issue_tx(&bytes).await?;
    info!(%tx_id, "submitted transaction");
    Ok(tx_id)
}
