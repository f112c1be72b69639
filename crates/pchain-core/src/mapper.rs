//! Transaction operation mapping.
//!
//! Turns decoded transactions into Rosetta operations: one debit per
//! attributable input, one credit per attributable AVAX output. An output
//! is attributable when it has exactly one owner and a threshold of one.
//! Inputs are attributed through the caller-supplied [`InputAccounts`],
//! since a transaction does not carry the owners of what it spends.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::block::ParsedBlock;
use crate::error::CoreError;
use crate::genesis::ParsedGenesisBlock;
use crate::ids::{ChainAliases, Id, ShortId, P_CHAIN_ALIAS};
use crate::rosetta::{
    AccountIdentifier, Amount, Block, BlockIdentifier, CoinChange, Metadata, Operation,
    OperationIdentifier, Transaction, TransactionIdentifier, STATUS_SUCCESS,
};
use crate::rpc::PChainRpc;
use crate::txs::components::{Input, OutputOwners, TransferableOutput, UtxoId};
use crate::txs::{AvaxTx, InputKind, OutputKind, Tx};

/// Owner of each spent UTXO, keyed by `"<tx id>:<output index>"`.
pub type InputAccounts = HashMap<String, AccountIdentifier>;

/// Operation type of the credits synthesized for genesis allocations.
pub const GENESIS_OPERATION_TYPE: &str = "GENESIS";

pub const OP_META_TYPE: &str = "type";
pub const OP_INPUT: &str = "INPUT";
pub const OP_IMPORT: &str = "IMPORT";
pub const OP_OUTPUT: &str = "OUTPUT";
pub const OP_EXPORT: &str = "EXPORT";
pub const OP_STAKE: &str = "STAKE";

/// Whether operations describe accepted chain state or an unbroadcast intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// Operations carry `SUCCESS` status and created coin identifiers.
    Block,
    /// No status, no created coins: the transaction id is not final yet.
    Construction,
}

/// Sole owner under the single-owner rule.
pub fn attributable_owner(owners: &OutputOwners) -> Option<&ShortId> {
    if owners.threshold == 1 {
        owners.sole_address()
    } else {
        None
    }
}

// ==============================================================================
// Mapper
// ==============================================================================

pub struct TxMapper<'a> {
    hrp: &'a str,
    asset_id: Id,
    aliases: &'a ChainAliases,
    mode: MappingMode,
}

impl<'a> TxMapper<'a> {
    pub fn new(hrp: &'a str, asset_id: Id, aliases: &'a ChainAliases, mode: MappingMode) -> Self {
        Self {
            hrp,
            asset_id,
            aliases,
            mode,
        }
    }

    pub fn map_transaction(
        &self,
        tx: &Tx,
        accounts: &InputAccounts,
    ) -> Result<Transaction, CoreError> {
        Ok(Transaction {
            transaction_identifier: TransactionIdentifier {
                hash: tx.id().to_string(),
            },
            operations: self.operations(tx.as_avax(), tx.id(), accounts)?,
            metadata: self.tx_metadata(tx.as_avax())?,
        })
    }

    pub fn map_block(
        &self,
        block: &ParsedBlock,
        accounts: &InputAccounts,
    ) -> Result<Block, CoreError> {
        let transactions = block
            .transactions
            .iter()
            .map(|tx| self.map_transaction(tx, accounts))
            .collect::<Result<Vec<_>, _>>()?;

        let mut metadata = Metadata::new();
        metadata.insert("type".into(), block.block_type.to_string().into());
        if block.container_id != block.block_id {
            metadata.insert("container_id".into(), block.container_id.to_string().into());
        }
        if block.proposer.is_present() {
            metadata.insert("proposer_id".into(), block.proposer.id.to_string().into());
            metadata.insert(
                "proposer_node_id".into(),
                block.proposer.node_id.to_string().into(),
            );
            metadata.insert(
                "p_chain_height".into(),
                block.proposer.p_chain_height.into(),
            );
        }

        Ok(Block {
            block_identifier: BlockIdentifier {
                index: block.height,
                hash: block.block_id.to_string(),
            },
            parent_block_identifier: BlockIdentifier {
                index: block.height.saturating_sub(1),
                hash: block.parent_id.to_string(),
            },
            timestamp: block.timestamp_ms,
            transactions,
            metadata,
        })
    }

    /// Allocations become credit-only transactions grouped by the id
    /// recorded in their UTXO ids. The parent is the hash of the raw
    /// genesis bytes, as computed by the resolver.
    pub fn map_genesis_block(&self, genesis: &ParsedGenesisBlock) -> Result<Block, CoreError> {
        let mut block = self.map_block(&genesis.block, &InputAccounts::new())?;

        let mut groups: Vec<(Id, Vec<Operation>)> = Vec::new();
        for genesis_utxo in &genesis.data.utxos {
            let utxo = &genesis_utxo.utxo;
            if utxo.asset_id != self.asset_id {
                continue;
            }
            let Some(owner) = attributable_owner(utxo.output.owners()) else {
                continue;
            };
            let position = match groups.iter().position(|(id, _)| *id == utxo.utxo_id.tx_id) {
                Some(position) => position,
                None => {
                    groups.push((utxo.utxo_id.tx_id, Vec::new()));
                    groups.len() - 1
                }
            };
            let ops = &mut groups[position].1;

            let mut metadata = Metadata::new();
            metadata.insert(OP_META_TYPE.into(), OP_OUTPUT.into());
            if let Some(locktime) = utxo.output.stake_locktime() {
                metadata.insert("locktime".into(), locktime.into());
            }
            if !genesis_utxo.message.is_empty() {
                metadata.insert("message".into(), hex::encode(&genesis_utxo.message).into());
            }
            ops.push(Operation {
                operation_identifier: OperationIdentifier {
                    index: ops.len() as u64,
                },
                op_type: GENESIS_OPERATION_TYPE.to_owned(),
                status: Some(STATUS_SUCCESS.to_owned()),
                account: Some(AccountIdentifier::new(
                    owner.to_address(P_CHAIN_ALIAS, self.hrp)?,
                )),
                amount: Some(Amount::avax_credit(utxo.output.amount())),
                coin_change: Some(CoinChange::created(utxo.utxo_id.to_string())),
                metadata,
            });
        }

        block
            .transactions
            .extend(groups.into_iter().map(|(tx_id, operations)| Transaction {
                transaction_identifier: TransactionIdentifier {
                    hash: tx_id.to_string(),
                },
                operations,
                metadata: Metadata::new(),
            }));
        block
            .metadata
            .insert("message".into(), genesis.data.message.clone().into());
        block.metadata.insert(
            "initial_supply".into(),
            genesis.data.initial_supply.into(),
        );
        Ok(block)
    }

    /// Debits for inputs found in `accounts`, then credits for attributable
    /// outputs, numbered consecutively.
    pub fn operations(
        &self,
        tx: &dyn AvaxTx,
        tx_id: Id,
        accounts: &InputAccounts,
    ) -> Result<Vec<Operation>, CoreError> {
        let op_type = tx.op_type().as_str();
        let details = tx.details();
        let status = match self.mode {
            MappingMode::Block => Some(STATUS_SUCCESS.to_owned()),
            MappingMode::Construction => None,
        };
        let mut ops = Vec::new();

        for input_ref in tx.inputs() {
            let input = input_ref.input;
            if input.asset_id != self.asset_id {
                continue;
            }
            let coin = input.utxo_id.to_string();
            let Some(account) = accounts.get(&coin) else {
                continue;
            };

            let mut metadata = Metadata::new();
            let coin_change = match input_ref.kind {
                InputKind::Spend => {
                    metadata.insert(OP_META_TYPE.into(), OP_INPUT.into());
                    Some(CoinChange::spent(coin))
                }
                InputKind::Import => {
                    metadata.insert(OP_META_TYPE.into(), OP_IMPORT.into());
                    if let Some(source) = details.source_chain {
                        metadata.insert("source_chain".into(), self.aliases.describe(&source).into());
                    }
                    metadata.insert("utxo_id".into(), coin.into());
                    None
                }
            };
            if let Input::Locked { locktime, .. } = &input.input {
                metadata.insert("locktime".into(), (*locktime).into());
            }

            ops.push(Operation {
                operation_identifier: OperationIdentifier {
                    index: ops.len() as u64,
                },
                op_type: op_type.to_owned(),
                status: status.clone(),
                account: Some(account.clone()),
                amount: Some(Amount::avax_debit(input.input.amount())),
                coin_change,
                metadata,
            });
        }

        for output_ref in tx.outputs() {
            let output = output_ref.output;
            let Some(address) = self.output_address(output, output_ref.kind, details.destination_chain)?
            else {
                continue;
            };

            let mut metadata = Metadata::new();
            let coin_change = match output_ref.kind {
                OutputKind::Create { index } => {
                    metadata.insert(OP_META_TYPE.into(), OP_OUTPUT.into());
                    match self.mode {
                        MappingMode::Block => {
                            Some(CoinChange::created(UtxoId::new(tx_id, index).to_string()))
                        }
                        MappingMode::Construction => None,
                    }
                }
                OutputKind::Export => {
                    metadata.insert(OP_META_TYPE.into(), OP_EXPORT.into());
                    if let Some(destination) = details.destination_chain {
                        metadata.insert(
                            "destination_chain".into(),
                            self.aliases.describe(&destination).into(),
                        );
                    }
                    None
                }
                OutputKind::Stake => {
                    metadata.insert(OP_META_TYPE.into(), OP_STAKE.into());
                    None
                }
            };
            if let Some(locktime) = output.output.stake_locktime() {
                metadata.insert("locktime".into(), locktime.into());
            }

            ops.push(Operation {
                operation_identifier: OperationIdentifier {
                    index: ops.len() as u64,
                },
                op_type: op_type.to_owned(),
                status: status.clone(),
                account: Some(AccountIdentifier::new(address)),
                amount: Some(Amount::avax_credit(output.output.amount())),
                coin_change,
                metadata,
            });
        }

        Ok(ops)
    }

    /// Exported outputs are owned on the destination chain and rendered with
    /// its alias when it is known.
    fn output_address(
        &self,
        output: &TransferableOutput,
        kind: OutputKind,
        destination: Option<Id>,
    ) -> Result<Option<String>, CoreError> {
        if output.asset_id != self.asset_id {
            return Ok(None);
        }
        let Some(owner) = attributable_owner(output.output.owners()) else {
            return Ok(None);
        };
        let alias = match (kind, destination) {
            (OutputKind::Export, Some(chain)) => self.aliases.alias(&chain).unwrap_or(P_CHAIN_ALIAS),
            _ => P_CHAIN_ALIAS,
        };
        owner.to_address(alias, self.hrp).map(Some)
    }

    pub fn tx_metadata(&self, tx: &dyn AvaxTx) -> Result<Metadata, CoreError> {
        let details = tx.details();
        let mut metadata = Metadata::new();

        if let Some(validator) = details.validator {
            metadata.insert("node_id".into(), validator.node_id.to_string().into());
            metadata.insert("start".into(), validator.start.into());
            metadata.insert("end".into(), validator.end.into());
            metadata.insert("weight".into(), validator.weight.into());
        }
        if let Some(node_id) = details.node_id {
            metadata.insert("node_id".into(), node_id.to_string().into());
        }
        if let Some(shares) = details.delegation_shares {
            metadata.insert("shares".into(), shares.into());
        }
        if let Some(subnet_id) = details.subnet_id {
            metadata.insert("subnet_id".into(), subnet_id.to_string().into());
        }
        if let Some(owner) = details.rewards_owner.and_then(attributable_owner) {
            metadata.insert(
                "rewards_owner".into(),
                owner.to_address(P_CHAIN_ALIAS, self.hrp)?.into(),
            );
        }
        if let Some(source) = details.source_chain {
            metadata.insert("source_chain".into(), self.aliases.describe(&source).into());
        }
        if let Some(destination) = details.destination_chain {
            metadata.insert(
                "destination_chain".into(),
                self.aliases.describe(&destination).into(),
            );
        }
        if let Some(name) = details.chain_name {
            metadata.insert("chain_name".into(), name.into());
        }
        if let Some(timestamp) = details.timestamp {
            metadata.insert("timestamp".into(), timestamp.into());
        }
        if let Some(staking_tx_id) = details.staking_tx_id {
            metadata.insert("staking_tx_id".into(), staking_tx_id.to_string().into());
        }
        if let Some(base) = tx.base() {
            if !base.memo.is_empty() {
                metadata.insert("memo".into(), format!("0x{}", hex::encode(&base.memo)).into());
            }
        }
        Ok(metadata)
    }
}

// ==============================================================================
// Input Account Resolution
// ==============================================================================

/// Owner an import delivers to: the single attributable owner shared by
/// every attributable output the transaction creates. `None` when the
/// outputs name no owner or several.
fn import_destination(tx: &dyn AvaxTx) -> Option<ShortId> {
    let mut owners = tx
        .outputs()
        .into_iter()
        .filter(|output_ref| matches!(output_ref.kind, OutputKind::Create { .. }))
        .filter_map(|output_ref| attributable_owner(output_ref.output.output.owners()).copied());
    let first = owners.next()?;
    owners.all(|owner| owner == first).then_some(first)
}

/// Looks up the owner of every input consumed by `txs`.
///
/// Creating transactions are fetched once each; spends of genesis
/// allocations are answered from `genesis`. Imported inputs are attributed
/// to the import destination, addressed on the source chain.
pub async fn resolve_input_accounts(
    rpc: &dyn PChainRpc,
    txs: &[Tx],
    genesis: Option<&ParsedGenesisBlock>,
    aliases: &ChainAliases,
    hrp: &str,
) -> Result<InputAccounts, CoreError> {
    let mut accounts = InputAccounts::new();
    for tx in txs {
        let avax = tx.as_avax();
        let imports: Vec<UtxoId> = avax
            .inputs()
            .into_iter()
            .filter(|input_ref| input_ref.kind == InputKind::Import)
            .map(|input_ref| input_ref.input.utxo_id)
            .collect();
        if imports.is_empty() {
            continue;
        }
        let (Some(source), Some(owner)) = (avax.details().source_chain, import_destination(avax))
        else {
            debug!(tx = %tx.id(), "import has no single destination owner");
            continue;
        };
        let address = owner.to_address(&aliases.describe(&source), hrp)?;
        for utxo_id in imports {
            accounts.insert(utxo_id.to_string(), AccountIdentifier::new(address.clone()));
        }
    }

    let spends: Vec<UtxoId> = txs
        .iter()
        .flat_map(|tx| tx.as_avax().inputs())
        .filter(|input_ref| input_ref.kind == InputKind::Spend)
        .map(|input_ref| input_ref.input.utxo_id)
        .collect();

    let to_fetch: BTreeSet<Id> = spends
        .iter()
        .filter(|utxo_id| genesis.and_then(|g| g.utxo(utxo_id)).is_none())
        .map(|utxo_id| utxo_id.tx_id)
        .collect();
    let to_fetch: Vec<Id> = to_fetch.into_iter().collect();

    let fetched = if to_fetch.is_empty() {
        Vec::new()
    } else {
        rpc.get_txs(&to_fetch).await?
    };
    let mut creators: HashMap<Id, Tx> = HashMap::with_capacity(fetched.len());
    for (tx_id, bytes) in to_fetch.iter().zip(fetched) {
        creators.insert(*tx_id, Tx::from_bytes(&bytes)?);
    }
    debug!(
        inputs = spends.len(),
        fetched = creators.len(),
        "resolving input accounts"
    );

    accounts.reserve(spends.len());
    for utxo_id in spends {
        let owners = match genesis.and_then(|g| g.utxo(&utxo_id)) {
            Some(utxo) => Some(utxo.output.owners()),
            None => creators
                .get(&utxo_id.tx_id)
                .and_then(|creator| creator.as_avax().produced_output(utxo_id.output_index))
                .map(|output| output.output.owners()),
        };
        let Some(owners) = owners else {
            warn!(utxo = %utxo_id, "spent output not found in its creating transaction");
            continue;
        };
        if let Some(owner) = attributable_owner(owners) {
            accounts.insert(
                utxo_id.to_string(),
                AccountIdentifier::new(owner.to_address(P_CHAIN_ALIAS, hrp)?),
            );
        }
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::block::{BlockType, Proposer};
    use crate::genesis::tests::genesis_state;
    use crate::genesis::{GenesisBlockData, ParsedGenesisBlock};
    use crate::ids::C_CHAIN_ALIAS;
    use crate::rpc::mock::MockRpc;
    use crate::test_util::*;
    use crate::txs::components::{Output, TransferInput, TransferOutput, TransferableInput, Validator};
    use crate::txs::{
        AddDelegatorTx, BaseTx, ExportTx, ImportTx, RewardValidatorTx, UnsignedTx,
    };

    const HRP: &str = "fuji";

    fn fuji_avax() -> Id {
        "U8iRqJoiJm8xZHAacmvYyZVwqQx6uDNtQeP3CQ6fcgQk3JqnK"
            .parse()
            .expect("fuji AVAX asset id must parse")
    }

    fn addr(address: &str) -> ShortId {
        ShortId::from_address(address)
            .expect("fixture address must parse")
            .short_id
    }

    fn id(cb58: &str) -> Id {
        cb58.parse().expect("fixture id must parse")
    }

    fn fuji_output(amount: u64, threshold: u32, owners: &[&str]) -> TransferableOutput {
        TransferableOutput::new(
            fuji_avax(),
            amount,
            OutputOwners {
                locktime: 0,
                threshold,
                addresses: owners.iter().map(|a| addr(a)).collect(),
            },
        )
    }

    fn fuji_input(tx_id: &str, amount: u64) -> TransferableInput {
        TransferableInput {
            utxo_id: UtxoId::new(id(tx_id), 0),
            asset_id: fuji_avax(),
            input: Input::Transfer(TransferInput {
                amount,
                sig_indices: vec![],
            }),
        }
    }

    fn fuji_base(outputs: Vec<TransferableOutput>, inputs: Vec<TransferableInput>) -> BaseTx {
        BaseTx {
            network_id: 5,
            blockchain_id: Id::EMPTY,
            outputs,
            inputs,
            memo: vec![],
        }
    }

    fn aliases() -> ChainAliases {
        ChainAliases::new(
            id("2JVSBoinj9C2J33VntvzYtVJNZdN2NKiwwKjcumHUWEb5DbBrm"),
            id("yH8D7ThNJkxmtkuv2jgBa4P1Rn3Qpr4pPr7QYNfcdoS6k6HWp"),
        )
    }

    fn import_fixture() -> (ImportTx, InputAccounts) {
        let import = ImportTx {
            base: fuji_base(
                vec![
                    fuji_output(8_000_000, 1, &["P-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk"]),
                    // multisig
                    fuji_output(
                        8_000_000,
                        2,
                        &[
                            "P-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk",
                            "P-fuji1fmragvegm5k26qzlt6vy0ghhdr508u6r4a5rxj",
                            "P-fuji1j3sw805usytrsymfwxxrcwfqguyarumn45cllj",
                        ],
                    ),
                    // ownerless
                    fuji_output(1_000_000, 0, &[]),
                ],
                vec![],
            ),
            source_chain: id("2JVSBoinj9C2J33VntvzYtVJNZdN2NKiwwKjcumHUWEb5DbBrm"),
            imported_inputs: vec![fuji_input(
                "2DtYhzCvo9LRYMRJ6sCtYJ4aNPRpsibp46ETNyY6H5Cox1VLvX",
                9_000_000,
            )],
        };
        let mut accounts = InputAccounts::new();
        accounts.insert(
            import.imported_inputs[0].utxo_id.to_string(),
            AccountIdentifier::new("C-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk"),
        );
        (import, accounts)
    }

    #[test]
    fn import_emits_one_credit_and_one_debit() {
        let (import, accounts) = import_fixture();
        let aliases = aliases();
        let tx = Tx::new(UnsignedTx::Import(import), vec![]);
        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Block);

        let mapped = mapper
            .map_transaction(&tx, &accounts)
            .expect("import must map");
        let ops = &mapped.operations;
        assert_eq!(ops.len(), 2);

        let debit = &ops[0];
        assert_eq!(debit.op_type, "IMPORT_AVAX");
        assert_eq!(debit.status.as_deref(), Some(STATUS_SUCCESS));
        assert_eq!(debit.operation_identifier.index, 0);
        assert_eq!(
            debit.account.as_ref().map(|a| a.address.as_str()),
            Some("C-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk")
        );
        assert_eq!(debit.amount.as_ref().map(|a| a.value.as_str()), Some("-9000000"));
        assert!(debit.coin_change.is_none());
        assert_eq!(debit.metadata[OP_META_TYPE], OP_IMPORT);
        assert_eq!(debit.metadata["source_chain"], C_CHAIN_ALIAS);

        let credit = &ops[1];
        assert_eq!(credit.operation_identifier.index, 1);
        assert_eq!(
            credit.account.as_ref().map(|a| a.address.as_str()),
            Some("P-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk")
        );
        assert_eq!(credit.amount.as_ref().map(|a| a.value.as_str()), Some("8000000"));
        assert_eq!(
            credit.coin_change,
            Some(CoinChange::created(format!("{}:0", tx.id())))
        );
        assert_eq!(mapped.metadata["source_chain"], C_CHAIN_ALIAS);
    }

    #[tokio::test]
    async fn imported_inputs_resolve_to_destination_on_source_chain() {
        let (import, _) = import_fixture();
        let aliases = aliases();
        let tx = Tx::new(UnsignedTx::Import(import), vec![]);
        let rpc = MockRpc::builder().build();

        let accounts =
            resolve_input_accounts(&rpc, std::slice::from_ref(&tx), None, &aliases, HRP)
                .await
                .expect("imports resolve without fetching");
        let imported = UtxoId::new(id("2DtYhzCvo9LRYMRJ6sCtYJ4aNPRpsibp46ETNyY6H5Cox1VLvX"), 0);
        assert_eq!(
            accounts[&imported.to_string()],
            AccountIdentifier::new("C-fuji1xm0r37l6gyf2mly4pmzc0tz6wnwqkugedh95fk")
        );

        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Block);
        let mapped = mapper
            .map_transaction(&tx, &accounts)
            .expect("import must map");
        assert_eq!(mapped.operations.len(), 2);
        assert_eq!(
            mapped.operations[0].amount.as_ref().map(|a| a.value.as_str()),
            Some("-9000000")
        );
    }

    #[test]
    fn import_destination_requires_one_owner() {
        let one = import_tx(
            vec![
                transfer_output(10, single_owner(1)),
                transfer_output(20, multisig_owner(1, &[2, 3])),
                transfer_output(30, single_owner(1)),
            ],
            vec![],
        );
        assert_eq!(import_destination(&one), Some(short_id(1)));

        let two = import_tx(
            vec![transfer_output(10, single_owner(1)), transfer_output(10, single_owner(2))],
            vec![],
        );
        assert_eq!(import_destination(&two), None);
        assert_eq!(import_destination(&import_tx(vec![], vec![])), None);
    }

    #[test]
    fn inputs_without_accounts_are_excluded() {
        let (import, _) = import_fixture();
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Block);

        let ops = mapper
            .operations(&import, Id::EMPTY, &InputAccounts::new())
            .expect("import must map");
        assert_eq!(ops.len(), 1);
        assert!(ops.iter().all(|op| !op.amount.as_ref().is_some_and(|a| a.value.starts_with('-'))));
    }

    #[test]
    fn export_renders_destination_alias() {
        let export = ExportTx {
            base: fuji_base(
                vec![fuji_output(2_910_137_500, 1, &["P-fuji1wmd9dfrqpud6daq0cde47u0r7pkrr46ep60399"])],
                vec![fuji_input("27LaDkrUrMY1bhVf2i8RARCrRwFjeRw7vEu8ntLQXracgLzL1v", 2_921_137_500)],
            ),
            destination_chain: id("yH8D7ThNJkxmtkuv2jgBa4P1Rn3Qpr4pPr7QYNfcdoS6k6HWp"),
            exported_outputs: vec![fuji_output(
                10_000_000,
                1,
                &["P-fuji1wmd9dfrqpud6daq0cde47u0r7pkrr46ep60399"],
            )],
        };
        let mut accounts = InputAccounts::new();
        accounts.insert(
            export.base.inputs[0].utxo_id.to_string(),
            AccountIdentifier::new("P-fuji1wmd9dfrqpud6daq0cde47u0r7pkrr46ep60399"),
        );
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Construction);

        let ops = mapper
            .operations(&export, Id::EMPTY, &accounts)
            .expect("export must map");
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(|op| op.status.is_none() && op.op_type == "EXPORT_AVAX"));
        assert_eq!(ops[0].metadata[OP_META_TYPE], OP_INPUT);
        assert_eq!(
            ops[0].coin_change,
            Some(CoinChange::spent(export.base.inputs[0].utxo_id.to_string()))
        );
        assert_eq!(ops[1].metadata[OP_META_TYPE], OP_OUTPUT);
        assert!(ops[1].coin_change.is_none());
        assert_eq!(ops[2].metadata[OP_META_TYPE], OP_EXPORT);
        assert_eq!(ops[2].metadata["destination_chain"], "X");
        assert_eq!(
            ops[2].account.as_ref().map(|a| a.address.as_str()),
            Some("X-fuji1wmd9dfrqpud6daq0cde47u0r7pkrr46ep60399")
        );
    }

    #[test]
    fn delegator_maps_stake_and_metadata() {
        let delegator = AddDelegatorTx {
            base: fuji_base(
                vec![fuji_output(996_649_063, 1, &["P-fuji1gdkq8g208e3j4epyjmx65jglsw7vauh86l47ac"])],
                vec![fuji_input("2JQGX1MBdszAaeV6eApCZm7CBpc917qWiyQ2cygFRJ6WteDkre", 1_996_649_063)],
            ),
            validator: Validator {
                node_id: "NodeID-BFa1padLXBj7VHa2JYvYGzcTBPQGjPhUy"
                    .parse()
                    .expect("fixture node id must parse"),
                start: 1_656_058_022,
                end: 1_657_872_569,
                weight: 1_000_000_000,
            },
            stake_outputs: vec![TransferableOutput {
                asset_id: fuji_avax(),
                output: Output::Locked {
                    locktime: 1_700_000_000,
                    output: TransferOutput {
                        amount: 1_000_000_000,
                        owners: OutputOwners::single(addr(
                            "P-fuji1l022sue7g2kzvrcuxughl30xkss2cj0az3e5r2",
                        )),
                    },
                },
            }],
            rewards_owner: OutputOwners::single(addr(
                "P-fuji1l022sue7g2kzvrcuxughl30xkss2cj0az3e5r2",
            )),
        };
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Block);

        let ops = mapper
            .operations(&delegator, Id::EMPTY, &InputAccounts::new())
            .expect("delegator must map");
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].metadata[OP_META_TYPE], OP_STAKE);
        assert_eq!(ops[1].metadata["locktime"], 1_700_000_000u64);
        assert!(ops[1].coin_change.is_none());

        let metadata = mapper.tx_metadata(&delegator).expect("metadata must map");
        assert_eq!(metadata["node_id"], "NodeID-BFa1padLXBj7VHa2JYvYGzcTBPQGjPhUy");
        assert_eq!(metadata["weight"], 1_000_000_000u64);
        assert_eq!(
            metadata["rewards_owner"],
            "P-fuji1l022sue7g2kzvrcuxughl30xkss2cj0az3e5r2"
        );
    }

    #[test]
    fn foreign_assets_are_skipped() {
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, Id::new([0x99; 32]), &aliases, MappingMode::Block);
        let (import, accounts) = import_fixture();

        let ops = mapper
            .operations(&import, Id::EMPTY, &accounts)
            .expect("import must map");
        assert!(ops.is_empty());
    }

    #[test]
    fn reward_validator_has_no_operations() {
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, fuji_avax(), &aliases, MappingMode::Block);
        let reward = RewardValidatorTx {
            tx_id: Id::new([1; 32]),
        };
        let ops = mapper
            .operations(&reward, Id::EMPTY, &InputAccounts::new())
            .expect("reward must map");
        assert!(ops.is_empty());
        let metadata = mapper.tx_metadata(&reward).expect("metadata must map");
        assert_eq!(metadata["staking_tx_id"], Id::new([1; 32]).to_string());
    }

    #[test]
    fn block_links_to_previous_height() {
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, avax_asset(), &aliases, MappingMode::Block);
        let block = ParsedBlock {
            height: 10,
            block_id: Id::new([2; 32]),
            container_id: Id::new([2; 32]),
            parent_id: Id::new([1; 32]),
            block_type: BlockType::BanffStandard,
            timestamp_ms: 1_700_000_000_000,
            proposer: Proposer::default(),
            transactions: vec![signed_import_tx(1)],
        };

        let mapped = mapper
            .map_block(&block, &InputAccounts::new())
            .expect("block must map");
        assert_eq!(mapped.block_identifier.index, 10);
        assert_eq!(mapped.parent_block_identifier.index, 9);
        assert_eq!(mapped.parent_block_identifier.hash, Id::new([1; 32]).to_string());
        assert_eq!(mapped.timestamp, 1_700_000_000_000);
        assert_eq!(mapped.transactions.len(), 1);
        assert_eq!(mapped.metadata["type"], "BanffStandardBlock");
        assert!(mapped.metadata.get("proposer_id").is_none());
    }

    #[test]
    fn genesis_block_credits_allocations() {
        let state = genesis_state();
        let aliases = aliases();
        let mapper = TxMapper::new(HRP, avax_asset(), &aliases, MappingMode::Block);
        let genesis = ParsedGenesisBlock {
            block: ParsedBlock {
                height: 0,
                block_id: Id::new([0x77; 32]),
                container_id: Id::new([0x77; 32]),
                parent_id: Id::new([0x66; 32]),
                block_type: BlockType::Genesis,
                timestamp_ms: 1_599_696_000_000,
                proposer: Proposer::default(),
                transactions: state.validators.iter().chain(&state.chains).cloned().collect(),
            },
            data: GenesisBlockData {
                message: state.message.clone(),
                initial_supply: state.initial_supply,
                utxos: state.utxos.clone(),
            },
        };

        let block = mapper.map_genesis_block(&genesis).expect("genesis must map");
        assert_eq!(block.block_identifier.hash, Id::new([0x77; 32]).to_string());
        assert_eq!(block.parent_block_identifier.hash, Id::new([0x66; 32]).to_string());
        assert_eq!(block.parent_block_identifier.index, 0);
        // validator, chain, then one allocation group
        assert_eq!(block.transactions.len(), 3);
        let allocations = &block.transactions[2];
        assert_eq!(allocations.transaction_identifier.hash, Id::new([0xA1; 32]).to_string());
        assert_eq!(allocations.operations.len(), 2);
        assert_eq!(allocations.operations[0].op_type, GENESIS_OPERATION_TYPE);
        assert_eq!(
            allocations.operations[1].coin_change,
            Some(CoinChange::created(utxo(0xA1, 1).to_string()))
        );
        assert!(allocations.operations[1].metadata.contains_key("locktime"));
        assert_eq!(block.metadata["initial_supply"], 1_000u64);
    }

    #[tokio::test]
    async fn input_accounts_follow_single_owner_rule() {
        let creator = Tx::new(
            UnsignedTx::Import(import_tx(
                vec![
                    transfer_output(10, single_owner(1)),
                    transfer_output(20, multisig_owner(1, &[2, 3])),
                ],
                vec![],
            )),
            vec![],
        );
        let spender = Tx::new(
            UnsignedTx::Import(ImportTx {
                base: base_tx(
                    vec![],
                    vec![
                        transfer_input(UtxoId::new(creator.id(), 0), 10, vec![0]),
                        transfer_input(UtxoId::new(creator.id(), 1), 20, vec![0]),
                    ],
                ),
                source_chain: c_chain(),
                imported_inputs: vec![transfer_input(utxo(9, 0), 5, vec![0])],
            }),
            vec![],
        );
        let rpc = Arc::new(
            MockRpc::builder()
                .with_tx(creator.id(), creator.bytes().to_vec())
                .build(),
        );

        let accounts = resolve_input_accounts(rpc.as_ref(), &[spender], None, &aliases(), HRP)
            .await
            .expect("inputs must resolve");
        // the imported input has no destination output to attribute it to
        assert_eq!(accounts.len(), 1);
        assert_eq!(
            accounts[&UtxoId::new(creator.id(), 0).to_string()],
            AccountIdentifier::new(short_id(1).to_address("P", HRP).expect("address"))
        );
    }

    #[tokio::test]
    async fn genesis_allocations_resolve_without_rpc() {
        let state = genesis_state();
        let genesis = ParsedGenesisBlock {
            block: ParsedBlock {
                height: 0,
                block_id: Id::EMPTY,
                container_id: Id::EMPTY,
                parent_id: Id::EMPTY,
                block_type: BlockType::Genesis,
                timestamp_ms: 0,
                proposer: Proposer::default(),
                transactions: vec![],
            },
            data: GenesisBlockData {
                message: String::new(),
                initial_supply: 0,
                utxos: state.utxos,
            },
        };
        let spender = Tx::new(
            UnsignedTx::Import(ImportTx {
                base: base_tx(vec![], vec![transfer_input(utxo(0xA1, 0), 300, vec![0])]),
                source_chain: c_chain(),
                imported_inputs: vec![],
            }),
            vec![],
        );
        let rpc = MockRpc::builder().build();

        let accounts = resolve_input_accounts(&rpc, &[spender], Some(&genesis), &aliases(), HRP)
            .await
            .expect("genesis spend must resolve");
        assert_eq!(
            accounts[&utxo(0xA1, 0).to_string()],
            AccountIdentifier::new(short_id(1).to_address("P", HRP).expect("address"))
        );
    }
}
