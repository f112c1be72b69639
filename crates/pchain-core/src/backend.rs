//! Request dispatch for the P-chain.
//!
//! A [`Backend`] is built once with everything it needs resolved up front:
//! address prefix, chain alias table, network id and genesis block. After
//! that it is read-only and can be shared across request tasks.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::block::DEFAULT_GENESIS_TIMESTAMP;
use crate::construction::{self, ConstructionContext, ConstructionMetadata, PreprocessOptions};
use crate::error::{ConstructionError, CoreError};
use crate::genesis::{resolve_genesis, GenesisSource, ParsedGenesisBlock};
use crate::ids::{hrp_for_network, ChainAliases, Id, C_CHAIN_ALIAS, P_CHAIN_ALIAS, X_CHAIN_ALIAS};
use crate::indexer::BlockParser;
use crate::mapper::{resolve_input_accounts, MappingMode, TxMapper};
use crate::rosetta::{
    Amount, Block, BlockIdentifier, BlockTransactionRequest, BlockTransactionResponse,
    ConstructionCombineRequest, ConstructionCombineResponse, ConstructionDeriveRequest,
    ConstructionDeriveResponse, ConstructionHashRequest, ConstructionMetadataRequest,
    ConstructionMetadataResponse, ConstructionParseRequest, ConstructionParseResponse,
    ConstructionPayloadsRequest, ConstructionPayloadsResponse, ConstructionPreprocessRequest,
    ConstructionPreprocessResponse, ConstructionSubmitRequest, NetworkIdentifier,
    NetworkListResponse, NetworkStatusResponse, PartialBlockIdentifier, SubNetworkIdentifier,
    TransactionIdentifier, TransactionIdentifierResponse,
};
use crate::rpc::PChainRpc;

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Rosetta blockchain name, e.g. `Avalanche`.
    pub blockchain: String,
    /// Network name: `Mainnet`, `Fuji` or `Local`.
    pub network: String,
    pub avax_asset_id: Id,
    /// Timestamp floor, in seconds, for blocks without an explicit time.
    pub genesis_timestamp: i64,
}

impl BackendConfig {
    pub fn new(network: impl Into<String>, avax_asset_id: Id) -> Self {
        Self {
            blockchain: "Avalanche".to_owned(),
            network: network.into(),
            avax_asset_id,
            genesis_timestamp: DEFAULT_GENESIS_TIMESTAMP,
        }
    }
}

pub struct Backend {
    config: BackendConfig,
    rpc: Arc<dyn PChainRpc>,
    parser: BlockParser,
    ctx: ConstructionContext,
    genesis: ParsedGenesisBlock,
}

impl Backend {
    /// Resolves all static state. Any failure is returned wrapped in
    /// [`CoreError::Init`] naming the step that failed.
    pub async fn initialize(
        rpc: Arc<dyn PChainRpc>,
        genesis_source: &dyn GenesisSource,
        config: BackendConfig,
    ) -> Result<Self, CoreError> {
        let hrp = hrp_for_network(&config.network).map_err(CoreError::init("resolving address prefix"))?;

        let c_chain = rpc
            .get_blockchain_id(C_CHAIN_ALIAS)
            .await
            .map_err(CoreError::init("resolving chain aliases"))?;
        let x_chain = rpc
            .get_blockchain_id(X_CHAIN_ALIAS)
            .await
            .map_err(CoreError::init("resolving chain aliases"))?;
        let network_id = rpc
            .get_network_id()
            .await
            .map_err(CoreError::init("fetching network id"))?;

        let parser = BlockParser::with_genesis_timestamp(rpc.clone(), config.genesis_timestamp);
        let genesis = resolve_genesis(&parser, genesis_source, network_id)
            .await
            .map_err(CoreError::init("resolving genesis"))?;

        info!(
            network = %config.network,
            network_id,
            hrp,
            c_chain = %c_chain,
            x_chain = %x_chain,
            genesis = %genesis.block.block_id,
            "backend initialized"
        );

        Ok(Self {
            ctx: ConstructionContext {
                hrp: hrp.to_owned(),
                network_id,
                asset_id: config.avax_asset_id,
                aliases: ChainAliases::new(c_chain, x_chain),
            },
            config,
            rpc,
            parser,
            genesis,
        })
    }

    pub fn network_identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: self.config.blockchain.clone(),
            network: self.config.network.clone(),
            sub_network_identifier: Some(SubNetworkIdentifier {
                network: P_CHAIN_ALIAS.to_owned(),
            }),
        }
    }

    /// Whether a request addressed to `network` belongs to this backend.
    pub fn should_handle(&self, network: &NetworkIdentifier) -> bool {
        network.network == self.config.network
            && network
                .sub_network_identifier
                .as_ref()
                .is_some_and(|sub| sub.network == P_CHAIN_ALIAS)
    }

    pub fn genesis(&self) -> &ParsedGenesisBlock {
        &self.genesis
    }

    fn genesis_identifier(&self) -> BlockIdentifier {
        BlockIdentifier {
            index: 0,
            hash: self.genesis.block.block_id.to_string(),
        }
    }

    fn mapper(&self) -> TxMapper<'_> {
        TxMapper::new(
            &self.ctx.hrp,
            self.ctx.asset_id,
            &self.ctx.aliases,
            MappingMode::Block,
        )
    }

    // ==========================================================================
    // Network
    // ==========================================================================

    pub fn network_list(&self) -> NetworkListResponse {
        NetworkListResponse {
            network_identifiers: vec![self.network_identifier()],
        }
    }

    pub async fn network_status(&self) -> Result<NetworkStatusResponse, CoreError> {
        let current = self.parser.parse_current_block().await?;
        Ok(NetworkStatusResponse {
            current_block_identifier: BlockIdentifier {
                index: current.height,
                hash: current.block_id.to_string(),
            },
            current_block_timestamp: current.timestamp_ms,
            genesis_block_identifier: self.genesis_identifier(),
            peers: Vec::new(),
        })
    }

    // ==========================================================================
    // Blocks
    // ==========================================================================

    /// A height of 0 paired with any other block's hash is not found.
    fn is_genesis(&self, identifier: &PartialBlockIdentifier) -> Result<bool, CoreError> {
        let genesis_id = self.genesis.block.block_id;
        match (identifier.index, identifier.hash.as_deref()) {
            (Some(0), None) => Ok(true),
            (Some(0), Some(hash)) => {
                if hash.parse::<Id>()? == genesis_id {
                    Ok(true)
                } else {
                    Err(CoreError::BlockNotFound(format!("{hash} at height 0")))
                }
            }
            (None, Some(hash)) => Ok(hash.parse::<Id>()? == genesis_id),
            _ => Ok(false),
        }
    }

    /// Block by height, by hash, or the current block when neither is given.
    pub async fn block(&self, identifier: &PartialBlockIdentifier) -> Result<Block, CoreError> {
        if self.is_genesis(identifier)? {
            return self.mapper().map_genesis_block(&self.genesis);
        }

        let block = match (identifier.index, identifier.hash.as_deref()) {
            (Some(height), _) => self.parser.parse_block_at_height(height).await?,
            (None, Some(hash)) => self.parser.parse_block_with_hash(&hash.parse()?).await?,
            (None, None) => self.parser.parse_current_block().await?,
        };
        if let Some(hash) = identifier.hash.as_deref() {
            let requested: Id = hash.parse()?;
            if requested != block.block_id && requested != block.container_id {
                return Err(CoreError::BlockNotFound(format!(
                    "{hash} at height {}",
                    block.height
                )));
            }
        }

        let accounts = resolve_input_accounts(
            self.rpc.as_ref(),
            &block.transactions,
            Some(&self.genesis),
            &self.ctx.aliases,
            &self.ctx.hrp,
        )
        .await?;
        debug!(
            height = block.height,
            accounts = accounts.len(),
            "resolved input accounts"
        );
        self.mapper().map_block(&block, &accounts)
    }

    pub async fn block_transaction(
        &self,
        request: &BlockTransactionRequest,
    ) -> Result<BlockTransactionResponse, CoreError> {
        let block_id: Id = request.block_identifier.hash.parse()?;
        let tx_id: Id = request.transaction_identifier.hash.parse()?;

        if block_id == self.genesis.block.block_id {
            let block = self.mapper().map_genesis_block(&self.genesis)?;
            return block
                .transactions
                .into_iter()
                .find(|tx| tx.transaction_identifier.hash == request.transaction_identifier.hash)
                .map(|transaction| BlockTransactionResponse { transaction })
                .ok_or(CoreError::TxNotInBlock {
                    tx: tx_id,
                    block: block_id,
                });
        }

        let block = self.parser.parse_block_with_hash(&block_id).await?;
        let tx = block
            .transactions
            .iter()
            .find(|tx| tx.id() == tx_id)
            .ok_or(CoreError::TxNotInBlock {
                tx: tx_id,
                block: block_id,
            })?;

        let accounts = resolve_input_accounts(
            self.rpc.as_ref(),
            std::slice::from_ref(tx),
            Some(&self.genesis),
            &self.ctx.aliases,
            &self.ctx.hrp,
        )
        .await?;
        Ok(BlockTransactionResponse {
            transaction: self.mapper().map_transaction(tx, &accounts)?,
        })
    }

    // ==========================================================================
    // Construction
    // ==========================================================================

    pub fn construction_derive(
        &self,
        request: &ConstructionDeriveRequest,
    ) -> Result<ConstructionDeriveResponse, CoreError> {
        Ok(ConstructionDeriveResponse {
            account_identifier: construction::derive(&self.ctx, &request.public_key)?,
        })
    }

    pub fn construction_preprocess(
        &self,
        request: &ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, CoreError> {
        let (options, required_public_keys) =
            construction::preprocess(&self.ctx, &request.operations, &request.metadata)?;
        Ok(ConstructionPreprocessResponse {
            options: to_value(&options)?,
            required_public_keys,
        })
    }

    pub async fn construction_metadata(
        &self,
        request: &ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, CoreError> {
        let options: PreprocessOptions = from_value(&request.options)?;
        let metadata = construction::metadata(&self.ctx, self.rpc.as_ref(), &options).await?;
        Ok(ConstructionMetadataResponse {
            suggested_fee: vec![Amount::avax_credit(metadata.fee)],
            metadata: to_value(&metadata)?,
        })
    }

    pub fn construction_payloads(
        &self,
        request: &ConstructionPayloadsRequest,
    ) -> Result<ConstructionPayloadsResponse, CoreError> {
        let metadata: ConstructionMetadata = from_value(&request.metadata)?;
        let (envelope, payloads) =
            construction::payloads(&self.ctx, &request.operations, &metadata)?;
        Ok(ConstructionPayloadsResponse {
            unsigned_transaction: envelope.to_json()?,
            payloads,
        })
    }

    pub fn construction_parse(
        &self,
        request: &ConstructionParseRequest,
    ) -> Result<ConstructionParseResponse, CoreError> {
        let parsed = construction::parse(&self.ctx, request.signed, &request.transaction)?;
        Ok(ConstructionParseResponse {
            operations: parsed.operations,
            account_identifier_signers: parsed.signers,
            metadata: parsed.metadata,
        })
    }

    pub fn construction_combine(
        &self,
        request: &ConstructionCombineRequest,
    ) -> Result<ConstructionCombineResponse, CoreError> {
        let signed = construction::combine(&request.unsigned_transaction, &request.signatures)?;
        Ok(ConstructionCombineResponse {
            signed_transaction: signed.to_json()?,
        })
    }

    pub fn construction_hash(
        &self,
        request: &ConstructionHashRequest,
    ) -> Result<TransactionIdentifierResponse, CoreError> {
        let tx_id = construction::hash(&request.signed_transaction)?;
        Ok(transaction_identifier(tx_id))
    }

    pub async fn construction_submit(
        &self,
        request: &ConstructionSubmitRequest,
    ) -> Result<TransactionIdentifierResponse, CoreError> {
        let tx_id = construction::submit(self.rpc.as_ref(), &request.signed_transaction).await?;
        Ok(transaction_identifier(tx_id))
    }
}

fn transaction_identifier(tx_id: Id) -> TransactionIdentifierResponse {
    TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier {
            hash: tx_id.to_string(),
        },
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(value).map_err(|e| ConstructionError::InvalidMetadata(e.to_string()).into())
}

fn from_value<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, CoreError> {
    T::deserialize(value).map_err(|e| ConstructionError::InvalidMetadata(e.to_string()).into())
}
