//! Block retrieval through the P-chain block index.
//!
//! The indexer does not store genesis: the block at height `h` lives at
//! index `h - 1`. Genesis is served by the [`crate::genesis`] resolver.
//!
//! The index keys containers by the hash of the stored bytes. For
//! proposer-wrapped blocks that is the envelope, not the inner block whose
//! hash is reported as the block id. Inner ids of recently parsed blocks are
//! remembered so they can be looked up again.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::block::{decode_block, ParsedBlock, DEFAULT_GENESIS_TIMESTAMP};
use crate::error::CoreError;
use crate::ids::Id;
use crate::rpc::PChainRpc;

const RECENT_BLOCKS: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(n) => n,
    None => panic!("recent block capacity must be non-zero"),
};

#[derive(Clone)]
pub struct BlockParser {
    rpc: Arc<dyn PChainRpc>,
    genesis_timestamp: i64,
    /// Inner block id to height, for blocks whose container id differs.
    recent: Arc<Mutex<LruCache<Id, u64>>>,
}

impl BlockParser {
    pub fn new(rpc: Arc<dyn PChainRpc>) -> Self {
        Self::with_genesis_timestamp(rpc, DEFAULT_GENESIS_TIMESTAMP)
    }

    /// `genesis_timestamp` is the floor, in Unix seconds, for blocks that
    /// carry no timestamp of their own.
    pub fn with_genesis_timestamp(rpc: Arc<dyn PChainRpc>, genesis_timestamp: i64) -> Self {
        Self {
            rpc,
            genesis_timestamp,
            recent: Arc::new(Mutex::new(LruCache::new(RECENT_BLOCKS))),
        }
    }

    async fn remember(&self, block: &ParsedBlock) {
        if block.container_id != block.block_id {
            self.recent.lock().await.put(block.block_id, block.height);
        }
    }

    pub fn genesis_timestamp(&self) -> i64 {
        self.genesis_timestamp
    }

    pub async fn platform_height(&self) -> Result<u64, CoreError> {
        self.rpc.get_height().await
    }

    pub async fn parse_current_block(&self) -> Result<ParsedBlock, CoreError> {
        let height = self.platform_height().await?;
        self.parse_block_at_height(height).await
    }

    pub async fn parse_block_at_height(&self, height: u64) -> Result<ParsedBlock, CoreError> {
        let index = height.checked_sub(1).ok_or(CoreError::GenesisNotIndexed)?;
        let container = self.rpc.get_container_by_index(index).await?;
        let block = decode_block(&container.bytes, self.genesis_timestamp)?;
        self.remember(&block).await;
        debug!(
            height,
            block_id = %block.block_id,
            block_type = %block.block_type,
            txs = block.transactions.len(),
            "parsed block"
        );
        Ok(block)
    }

    /// Block by container id, or by the inner id of a recently parsed
    /// proposer-wrapped block.
    pub async fn parse_block_with_hash(&self, block_id: &Id) -> Result<ParsedBlock, CoreError> {
        let container = match self.rpc.get_container_by_id(block_id).await {
            Ok(container) => container,
            Err(CoreError::BlockNotFound(missing)) => {
                let height = self.recent.lock().await.get(block_id).copied();
                let Some(height) = height else {
                    return Err(CoreError::BlockNotFound(missing));
                };
                debug!(%block_id, height, "inner block id resolved through recent blocks");
                let block = self.parse_block_at_height(height).await?;
                if block.block_id != *block_id {
                    return Err(CoreError::BlockNotFound(missing));
                }
                return Ok(block);
            }
            Err(err) => return Err(err),
        };
        let block = decode_block(&container.bytes, self.genesis_timestamp)?;
        self.remember(&block).await;
        debug!(
            height = block.height,
            block_id = %block.block_id,
            block_type = %block.block_type,
            "parsed block by id"
        );
        Ok(block)
    }
}
