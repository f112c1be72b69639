use crate::ids::Id;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("RPC communication failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("transaction not found: {0}")]
    TxNotFound(Id),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transaction {tx} not found in block {block}")]
    TxNotInBlock { tx: Id, block: Id },

    #[error("genesis block is not indexed; resolve it through the genesis resolver")]
    GenesisNotIndexed,

    #[error("no genesis configuration for network id {0}")]
    MissingGenesis(u32),

    #[error("backend initialization failed while {stage}: {source}")]
    Init {
        stage: &'static str,
        #[source]
        source: Box<CoreError>,
    },

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn init(stage: &'static str) -> impl FnOnce(CoreError) -> CoreError {
        move |source| CoreError::Init {
            stage,
            source: Box::new(source),
        }
    }
}

/// Structured RPC error for the node and indexer collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON-RPC server error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid JSON-RPC response: {0}")]
    InvalidResponse(String),
}

/// Malformed or unrecognized bytes. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input reading {what} at offset {offset} (need {needed} bytes)")]
    UnexpectedEof {
        what: &'static str,
        offset: usize,
        needed: usize,
    },

    #[error("unsupported codec version {0}")]
    UnsupportedCodecVersion(u16),

    #[error("unsupported block type {0}")]
    UnsupportedBlockType(u32),

    #[error("unsupported transaction type {0}")]
    UnsupportedTxType(u32),

    #[error("unknown type id {type_id} for {what}")]
    UnknownTypeId { what: &'static str, type_id: u32 },

    #[error("{remaining} trailing bytes after {what}")]
    TrailingBytes { what: &'static str, remaining: usize },

    #[error("invalid utf-8 string in {0}")]
    InvalidString(&'static str),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("{what} length {len} does not fit its length prefix")]
    LengthOverflow { what: &'static str, len: usize },
}

/// Failures of the construction pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("no operations supplied")]
    EmptyOperations,

    #[error("operations mix transaction types {first} and {other}")]
    MixedOperationTypes { first: String, other: String },

    #[error("unsupported operation type {0}")]
    UnsupportedOperationType(String),

    #[error("invalid operation {index}: {reason}")]
    InvalidOperation { index: usize, reason: String },

    #[error("missing metadata field {0}")]
    MissingMetadata(&'static str),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("coin {0} not found among the owners' UTXOs")]
    CoinNotFound(String),

    #[error("coin {coin} requires {threshold} signatures but only {available} signer(s) own it")]
    InsufficientSigners {
        coin: String,
        threshold: u32,
        available: usize,
    },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid transaction envelope: {0}")]
    InvalidEnvelope(String),

    #[error("expected {expected} signatures, received {received}")]
    SignatureCountMismatch { expected: usize, received: usize },

    #[error("signature {index} is for {received}, expected signer {expected}")]
    SignatureOrderMismatch {
        index: usize,
        expected: String,
        received: String,
    },

    #[error("signature {index} does not recover to signer {signer}")]
    InvalidSignature { index: usize, signer: String },
}
