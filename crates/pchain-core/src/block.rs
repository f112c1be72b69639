//! Block decoding: proposer envelope unwrapping, the nine stateless block
//! variants of the Apricot and Banff eras, and timestamp resolution.

use serde::Serialize;

use crate::codec::{Decode, Encode, Packer, Unpacker};
use crate::error::DecodeError;
use crate::ids::{hash160, Id, NodeId};
use crate::txs::{Tx, UnsignedTx};

/// Mainnet genesis time (2020-09-10T00:00:00Z) in Unix seconds. Used as the
/// timestamp floor when a network does not configure its own.
pub const DEFAULT_GENESIS_TIMESTAMP: i64 = 1_599_696_000;

const SIGNED_ENVELOPE_TYPE_ID: u32 = 0;
const OPTION_ENVELOPE_TYPE_ID: u32 = 1;

pub const APRICOT_PROPOSAL_BLOCK_TYPE_ID: u32 = 0;
pub const APRICOT_ABORT_BLOCK_TYPE_ID: u32 = 1;
pub const APRICOT_COMMIT_BLOCK_TYPE_ID: u32 = 2;
pub const APRICOT_STANDARD_BLOCK_TYPE_ID: u32 = 3;
pub const APRICOT_ATOMIC_BLOCK_TYPE_ID: u32 = 4;
pub const BANFF_PROPOSAL_BLOCK_TYPE_ID: u32 = 29;
pub const BANFF_ABORT_BLOCK_TYPE_ID: u32 = 30;
pub const BANFF_COMMIT_BLOCK_TYPE_ID: u32 = 31;
pub const BANFF_STANDARD_BLOCK_TYPE_ID: u32 = 32;

// ==============================================================================
// Parsed Model
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockType {
    ApricotProposal,
    BanffProposal,
    ApricotAtomic,
    ApricotStandard,
    BanffStandard,
    ApricotAbort,
    BanffAbort,
    ApricotCommit,
    BanffCommit,
    Genesis,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ApricotProposal => "ApricotProposalBlock",
            Self::BanffProposal => "BanffProposalBlock",
            Self::ApricotAtomic => "ApricotAtomicBlock",
            Self::ApricotStandard => "ApricotStandardBlock",
            Self::BanffStandard => "BanffStandardBlock",
            Self::ApricotAbort => "ApricotAbortBlock",
            Self::BanffAbort => "BanffAbortBlock",
            Self::ApricotCommit => "ApricotCommitBlock",
            Self::BanffCommit => "BanffCommitBlock",
            Self::Genesis => "GenesisBlock",
        };
        f.write_str(name)
    }
}

/// Identity of the proposer that wrapped a block.
///
/// All-zero when the block was not wrapped in a signed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Proposer {
    pub id: Id,
    pub node_id: NodeId,
    pub p_chain_height: u64,
    /// Unix seconds.
    pub timestamp: i64,
    pub parent_id: Id,
}

impl Proposer {
    pub fn is_present(&self) -> bool {
        *self != Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub height: u64,
    /// Hash of the inner block.
    pub block_id: Id,
    /// Hash of the bytes as indexed. Differs from `block_id` when the block
    /// came wrapped in a proposer envelope.
    pub container_id: Id,
    pub parent_id: Id,
    pub block_type: BlockType,
    pub timestamp_ms: i64,
    pub proposer: Proposer,
    pub transactions: Vec<Tx>,
}

// ==============================================================================
// Stateless Blocks
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatelessBlock {
    ApricotProposal {
        parent_id: Id,
        height: u64,
        tx: Tx,
    },
    ApricotAbort {
        parent_id: Id,
        height: u64,
    },
    ApricotCommit {
        parent_id: Id,
        height: u64,
    },
    ApricotStandard {
        parent_id: Id,
        height: u64,
        transactions: Vec<Tx>,
    },
    ApricotAtomic {
        parent_id: Id,
        height: u64,
        tx: Tx,
    },
    BanffProposal {
        time: u64,
        transactions: Vec<Tx>,
        parent_id: Id,
        height: u64,
        tx: Tx,
    },
    BanffAbort {
        time: u64,
        parent_id: Id,
        height: u64,
    },
    BanffCommit {
        time: u64,
        parent_id: Id,
        height: u64,
    },
    BanffStandard {
        time: u64,
        parent_id: Id,
        height: u64,
        transactions: Vec<Tx>,
    },
}

impl StatelessBlock {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        crate::codec::from_bytes(bytes, "block")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::to_bytes(self)
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Self::ApricotProposal { .. } => BlockType::ApricotProposal,
            Self::ApricotAbort { .. } => BlockType::ApricotAbort,
            Self::ApricotCommit { .. } => BlockType::ApricotCommit,
            Self::ApricotStandard { .. } => BlockType::ApricotStandard,
            Self::ApricotAtomic { .. } => BlockType::ApricotAtomic,
            Self::BanffProposal { .. } => BlockType::BanffProposal,
            Self::BanffAbort { .. } => BlockType::BanffAbort,
            Self::BanffCommit { .. } => BlockType::BanffCommit,
            Self::BanffStandard { .. } => BlockType::BanffStandard,
        }
    }

    fn type_id(&self) -> u32 {
        match self {
            Self::ApricotProposal { .. } => APRICOT_PROPOSAL_BLOCK_TYPE_ID,
            Self::ApricotAbort { .. } => APRICOT_ABORT_BLOCK_TYPE_ID,
            Self::ApricotCommit { .. } => APRICOT_COMMIT_BLOCK_TYPE_ID,
            Self::ApricotStandard { .. } => APRICOT_STANDARD_BLOCK_TYPE_ID,
            Self::ApricotAtomic { .. } => APRICOT_ATOMIC_BLOCK_TYPE_ID,
            Self::BanffProposal { .. } => BANFF_PROPOSAL_BLOCK_TYPE_ID,
            Self::BanffAbort { .. } => BANFF_ABORT_BLOCK_TYPE_ID,
            Self::BanffCommit { .. } => BANFF_COMMIT_BLOCK_TYPE_ID,
            Self::BanffStandard { .. } => BANFF_STANDARD_BLOCK_TYPE_ID,
        }
    }

    pub fn parent_id(&self) -> Id {
        match self {
            Self::ApricotProposal { parent_id, .. }
            | Self::ApricotAbort { parent_id, .. }
            | Self::ApricotCommit { parent_id, .. }
            | Self::ApricotStandard { parent_id, .. }
            | Self::ApricotAtomic { parent_id, .. }
            | Self::BanffProposal { parent_id, .. }
            | Self::BanffAbort { parent_id, .. }
            | Self::BanffCommit { parent_id, .. }
            | Self::BanffStandard { parent_id, .. } => *parent_id,
        }
    }

    pub fn height(&self) -> u64 {
        match self {
            Self::ApricotProposal { height, .. }
            | Self::ApricotAbort { height, .. }
            | Self::ApricotCommit { height, .. }
            | Self::ApricotStandard { height, .. }
            | Self::ApricotAtomic { height, .. }
            | Self::BanffProposal { height, .. }
            | Self::BanffAbort { height, .. }
            | Self::BanffCommit { height, .. }
            | Self::BanffStandard { height, .. } => *height,
        }
    }

    /// Timestamp carried by the block itself, in Unix seconds.
    ///
    /// Banff blocks store it directly; an Apricot proposal block only has
    /// one when its proposal is an advance-time transaction.
    pub fn explicit_timestamp(&self) -> Option<u64> {
        match self {
            Self::BanffProposal { time, .. }
            | Self::BanffAbort { time, .. }
            | Self::BanffCommit { time, .. }
            | Self::BanffStandard { time, .. } => Some(*time),
            Self::ApricotProposal { tx, .. } => match &tx.unsigned {
                UnsignedTx::AdvanceTime(advance) => Some(advance.time),
                _ => None,
            },
            Self::ApricotAbort { .. }
            | Self::ApricotCommit { .. }
            | Self::ApricotStandard { .. }
            | Self::ApricotAtomic { .. } => None,
        }
    }

    /// Child transactions. A Banff proposal lists its proposal transaction
    /// ahead of the trailing batch.
    pub fn into_transactions(self) -> Vec<Tx> {
        match self {
            Self::ApricotProposal { tx, .. } | Self::ApricotAtomic { tx, .. } => vec![tx],
            Self::BanffProposal {
                tx, transactions, ..
            } => std::iter::once(tx).chain(transactions).collect(),
            Self::ApricotStandard { transactions, .. }
            | Self::BanffStandard { transactions, .. } => transactions,
            Self::ApricotAbort { .. }
            | Self::ApricotCommit { .. }
            | Self::BanffAbort { .. }
            | Self::BanffCommit { .. } => Vec::new(),
        }
    }
}

impl Encode for StatelessBlock {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(self.type_id());
        match self {
            Self::ApricotProposal {
                parent_id,
                height,
                tx,
            }
            | Self::ApricotAtomic {
                parent_id,
                height,
                tx,
            } => {
                packer.id(parent_id);
                packer.u64(*height);
                tx.encode(packer);
            }
            Self::ApricotAbort { parent_id, height } | Self::ApricotCommit { parent_id, height } => {
                packer.id(parent_id);
                packer.u64(*height);
            }
            Self::ApricotStandard {
                parent_id,
                height,
                transactions,
            } => {
                packer.id(parent_id);
                packer.u64(*height);
                packer.list(transactions);
            }
            Self::BanffProposal {
                time,
                transactions,
                parent_id,
                height,
                tx,
            } => {
                packer.u64(*time);
                packer.list(transactions);
                packer.id(parent_id);
                packer.u64(*height);
                tx.encode(packer);
            }
            Self::BanffAbort {
                time,
                parent_id,
                height,
            }
            | Self::BanffCommit {
                time,
                parent_id,
                height,
            } => {
                packer.u64(*time);
                packer.id(parent_id);
                packer.u64(*height);
            }
            Self::BanffStandard {
                time,
                parent_id,
                height,
                transactions,
            } => {
                packer.u64(*time);
                packer.id(parent_id);
                packer.u64(*height);
                packer.list(transactions);
            }
        }
    }
}

impl Decode for StatelessBlock {
    fn decode(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let block = match u.u32("block type")? {
            APRICOT_PROPOSAL_BLOCK_TYPE_ID => Self::ApricotProposal {
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
                tx: Tx::decode(u)?,
            },
            APRICOT_ABORT_BLOCK_TYPE_ID => Self::ApricotAbort {
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
            },
            APRICOT_COMMIT_BLOCK_TYPE_ID => Self::ApricotCommit {
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
            },
            APRICOT_STANDARD_BLOCK_TYPE_ID => Self::ApricotStandard {
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
                transactions: u.list("block transactions")?,
            },
            APRICOT_ATOMIC_BLOCK_TYPE_ID => Self::ApricotAtomic {
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
                tx: Tx::decode(u)?,
            },
            BANFF_PROPOSAL_BLOCK_TYPE_ID => Self::BanffProposal {
                time: u.u64("block time")?,
                transactions: u.list("block transactions")?,
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
                tx: Tx::decode(u)?,
            },
            BANFF_ABORT_BLOCK_TYPE_ID => Self::BanffAbort {
                time: u.u64("block time")?,
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
            },
            BANFF_COMMIT_BLOCK_TYPE_ID => Self::BanffCommit {
                time: u.u64("block time")?,
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
            },
            BANFF_STANDARD_BLOCK_TYPE_ID => Self::BanffStandard {
                time: u.u64("block time")?,
                parent_id: u.id("parent id")?,
                height: u.u64("height")?,
                transactions: u.list("block transactions")?,
            },
            other => return Err(DecodeError::UnsupportedBlockType(other)),
        };
        Ok(block)
    }
}

// ==============================================================================
// Proposer Envelope
// ==============================================================================

fn decode_envelope(bytes: &[u8]) -> Result<(Proposer, &[u8]), DecodeError> {
    let mut u = Unpacker::new(bytes);
    u.version()?;
    match u.u32("proposer envelope type")? {
        SIGNED_ENVELOPE_TYPE_ID => {
            let parent_id = u.id("proposer parent id")?;
            let timestamp = u.i64("proposer timestamp")?;
            let p_chain_height = u.u64("proposer p-chain height")?;
            let certificate = u.bytes("proposer certificate")?;
            let inner = u.bytes("inner block")?;
            u.bytes("proposer signature")?;
            u.finish("proposer envelope")?;

            let node_id = if certificate.is_empty() {
                NodeId::default()
            } else {
                NodeId::new(hash160(certificate))
            };
            let proposer = Proposer {
                id: Id::from_content(bytes),
                node_id,
                p_chain_height,
                timestamp,
                parent_id,
            };
            Ok((proposer, inner))
        }
        OPTION_ENVELOPE_TYPE_ID => {
            u.id("option parent id")?;
            let inner = u.bytes("inner block")?;
            u.finish("option envelope")?;
            Ok((Proposer::default(), inner))
        }
        type_id => Err(DecodeError::UnknownTypeId {
            what: "proposer envelope",
            type_id,
        }),
    }
}

/// Splits off the proposer envelope if there is one.
///
/// Bytes that do not parse as an envelope are an unwrapped inner block.
pub fn unwrap_proposer(bytes: &[u8]) -> (Proposer, &[u8]) {
    decode_envelope(bytes).unwrap_or((Proposer::default(), bytes))
}

/// Timestamp for blocks that carry none: the proposer's if it is later than
/// the genesis floor, otherwise the floor. Both in Unix seconds.
pub fn fallback_timestamp(proposer: &Proposer, genesis_timestamp: i64) -> i64 {
    if proposer.timestamp > genesis_timestamp {
        proposer.timestamp
    } else {
        genesis_timestamp
    }
}

/// Decodes container bytes as stored by the indexer.
pub fn decode_block(bytes: &[u8], genesis_timestamp: i64) -> Result<ParsedBlock, DecodeError> {
    let (proposer, inner) = unwrap_proposer(bytes);
    let block = StatelessBlock::from_bytes(inner)?;

    let timestamp = match block.explicit_timestamp() {
        Some(secs) => i64::try_from(secs).unwrap_or(i64::MAX),
        None => fallback_timestamp(&proposer, genesis_timestamp),
    };

    Ok(ParsedBlock {
        height: block.height(),
        block_id: Id::from_content(inner),
        container_id: Id::from_content(bytes),
        parent_id: block.parent_id(),
        block_type: block.block_type(),
        timestamp_ms: timestamp.saturating_mul(1000),
        proposer,
        transactions: block.into_transactions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::txs::AdvanceTimeTx;

    const GENESIS: i64 = DEFAULT_GENESIS_TIMESTAMP;

    fn all_variants() -> Vec<StatelessBlock> {
        let parent_id = Id::new([1; 32]);
        let height = 42;
        let time = 1_700_000_000;
        vec![
            StatelessBlock::ApricotProposal {
                parent_id,
                height,
                tx: reward_tx(9),
            },
            StatelessBlock::ApricotAbort { parent_id, height },
            StatelessBlock::ApricotCommit { parent_id, height },
            StatelessBlock::ApricotStandard {
                parent_id,
                height,
                transactions: vec![signed_import_tx(1), signed_import_tx(2)],
            },
            StatelessBlock::ApricotAtomic {
                parent_id,
                height,
                tx: signed_import_tx(3),
            },
            StatelessBlock::BanffProposal {
                time,
                transactions: vec![signed_import_tx(4)],
                parent_id,
                height,
                tx: reward_tx(8),
            },
            StatelessBlock::BanffAbort {
                time,
                parent_id,
                height,
            },
            StatelessBlock::BanffCommit {
                time,
                parent_id,
                height,
            },
            StatelessBlock::BanffStandard {
                time,
                parent_id,
                height,
                transactions: vec![signed_import_tx(5)],
            },
        ]
    }

    #[test]
    fn decoding_is_deterministic_for_every_variant() {
        for block in all_variants() {
            let bytes = block.to_bytes();
            let first = decode_block(&bytes, GENESIS).expect("fixture must decode");
            let second = decode_block(&bytes, GENESIS).expect("fixture must decode");
            assert_eq!(first, second, "{}", block.block_type());
            assert_eq!(first.block_id, Id::from_content(&bytes));
            assert_eq!(first.parent_id, Id::new([1; 32]));
            assert_eq!(first.height, 42);
            assert_eq!(first.block_type, block.block_type());
            assert_eq!(StatelessBlock::from_bytes(&bytes).expect("decode"), block);
        }
    }

    #[test]
    fn transactions_follow_the_variant_rule() {
        let counts: Vec<(BlockType, usize)> = all_variants()
            .into_iter()
            .map(|block| {
                let parsed = decode_block(&block.to_bytes(), GENESIS).expect("decode");
                (parsed.block_type, parsed.transactions.len())
            })
            .collect();
        assert_eq!(
            counts,
            vec![
                (BlockType::ApricotProposal, 1),
                (BlockType::ApricotAbort, 0),
                (BlockType::ApricotCommit, 0),
                (BlockType::ApricotStandard, 2),
                (BlockType::ApricotAtomic, 1),
                (BlockType::BanffProposal, 2),
                (BlockType::BanffAbort, 0),
                (BlockType::BanffCommit, 0),
                (BlockType::BanffStandard, 1),
            ]
        );
    }

    #[test]
    fn banff_proposal_lists_proposal_tx_first() {
        let proposal = reward_tx(8);
        let batch = signed_import_tx(4);
        let block = StatelessBlock::BanffProposal {
            time: 1_700_000_000,
            transactions: vec![batch.clone()],
            parent_id: Id::EMPTY,
            height: 2,
            tx: proposal.clone(),
        };
        let parsed = decode_block(&block.to_bytes(), GENESIS).expect("decode");
        assert_eq!(parsed.transactions, vec![proposal, batch]);
        assert_eq!(parsed.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn unknown_block_tag_is_named() {
        let mut bytes = vec![0, 0];
        bytes.extend_from_slice(&77u32.to_be_bytes());
        let err = decode_block(&bytes, GENESIS).expect_err("tag 77");
        assert_eq!(err, DecodeError::UnsupportedBlockType(77));
        assert_eq!(err.to_string(), "unsupported block type 77");
    }

    #[test]
    fn signed_envelope_yields_proposer() {
        let inner = StatelessBlock::ApricotCommit {
            parent_id: Id::new([3; 32]),
            height: 7,
        }
        .to_bytes();
        let cert = b"certificate".to_vec();
        let wrapped = signed_envelope(Id::new([9; 32]), 1_650_000_000, 12, &cert, &inner);

        let parsed = decode_block(&wrapped, GENESIS).expect("wrapped block must decode");
        assert_eq!(parsed.block_id, Id::from_content(&inner));
        assert_eq!(parsed.container_id, Id::from_content(&wrapped));
        assert_eq!(parsed.proposer.id, Id::from_content(&wrapped));
        assert_eq!(parsed.proposer.node_id, NodeId::new(hash160(&cert)));
        assert_eq!(parsed.proposer.p_chain_height, 12);
        assert_eq!(parsed.proposer.parent_id, Id::new([9; 32]));
        assert_eq!(parsed.timestamp_ms, 1_650_000_000_000);
    }

    #[test]
    fn option_envelope_has_no_proposer() {
        let inner = StatelessBlock::ApricotAbort {
            parent_id: Id::new([3; 32]),
            height: 7,
        }
        .to_bytes();
        let wrapped = option_envelope(Id::new([4; 32]), &inner);
        let (proposer, unwrapped) = unwrap_proposer(&wrapped);
        assert!(!proposer.is_present());
        assert_eq!(unwrapped, inner.as_slice());
    }

    #[test]
    fn unwrapped_block_is_returned_as_is() {
        for block in all_variants() {
            let bytes = block.to_bytes();
            let (proposer, inner) = unwrap_proposer(&bytes);
            assert_eq!(proposer, Proposer::default());
            assert_eq!(inner, bytes.as_slice());
        }
    }

    #[test]
    fn timestamp_falls_back_to_later_of_proposer_and_genesis() {
        let inner = StatelessBlock::ApricotStandard {
            parent_id: Id::EMPTY,
            height: 3,
            transactions: vec![],
        }
        .to_bytes();

        let early = signed_envelope(Id::EMPTY, GENESIS - 10, 1, b"c", &inner);
        let parsed = decode_block(&early, GENESIS).expect("decode");
        assert_eq!(parsed.timestamp_ms, GENESIS * 1000);

        let late = signed_envelope(Id::EMPTY, GENESIS + 10, 1, b"c", &inner);
        let parsed = decode_block(&late, GENESIS).expect("decode");
        assert_eq!(parsed.timestamp_ms, (GENESIS + 10) * 1000);

        let bare = decode_block(&inner, GENESIS).expect("decode");
        assert_eq!(bare.timestamp_ms, GENESIS * 1000);

        let custom_floor = decode_block(&inner, 1_000).expect("decode");
        assert_eq!(custom_floor.timestamp_ms, 1_000_000);
    }

    #[test]
    fn apricot_proposal_uses_advance_time() {
        let block = StatelessBlock::ApricotProposal {
            parent_id: Id::EMPTY,
            height: 5,
            tx: Tx::new(
                UnsignedTx::AdvanceTime(AdvanceTimeTx { time: 1_610_000_000 }),
                vec![],
            ),
        };
        let parsed = decode_block(&block.to_bytes(), GENESIS).expect("decode");
        assert_eq!(parsed.timestamp_ms, 1_610_000_000_000);

        let without = StatelessBlock::ApricotProposal {
            parent_id: Id::EMPTY,
            height: 5,
            tx: reward_tx(1),
        };
        let parsed = decode_block(&without.to_bytes(), GENESIS).expect("decode");
        assert_eq!(parsed.timestamp_ms, GENESIS * 1000);
    }

    #[test]
    fn truncated_block_is_a_decode_error() {
        let bytes = all_variants()[3].to_bytes();
        let err = decode_block(&bytes[..bytes.len() - 3], GENESIS).expect_err("truncated");
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }
}
