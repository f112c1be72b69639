//! Core of a Rosetta adapter for the Avalanche P-chain.
//!
//! Decodes indexed blocks and transactions, maps them onto Rosetta
//! operations, and drives the construction flow that builds, signs and
//! broadcasts new transactions. Node access goes through [`PChainRpc`].

pub mod backend;
pub mod block;
pub mod codec;
pub mod construction;
pub mod error;
pub mod genesis;
pub mod ids;
pub mod indexer;
pub mod mapper;
pub mod rosetta;
pub mod rpc;
pub mod txs;

#[cfg(test)]
mod test_util;

pub use backend::{Backend, BackendConfig};
pub use error::{ConstructionError, CoreError, DecodeError, RpcError};
pub use genesis::{FileGenesisSource, GenesisSource, StaticGenesisSource};
pub use ids::Id;
pub use rpc::{HttpPChainClient, PChainRpc};
