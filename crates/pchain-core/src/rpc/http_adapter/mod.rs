//! Native JSON-RPC client for avalanchego endpoints.
//!
//! Implements [`PChainRpc`](super::PChainRpc) over JSON-RPC using `reqwest`
//! against the node's `info` and `platform` APIs and the P-chain block index,
//! with optional outbound rate limiting.

mod client;
mod connection;
mod parsing;
mod protocol;

pub use client::HttpPChainClient;
