use std::path::PathBuf;

use clap::Parser;
use eyre::{eyre, WrapErr};

use pchain_core::Id;

const MAINNET_AVAX_ASSET_ID: &str = "FvwEAhmxKfeiG8SnEvq42hc6whRyY3EFYAvebMqDNDGCgxN5Z";
const FUJI_AVAX_ASSET_ID: &str = "U8iRqJoiJm8xZHAacmvYyZVwqQx6uDNtQeP3CQ6fcgQk3JqnK";

/// pchain-rosetta: Rosetta API server for the Avalanche P-chain.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// AvalancheGo node URL serving the `info` and `platform` APIs.
    #[arg(long, default_value = "http://127.0.0.1:9650", env = "PCHAIN_ROSETTA_RPC_URL")]
    pub rpc_url: String,

    /// Node URL serving the P-chain block index. Defaults to `--rpc-url`.
    #[arg(long, env = "PCHAIN_ROSETTA_INDEXER_URL")]
    pub indexer_url: Option<String>,

    /// Network name: Mainnet, Fuji or Local.
    #[arg(long, default_value = "Fuji", env = "PCHAIN_ROSETTA_NETWORK")]
    pub network: String,

    /// File holding the network's genesis bytes as checksummed hex.
    #[arg(long, env = "PCHAIN_ROSETTA_GENESIS_FILE")]
    pub genesis_file: PathBuf,

    /// Timestamp floor (unix seconds) for blocks that carry no time of their own.
    #[arg(long, default_value_t = pchain_core::block::DEFAULT_GENESIS_TIMESTAMP, env = "PCHAIN_ROSETTA_GENESIS_TIMESTAMP")]
    pub genesis_timestamp: i64,

    /// AVAX asset id (cb58). Known for Mainnet and Fuji; required otherwise.
    #[arg(long, env = "PCHAIN_ROSETTA_AVAX_ASSET_ID")]
    pub avax_asset_id: Option<String>,

    /// Address to bind the server to.
    #[arg(long, default_value = "127.0.0.1", env = "PCHAIN_ROSETTA_BIND")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "8080", env = "PCHAIN_ROSETTA_PORT")]
    pub port: u16,

    /// Maximum outbound node requests per second. Unlimited if omitted.
    #[arg(long, env = "PCHAIN_ROSETTA_RATE_LIMIT")]
    pub rate_limit: Option<u32>,
}

impl Cli {
    pub fn indexer_url(&self) -> &str {
        self.indexer_url.as_deref().unwrap_or(&self.rpc_url)
    }

    pub fn avax_asset_id(&self) -> eyre::Result<Id> {
        let raw = match (&self.avax_asset_id, self.network.to_ascii_lowercase().as_str()) {
            (Some(explicit), _) => explicit.as_str(),
            (None, "mainnet") => MAINNET_AVAX_ASSET_ID,
            (None, "fuji") => FUJI_AVAX_ASSET_ID,
            (None, other) => {
                return Err(eyre!(
                    "no default AVAX asset id for network `{other}`; pass --avax-asset-id"
                ))
            }
        };
        raw.parse()
            .wrap_err_with(|| format!("invalid AVAX asset id `{raw}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["pchain-rosetta", "--genesis-file", "genesis.hex"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments must parse")
    }

    #[test]
    fn indexer_defaults_to_node_url() {
        let cli = parse(&["--rpc-url", "http://node:9650"]);
        assert_eq!(cli.indexer_url(), "http://node:9650");

        let cli = parse(&["--indexer-url", "http://indexer:9650"]);
        assert_eq!(cli.indexer_url(), "http://indexer:9650");
    }

    #[test]
    fn asset_id_defaults_by_network() {
        let fuji = parse(&[]).avax_asset_id().expect("fuji has a default");
        assert_eq!(fuji.to_string(), FUJI_AVAX_ASSET_ID);

        let mainnet = parse(&["--network", "Mainnet"])
            .avax_asset_id()
            .expect("mainnet has a default");
        assert_eq!(mainnet.to_string(), MAINNET_AVAX_ASSET_ID);

        assert!(parse(&["--network", "Local"]).avax_asset_id().is_err());
    }
}
