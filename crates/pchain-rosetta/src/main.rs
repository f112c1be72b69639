mod cli;
mod server;

use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, WrapErr};

use pchain_core::{Backend, BackendConfig, FileGenesisSource, HttpPChainClient, PChainRpc};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let config = BackendConfig {
        genesis_timestamp: args.genesis_timestamp,
        ..BackendConfig::new(args.network.clone(), args.avax_asset_id()?)
    };

    let rpc: Arc<dyn PChainRpc> = Arc::new(
        HttpPChainClient::new(&args.rpc_url, args.indexer_url(), args.rate_limit)
            .wrap_err("configure node RPC client")?,
    );
    let genesis = FileGenesisSource::new(&args.genesis_file);

    // Resolves chain aliases, network id and genesis. Any failure aborts startup.
    let backend = Backend::initialize(rpc, &genesis, config)
        .await
        .map_err(|err| {
            let message = format_init_error(&args.rpc_url, &err.to_string());
            eyre!(message).wrap_err("while initializing the P-chain backend")
        })?;

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let router = server::build_router(server::AppState {
        backend: Arc::new(backend),
    });

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0; it is accessible from the network");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!(network = %args.network, "listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run HTTP server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn format_init_error(rpc_url: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not initialize against node `{rpc_url}`"),
        format!("error: {source_error}"),
    ];

    if source_error.contains("dns error") || source_error.contains("Connection refused") {
        lines.push("hint: node is unreachable; verify --rpc-url and that avalanchego is running".into());
    } else if source_error.contains("genesis") {
        lines.push(
            "hint: verify --genesis-file holds this network's genesis bytes as checksummed hex"
                .into(),
        );
    } else if source_error.contains("address prefix") {
        lines.push("hint: --network must be one of Mainnet, Fuji or Local".into());
    } else if source_error.contains("404") || source_error.contains("no container") {
        lines.push(
            "hint: the block index may be disabled; start avalanchego with --index-enabled".into(),
        );
    }

    lines.join("\n")
}
