use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atlasfs_core::rpc::HttpStorageRpc;
use atlasfs_naming::config::Cli;
use atlasfs_naming::server;
use atlasfs_naming::service::NamingService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.naming_config();
    let rpc = Arc::new(HttpStorageRpc::new());
    // Until a storage node registers, paths fall back to the registration
    // port as their bootstrap replica source.
    let service = Arc::new(NamingService::new(config.registration_port, rpc));

    server::serve(service, &config).await
}
