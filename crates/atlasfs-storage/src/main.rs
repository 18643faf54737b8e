use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atlasfs_core::rpc::HttpStorageRpc;
use atlasfs_storage::config::Cli;
use atlasfs_storage::disk::LocalDisk;
use atlasfs_storage::service::StorageService;
use atlasfs_storage::{registration, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.storage_config();
    tokio::fs::create_dir_all(&config.root).await?;

    let rpc = Arc::new(HttpStorageRpc::new());
    let service = Arc::new(StorageService::new(LocalDisk::new(&config.root), rpc));

    // Both ports are bound before registering so the naming server can
    // reach this node the moment the registration lands.
    let (client_listener, command_listener) = server::bind(&config).await?;
    registration::bootstrap(&config).await;

    server::serve(service, client_listener, command_listener).await
}
