use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use committee::committee::Committee;
use committee::config::{CommitteeConfig, StorageConfig};
use committee::custom_validation::AcceptAll;
use committee::hash_workers::PedersenHashWorkers;
use committee_gateway_client::AvailabilityGatewayClient;
use committee_storage::map_storage::MapStorage;
use committee_storage::storage_trait::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// StarkEx data-availability committee member.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = CommitteeConfig::load(&args.config_file)?;
    let private_key = config.load_private_key()?;

    info!("Using {} as an availability gateway", config.availability_gw_endpoint);
    info!("Using {} hashing workers", config.hash_workers);

    let availability_gateway = AvailabilityGatewayClient::new(
        config.availability_gw_endpoint.clone(),
        config.certificates_path.as_deref(),
    )?;
    let storage: Arc<dyn Storage> = match config.storage {
        StorageConfig::InMemory => Arc::new(MapStorage::new()),
    };
    let hasher = Arc::new(PedersenHashWorkers::new(config.hash_workers));

    let committee = Committee::new(
        &config,
        &private_key,
        storage.clone(),
        storage,
        hasher,
        Arc::new(availability_gateway),
        Arc::new(AcceptAll),
    )?;

    let stop_signal = committee.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested; the current iteration will finish first.");
            stop_signal.stop();
        }
    });

    committee.run().await?;
    Ok(())
}
