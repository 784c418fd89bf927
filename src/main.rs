use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::catalog::LocalAssetFetcher;
use gatehouse::config::Config;
use gatehouse::db::{KeyValueStore, MemoryStore, SqliteStore};
use gatehouse::session::AdminSignals;
use gatehouse::Portal;

mod cli;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config check` reports on the file itself, so it must not fail on load
    if let Some(Commands::Config(ConfigCommands::Check)) = &cli.command {
        return cli::cmd_config_check(&cli);
    }

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Gatehouse v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn KeyValueStore> = if cli.ephemeral {
        tracing::info!("Ephemeral mode: state is kept in memory only");
        Arc::new(MemoryStore::new())
    } else {
        let db = gatehouse::db::init(&config.storage.data_dir).await?;
        Arc::new(SqliteStore::new(db))
    };

    let signals = AdminSignals::from_query(cli.query.as_deref().unwrap_or_default());
    let fetcher = LocalAssetFetcher::new(
        config.catalog.assets_root.clone(),
        config.catalog.downloads_dir.clone(),
    );
    let mut portal = Portal::open(config, store, signals).await?;

    let result = cli::run_command(&cli, &mut portal, &fetcher).await;

    // Let started downloads finish before the runtime shuts down
    fetcher.settle().await;
    result
}
