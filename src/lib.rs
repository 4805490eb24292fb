pub mod bridge;
pub mod commands;
pub mod config;
pub mod detection;
pub mod events;
pub mod ledger;
pub mod models;
pub mod pause;
pub mod polling;
pub mod service;
pub mod settings;
pub mod source;
pub mod store;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;

pub use commands::{dispatch, ControlRequest, ControlResponse};
pub use config::RuntimeConfig;
pub use events::{EventBus, MonitorEvent};
pub use models::{Lead, LeadView};
pub use service::{Collaborators, LeadWatch, StatusReport};
pub use settings::{Settings, SettingsPatch};

use source::{BellNotifier, HeadlessPage, JsonFileSource, LeadSource};
use store::SqliteStore;

pub async fn run() -> Result<()> {
    let config = RuntimeConfig::from_env();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .init();

    log::info!("Leadwatch starting up...");

    let store = SqliteStore::open(config.db_path.clone())
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))?;
    let source: Arc<dyn LeadSource> = Arc::new(JsonFileSource::new(config.snapshot_path.clone()));

    let watch = LeadWatch::new(Collaborators {
        store: Arc::new(store),
        page: Arc::new(HeadlessPage::new(source.clone())),
        source,
        notifier: Arc::new(BellNotifier),
    })
    .await;

    watch.start().await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let served = tokio::select! {
        served = bridge::serve(&watch, stdin, stdout) => served,
        signal = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
            signal.context("failed to listen for ctrl-c")
        }
    };

    watch.shutdown().await?;
    log::info!("Leadwatch stopped");
    served
}
