//! Table node binary: loads config, restores the curriculum snapshot, and
//! serves the coordinator HTTP API while periodically migrating completed
//! studies and saving the snapshot.

use clap::Parser;
use litetable::api::{ApiConfig, Server};
use litetable::config::TableConfig;
use litetable::curriculum::Curriculum;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "table-node")]
struct Cli {
    /// Path to the table config JSON file.
    #[arg(long, default_value = "table_config.json")]
    config: PathBuf,

    /// Address to bind the HTTP server on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    litetable::telemetry::init();
    let cli = Cli::parse();
    let config = TableConfig::load_from_file(&cli.config).unwrap_or_else(|e| {
        log::warn!("{e}, falling back to defaults");
        TableConfig::default()
    });

    let curriculum = Arc::new(Curriculum::load_or_create(&config.curriculum_path)?);
    spawn_maintenance(curriculum.clone(), config.clone());

    let api_config = ApiConfig { default_timeout_minutes: config.default_timeout_minutes };
    Server::run(curriculum, api_config, &cli.bind).await?;
    Ok(())
}

fn spawn_maintenance(curriculum: Arc<Curriculum>, config: TableConfig) {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(config.curriculum_save_period_seconds);
        loop {
            tokio::time::sleep(period).await;
            curriculum.migrate_done().await;
            if let Err(e) = curriculum.save(&config.curriculum_path).await {
                log::error!("curriculum save failed: {e}");
            }
        }
    });
}
