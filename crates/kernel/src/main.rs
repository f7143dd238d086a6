//! ModHub admin jobs.
//!
//! Runs the tag reconciliation job and the game-version gradient recompute
//! against the configured database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use modhub_kernel::config::Config;
use modhub_kernel::db;
use modhub_kernel::services::tag_sync::SyncService;
use modhub_kernel::services::taxonomy::TaxonomyService;

#[derive(Parser)]
#[command(name = "modhub", about = "ModHub kernel admin jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile tags and links against the current set of mods.
    Sync,
    /// Recompute the game-version color gradient.
    Recolor,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    let pool = db::create_pool(&config)
        .await
        .context("failed to connect to database")?;

    let taxonomy = TaxonomyService::new(pool.clone());

    match cli.command {
        Command::Sync => {
            let sync = SyncService::new(pool, taxonomy);
            let report = sync.sync_all_tags().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Recolor => {
            let updates = taxonomy.recalculate_game_version_colors().await?;
            info!(updated = updates.len(), "gradient recompute complete");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
