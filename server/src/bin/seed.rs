use anyhow::Result;
use clap::Parser;
use log::info;

use common::Config;
use tracker_server::seed::{self, DEFAULT_COUNT};
use tracker_server::Storage;

/// Replaces every incident with randomly generated sample data.
#[derive(Parser)]
#[command(name = "tracker-seed")]
struct Args {
    #[arg(long)]
    config: Option<String>,
    /// Number of incidents to insert.
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;

    println!("Starting seed...");
    let storage = Storage::new(&config.storage.database_url, config.storage.max_connections).await?;
    info!("Seeding {} at {}", args.count, config.storage.database_url);

    let incidents = seed::generate(&mut rand::thread_rng(), args.count, chrono::Utc::now());
    let inserted = storage.replace_all(&incidents).await?;

    println!("Seeded {} incidents successfully!", inserted);
    Ok(())
}
