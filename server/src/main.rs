use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio::signal;

use common::Config;
use tracker_server::{app, AppState, Storage};

#[derive(Parser)]
#[command(name = "tracker-server", about = "Incident tracker HTTP API")]
struct Args {
    /// Config file; falls back to TRACKER_CONFIG, then ./config/default.toml.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting incident tracker API");

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;
    info!("Config loaded from {}", config_path);

    let storage = Storage::new(&config.storage.database_url, config.storage.max_connections).await?;
    info!("Storage initialized at {}", config.storage.database_url);

    let origins = config.allowed_origins();
    info!("CORS origins: {}", origins.join(", "));

    let app = app(AppState::new(storage, config.api.clone()), &origins);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Application is running on: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
