pub mod banner;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod seed;
pub mod services;
pub mod state;

pub use banner::print_banner;
pub use config::{Config, Environment};
pub use db::create_pool;
pub use error::{AppError, AppResult};
pub use services::SettingsService;
pub use state::AppState;

/// Run the ingestion and notification loops until Ctrl-C.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_path)?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    seed::seed_feed_sources(&pool).await?;

    let settings = SettingsService::new(&config).await?;
    let state = AppState::new(pool, config, settings).await?;

    state.scheduler.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    state.scheduler.shutdown().await;
    state.db.close().await;

    Ok(())
}
