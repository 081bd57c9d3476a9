use newswire::{print_banner, Config, Environment};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner(env!("NEWSWIRE_VERSION"));

    let app_env = Environment::from_str(&env::var("APP_ENV").unwrap_or_default());
    let data_path = env::var("DATA_PATH")
        .map(Into::into)
        .unwrap_or_else(|_| app_env.default_data_path());

    let mut config = Config::new(app_env, data_path);
    if let Ok(database_url) = env::var("DATABASE_URL") {
        config = config.with_database_url(database_url);
    }

    tracing::info!(
        "Starting in {:?} mode, data at {}",
        config.env,
        config.data_path.display()
    );

    newswire::run(config).await
}
