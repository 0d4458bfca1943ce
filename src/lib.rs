// Foundation model playground proxy

pub mod api;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod health;
pub mod invoke;
pub mod story;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

pub async fn run() -> anyhow::Result<()> {
    let config = config::load_config()?;
    init_tracing(&config.log_level);
    tracing::info!("Starting application with log level: {}", config.log_level);

    api::start_server(config).await
}
