use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dogscan_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "dogscan-api starting: RUST_LOG='{}', port={}, production={}, client_url={:?}",
        rust_log, config.port, config.production, config.client_url
    );

    dogscan_api::server::run(config).await
}
