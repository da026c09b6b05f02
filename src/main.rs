//! fimiproxy binary.
//!
//! Loads a JSON config, starts the configured listeners and serves until
//! SIGINT or SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use fimiproxy::config::loader::{load_config, CONFIG_FILEPATH_ENV_VAR};
use fimiproxy::observability::init_logging;
use fimiproxy::Fimiproxy;

#[derive(Debug, Parser)]
#[command(name = "fimiproxy", version, about = "HTTP, HTTPS, WS and WSS reverse proxy")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(env = CONFIG_FILEPATH_ENV_VAR)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            init_logging(false);
            tracing::error!(path = %cli.config.display(), error = %e, "failed to load config");
            return Err(e.into());
        }
    };

    init_logging(config.debug);
    tracing::info!("fimiproxy v{} starting", env!("CARGO_PKG_VERSION"));

    let proxy = Fimiproxy::start(config).await?;
    proxy.run_until_signal().await;

    Ok(())
}
