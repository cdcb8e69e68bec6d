mod app;
mod audio;
mod compare;
mod config;
mod fingerprint;
#[cfg(test)]
mod http_stub;
mod messages;
mod playback;
mod services;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting earworm music identifier");

    let config = Config::load()?;
    config.validate()?;

    App::new(config)?.run().await
}
