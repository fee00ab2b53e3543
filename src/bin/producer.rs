use anyhow::{Error, Result};
use reddit_pubsub::{
    config::ProducerConfig,
    producer,
    utils::{init_tracing, shutdown_signal},
};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ProducerConfig::load()
        .inspect_err(|e| error!(error = %e, "Invalid producer configuration"))?;

    producer::run(config, shutdown_signal())
        .await
        .inspect_err(|e| error!(error = %e, "Producer run failed"))?;

    Ok(())
}
