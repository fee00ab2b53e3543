use anyhow::{Error, Result};
use reddit_pubsub::{api::run_api_server, config::ConsumerConfig, utils::init_tracing};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = ConsumerConfig::load()?;

    run_api_server(config).await
}
