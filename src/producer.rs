use std::future::Future;

use tracing::{info, warn};

use crate::{
    clients::{pubsub::PubsubPublisher, reddit::RedditClient},
    config::ProducerConfig,
    error::PipelineError,
};

/// Fetches the configured listing and publishes it. Returns the number of
/// messages published; zero posts skips publishing entirely.
pub async fn publish_top_posts(
    config: &ProducerConfig,
    reddit: &RedditClient,
    publisher: &PubsubPublisher,
) -> Result<usize, PipelineError> {
    info!(
        "fetching Top {} (all time) from r/{} ...",
        config.reddit_limit, config.reddit_subreddit
    );

    let posts = reddit
        .fetch_top_posts(&config.reddit_subreddit, config.reddit_limit)
        .await?;

    if posts.is_empty() {
        warn!("got 0 posts from Reddit API");
        return Ok(0);
    }

    let message_ids = publisher.publish_posts(&posts).await?;

    Ok(message_ids.len())
}

/// Full producer run: publish, then either return or stay up until `shutdown` resolves.
pub async fn run<S>(config: ProducerConfig, shutdown: S) -> Result<(), PipelineError>
where
    S: Future<Output = ()>,
{
    let reddit = RedditClient::new(&config)?;
    let publisher = PubsubPublisher::new(&config)?;

    publish_top_posts(&config, &reddit, &publisher).await?;

    if config.exit_after_publish {
        info!("EXIT_AFTER_PUBLISH=true -> exiting.");
        return Ok(());
    }

    info!("idling until shutdown. Set EXIT_AFTER_PUBLISH=true to exit after publishing.");
    shutdown.await;

    Ok(())
}
