use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::{
    config::{DEFAULT_SUBREDDIT, ProducerConfig},
    error::PipelineError,
    models::{
        message::{PublishRequest, PublishResponse, PubsubMessage},
        post::{Post, display_value, field},
    },
};

pub const PUBSUB_SCOPES: &[&str] = &["https://www.googleapis.com/auth/pubsub"];
pub const ACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Supplies the bearer token for Pub/Sub requests; `None` sends no Authorization header.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Option<String>, PipelineError>;
}

/// Application-default Google credentials.
pub struct GcpTokenSource;

#[async_trait]
impl TokenSource for GcpTokenSource {
    async fn token(&self) -> Result<Option<String>, PipelineError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| {
                PipelineError::Publish(format!("Failed to load Google credentials: {}", e))
            })?;

        let token = provider
            .token(PUBSUB_SCOPES)
            .await
            .map_err(|e| {
                PipelineError::Publish(format!("Failed to obtain Google access token: {}", e))
            })?;

        Ok(Some(token.as_str().to_string()))
    }
}

/// Fixed token, or none at all for the emulator.
pub struct StaticTokenSource(pub Option<String>);

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Option<String>, PipelineError> {
        Ok(self.0.clone())
    }
}

pub struct PubsubPublisher {
    http_client: Client,
    publish_url: String,
    topic_name: String,
    token_source: Arc<dyn TokenSource>,
    ack_timeout: Duration,
}

impl PubsubPublisher {
    pub fn new(config: &ProducerConfig) -> Result<Self, PipelineError> {
        match config.pubsub_emulator_host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => {
                info!(emulator_host = %host, "Using Pub/Sub emulator");
                Self::with_token_source(
                    config,
                    &format!("http://{}", host),
                    Arc::new(StaticTokenSource(None)),
                )
            }
            None => {
                Self::with_token_source(config, &config.pubsub_api_base, Arc::new(GcpTokenSource))
            }
        }
    }

    pub fn with_token_source(
        config: &ProducerConfig,
        api_base: &str,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Self, PipelineError> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let topic_path = config.topic_path();
        let publish_url = format!("{}/v1/{}:publish", api_base.trim_end_matches('/'), topic_path);

        info!(topic = %topic_path, "Pub/Sub publisher initialized");

        Ok(Self {
            http_client,
            publish_url,
            topic_name: config.pubsub_topic.clone(),
            token_source,
            ack_timeout: ACK_TIMEOUT,
        })
    }

    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Publishes every post as its own message, then waits for each
    /// acknowledgment in order. The first failure stops the waiting and is
    /// returned; messages already in flight are not recalled.
    pub async fn publish_posts(&self, posts: &[Post]) -> Result<Vec<String>, PipelineError> {
        let token = self.token_source.token().await?;
        let total = posts.len();

        let mut pending = Vec::with_capacity(total);
        for (i, post) in posts.iter().enumerate() {
            let request = PublishRequest {
                messages: vec![encode_post(post)?],
            };

            let http_client = self.http_client.clone();
            let url = self.publish_url.clone();
            let token = token.clone();

            pending.push(tokio::spawn(async move {
                Self::publish_once(http_client, url, token, request).await
            }));

            info!(
                "published {}/{} id={} title={:?}",
                i + 1,
                total,
                display_value(&field(post, "id")),
                display_value(&field(post, "title")),
            );
        }

        let mut message_ids = Vec::with_capacity(total);
        for (i, handle) in pending.into_iter().enumerate() {
            let index = i + 1;
            let outcome = timeout(self.ack_timeout, handle)
                .await
                .map_err(|_| PipelineError::PublishTimeout {
                    index,
                    timeout: self.ack_timeout,
                })?
                .map_err(|e| {
                    PipelineError::Publish(format!(
                        "Publish task for message {} failed: {}",
                        index, e
                    ))
                })?;

            message_ids.push(outcome?);
        }

        info!("done: published {} messages to {}.", total, self.topic_name);

        Ok(message_ids)
    }

    async fn publish_once(
        http_client: Client,
        url: String,
        token: Option<String>,
        request: PublishRequest,
    ) -> Result<String, PipelineError> {
        let mut builder = http_client.post(&url).json(&request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PipelineError::Publish(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Publish(format!(
                "Pub/Sub returned status {}: {}",
                status, error_text
            )));
        }

        let ack: PublishResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Publish(format!("Invalid publish response: {}", e)))?;

        let message_id = ack
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| {
                PipelineError::Publish("Publish response carried no message id".to_string())
            })?;

        debug!(message_id = %message_id, "Publish acknowledged");

        Ok(message_id)
    }
}

/// Attributes attached to every published post.
pub fn message_attributes(post: &Post) -> HashMap<String, String> {
    let subreddit = match field(post, "subreddit") {
        serde_json::Value::Null => DEFAULT_SUBREDDIT.to_string(),
        other => display_value(&other),
    };

    HashMap::from([
        ("source".to_string(), "reddit".to_string()),
        ("subreddit".to_string(), subreddit),
        ("kind".to_string(), "post".to_string()),
    ])
}

pub fn encode_post(post: &Post) -> Result<PubsubMessage, PipelineError> {
    let payload = serde_json::to_vec(post)
        .map_err(|e| PipelineError::Publish(format!("Failed to serialize post: {}", e)))?;

    Ok(PubsubMessage {
        data: STANDARD.encode(payload),
        attributes: message_attributes(post),
    })
}
