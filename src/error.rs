use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Publish of message {index} not acknowledged within {timeout:?}")]
    PublishTimeout { index: usize, timeout: Duration },
}

impl PipelineError {
    pub fn missing(name: &str) -> Self {
        PipelineError::Configuration(format!("Missing required environment variable: {}", name))
    }
}
