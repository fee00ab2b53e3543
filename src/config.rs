use dotenvy::dotenv;
use serde::{Deserialize, Deserializer};

use crate::error::PipelineError;

pub const DEFAULT_USER_AGENT: &str = "lab1-reddit-producer/1.0";
pub const DEFAULT_SUBREDDIT: &str = "dataengineering";
pub const DEFAULT_REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const DEFAULT_PUBSUB_API_BASE: &str = "https://pubsub.googleapis.com";

#[derive(Clone, Deserialize, Debug)]
pub struct ProducerConfig {
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_username: String,
    pub reddit_password: String,
    #[serde(default = "default_user_agent")]
    pub reddit_user_agent: String,

    pub project_id: String,
    pub pubsub_topic: String,

    #[serde(default = "default_subreddit")]
    pub reddit_subreddit: String,
    #[serde(default = "default_limit")]
    pub reddit_limit: u32,
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub exit_after_publish: bool,

    #[serde(default = "default_token_url")]
    pub reddit_token_url: String,
    #[serde(default = "default_api_base")]
    pub reddit_api_base: String,
    #[serde(default = "default_pubsub_api_base")]
    pub pubsub_api_base: String,
    #[serde(default)]
    pub pubsub_emulator_host: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct ConsumerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Credentials for the Reddit password grant.
#[derive(Clone, Debug)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl ProducerConfig {
    pub fn load() -> Result<Self, PipelineError> {
        dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Builds the config from explicit `(NAME, value)` pairs instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Self>(vars)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.reddit_credentials().validate()?;

        require("PROJECT_ID", &self.project_id)?;
        require("PUBSUB_TOPIC", &self.pubsub_topic)?;

        Ok(())
    }

    pub fn reddit_credentials(&self) -> RedditCredentials {
        RedditCredentials {
            client_id: self.reddit_client_id.clone(),
            client_secret: self.reddit_client_secret.clone(),
            username: self.reddit_username.clone(),
            password: self.reddit_password.clone(),
            user_agent: self.reddit_user_agent.clone(),
        }
    }

    pub fn topic_path(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.pubsub_topic)
    }
}

impl ConsumerConfig {
    pub fn load() -> Result<Self, PipelineError> {
        dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Self>(vars).map_err(|e| PipelineError::Configuration(e.to_string()))
    }
}

impl RedditCredentials {
    pub fn validate(&self) -> Result<(), PipelineError> {
        require("REDDIT_CLIENT_ID", &self.client_id)?;
        require("REDDIT_CLIENT_SECRET", &self.client_secret)?;
        require("REDDIT_USERNAME", &self.username)?;
        require("REDDIT_PASSWORD", &self.password)?;
        require("REDDIT_USER_AGENT", &self.user_agent)?;

        Ok(())
    }
}

fn require(name: &str, value: &str) -> Result<(), PipelineError> {
    if value.is_empty() {
        return Err(PipelineError::missing(name));
    }
    Ok(())
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_subreddit() -> String {
    DEFAULT_SUBREDDIT.to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_token_url() -> String {
    DEFAULT_REDDIT_TOKEN_URL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_REDDIT_API_BASE.to_string()
}

fn default_pubsub_api_base() -> String {
    DEFAULT_PUBSUB_API_BASE.to_string()
}

fn default_port() -> u16 {
    8080
}
