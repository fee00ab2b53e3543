use std::time::Duration;

use reqwest::{Client, header::USER_AGENT};
use tracing::{debug, info};

use crate::{
    config::{ProducerConfig, RedditCredentials},
    error::PipelineError,
    models::{
        post::Post,
        reddit::{Listing, TokenResponse},
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

pub struct RedditClient {
    http_client: Client,
    credentials: RedditCredentials,
    token_url: String,
    api_base: String,
}

impl RedditClient {
    pub fn new(config: &ProducerConfig) -> Result<Self, PipelineError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(api_base = %config.reddit_api_base, "Reddit client initialized");

        Ok(Self {
            http_client,
            credentials: config.reddit_credentials(),
            token_url: config.reddit_token_url.clone(),
            api_base: config.reddit_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Exchanges the account credentials for a bearer token (password grant).
    pub async fn get_token(&self) -> Result<String, PipelineError> {
        self.credentials.validate()?;

        debug!(username = %self.credentials.username, "Requesting Reddit access token");

        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(USER_AGENT, &self.credentials.user_agent)
            .form(&form)
            .send()
            .await
            .map_err(|e| PipelineError::Authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                PipelineError::Authentication(format!("Failed to read token response: {}", e))
            })?;

        if !status.is_success() {
            return Err(PipelineError::Authentication(format!(
                "Token endpoint returned status {}. Response: {}",
                status,
                preview(&body)
            )));
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => Ok(token),
            None => Err(PipelineError::Authentication(format!(
                "Could not get access_token from Reddit. Response: {}",
                preview(&body)
            ))),
        }
    }

    /// Top posts of all time for `subreddit`, in listing order, every field kept.
    pub async fn fetch_top_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<Post>, PipelineError> {
        let token = self.get_token().await?;

        let url = format!("{}/r/{}/top", self.api_base, subreddit);
        let limit = limit.to_string();

        debug!(url = %url, limit = %limit, "Fetching top posts");

        let response = self
            .http_client
            .get(&url)
            .query(&[("t", "all"), ("limit", limit.as_str())])
            .header(reqwest::header::AUTHORIZATION, format!("bearer {}", token))
            .header(USER_AGENT, &self.credentials.user_agent)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch(format!("Listing request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch(format!(
                "Listing endpoint {} returned status {}",
                url, status
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| PipelineError::Fetch(format!("Failed to parse listing JSON: {}", e)))?;

        let posts = listing.into_posts();

        info!(subreddit, count = posts.len(), "Fetched top posts");

        Ok(posts)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect()
}
