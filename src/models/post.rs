use serde::Serialize;
use serde_json::{Map, Value};

/// A Reddit post exactly as the listing endpoint returned it.
pub type Post = Map<String, Value>;

/// Fields logged by the consumer for every received post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: Value,
    pub title: Value,
    pub author: Value,
    pub score: Value,
    pub created_utc: Value,
    pub permalink: Value,
    pub subreddit: Value,
}

impl PostSummary {
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: field(post, "id"),
            title: field(post, "title"),
            author: field(post, "author"),
            score: field(post, "score"),
            created_utc: field(post, "created_utc"),
            permalink: field(post, "permalink"),
            subreddit: field(post, "subreddit"),
        }
    }
}

/// Looks up `key`, yielding `Value::Null` when the post lacks it.
pub fn field(post: &Post, key: &str) -> Value {
    post.get(key).cloned().unwrap_or(Value::Null)
}

/// Renders a value for log output: strings without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
