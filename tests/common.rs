use std::{
    io,
    sync::{Arc, Mutex},
};

use reddit_pubsub::{api, config::ProducerConfig, models::post::Post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, body_string_contains, header, method, path, query_param},
};

pub const USER_AGENT: &str = "reddit-pubsub-tests/1.0";
pub const REDDIT_TOKEN: &str = "reddit-test-token";
pub const PUBSUB_TOKEN: &str = "pubsub-test-token";
pub const PUBLISH_PATH: &str = "/v1/projects/demo-project/topics/reddit-posts:publish";

pub fn base_vars() -> Vec<(String, String)> {
    [
        ("REDDIT_CLIENT_ID", "client-id"),
        ("REDDIT_CLIENT_SECRET", "client-secret"),
        ("REDDIT_USERNAME", "lab-user"),
        ("REDDIT_PASSWORD", "hunter2"),
        ("REDDIT_USER_AGENT", USER_AGENT),
        ("PROJECT_ID", "demo-project"),
        ("PUBSUB_TOPIC", "reddit-posts"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Producer config pointing the Reddit endpoints at `reddit`.
pub fn producer_config(reddit: &MockServer, extra: &[(&str, &str)]) -> ProducerConfig {
    let mut vars = base_vars();
    vars.push((
        "REDDIT_TOKEN_URL".to_string(),
        format!("{}/api/v1/access_token", reddit.uri()),
    ));
    vars.push(("REDDIT_API_BASE".to_string(), reddit.uri()));
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    ProducerConfig::from_vars(vars).expect("test config should load")
}

pub fn sample_post() -> Post {
    as_post(json!({
        "id": "abc",
        "title": "Hello",
        "author": "u1",
        "score": 42,
        "created_utc": 1700000000,
        "permalink": "/r/x/abc",
    }))
}

pub fn as_post(value: Value) -> Post {
    value.as_object().cloned().expect("post fixtures are objects")
}

pub fn listing(posts: &[Post]) -> Value {
    let children: Vec<Value> = posts
        .iter()
        .map(|p| json!({"kind": "t3", "data": p}))
        .collect();

    json!({"kind": "Listing", "data": {"after": null, "children": children}})
}

pub async fn mount_token_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(basic_auth("client-id", "client-secret"))
        .and(header("user-agent", USER_AGENT))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=lab-user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": REDDIT_TOKEN,
            "token_type": "bearer",
            "expires_in": 86400,
        })))
        .mount(server)
        .await;
}

pub async fn mount_listing(server: &MockServer, subreddit: &str, limit: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/top", subreddit)))
        .and(query_param("t", "all"))
        .and(query_param("limit", limit))
        .and(header("authorization", format!("bearer {}", REDDIT_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Starts the consumer on an ephemeral port and returns its base URL.
pub async fn spawn_consumer() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(api::serve(listener));

    format!("http://{}", addr)
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer lock");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's log output into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    (logs, tracing::subscriber::set_default(subscriber))
}
