use anyhow::{Error, Result};
use axum::{
    Router,
    body::Bytes,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::ConsumerConfig,
    utils::{process_push, shutdown_signal},
};

pub const LISTENING_BODY: &str = "Consumer service is listening";

/// A 10 MB Pub/Sub message grows to ~13.4 MB once base64-encoded and wrapped
/// in the push envelope. Anything the bus can deliver must reach the handler.
pub const PUSH_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/listening", get(listening_check))
        .route("/pubsub/push", post(pubsub_push))
        .layer(DefaultBodyLimit::max(PUSH_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_api_server(config: ConsumerConfig) -> Result<(), Error> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Consumer server started");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Serves the router on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener) -> Result<(), Error> {
    axum::serve(listener, router()).await?;
    Ok(())
}

async fn listening_check() -> impl IntoResponse {
    (StatusCode::OK, LISTENING_BODY)
}

async fn pubsub_push(body: Bytes) -> impl IntoResponse {
    let outcome = process_push(&body);

    (StatusCode::OK, outcome.as_str())
}
