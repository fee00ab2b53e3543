use std::collections::HashMap;

use anyhow::{Error, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::{
    message::PushEnvelope,
    post::{Post, PostSummary, display_value},
    status::PushOutcome,
};

/// Installs the global subscriber. `RUST_LOG` selects levels (default `info`);
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Malformed or absent bodies become an empty envelope.
pub fn parse_envelope(body: &[u8]) -> PushEnvelope {
    serde_json::from_slice::<serde_json::Value>(body)
        .map(|value| PushEnvelope::from_value(&value))
        .unwrap_or_default()
}

/// base64 → UTF-8 (lossy) → JSON object. Whitespace inside the base64 text
/// (line-wrapped encoders) is ignored.
pub fn decode_post(data: &str) -> Result<Post, Error> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| anyhow!("Invalid base64 payload: {}", e))?;

    let text = String::from_utf8_lossy(&bytes);

    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Object(post) => Ok(post),
        other => Err(anyhow!("Payload is not a JSON object: {}", other)),
    }
}

/// Classifies and logs one push delivery. Never fails: every outcome is
/// acknowledged so the subscription does not redeliver it.
pub fn process_push(body: &[u8]) -> PushOutcome {
    let message = parse_envelope(body).message.unwrap_or_default();
    let message_id = message.message_id.as_deref().unwrap_or_default();

    let decoded = match &message.data {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(data)) if data.is_empty() => None,
        Some(serde_json::Value::String(data)) => Some(decode_post(data)),
        Some(other) => Some(Err(anyhow!("message.data is not a string: {}", other))),
    };

    let outcome = match decoded {
        None => {
            warn!("no message.data found in push envelope");
            PushOutcome::NoData
        }
        Some(Err(e)) => {
            error!(error = %e, message_id, "Failed to decode message");
            PushOutcome::BadMessage
        }
        Some(Ok(post)) => {
            log_received_post(&message.attributes, &post);
            PushOutcome::Ok
        }
    };

    debug!(message_id, outcome = %outcome, "Push delivery acknowledged");

    outcome
}

pub fn log_received_post(attributes: &HashMap<String, String>, post: &Post) {
    let summary = PostSummary::from_post(post);
    let received_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let mut attributes: Vec<_> = attributes.iter().collect();
    attributes.sort();

    info!(
        received_at = %received_at,
        attributes = ?attributes,
        id = %display_value(&summary.id),
        title = %display_value(&summary.title),
        author = %display_value(&summary.author),
        score = %display_value(&summary.score),
        created_utc = %display_value(&summary.created_utc),
        permalink = %display_value(&summary.permalink),
        subreddit = %display_value(&summary.subreddit),
        "received reddit post"
    );
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn push_body(data: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "message": {"data": data, "attributes": {"source": "reddit"}, "messageId": "1"},
            "subscription": "projects/p/subscriptions/s"
        }))
        .unwrap()
    }

    #[test]
    fn empty_or_malformed_body_has_no_data() {
        assert_eq!(process_push(b""), PushOutcome::NoData);
        assert_eq!(process_push(b"{}"), PushOutcome::NoData);
        assert_eq!(process_push(b"not json at all"), PushOutcome::NoData);
        assert_eq!(process_push(b"{\"message\": null}"), PushOutcome::NoData);
        assert_eq!(process_push(&push_body("")), PushOutcome::NoData);
    }

    #[test]
    fn undecodable_payloads_are_bad_messages() {
        let not_json = STANDARD.encode("{not json");
        let not_object = STANDARD.encode("[1, 2, 3]");

        assert_eq!(process_push(&push_body(&not_json)), PushOutcome::BadMessage);
        assert_eq!(process_push(&push_body(&not_object)), PushOutcome::BadMessage);
        assert_eq!(process_push(&push_body("%%%not-base64%%%")), PushOutcome::BadMessage);
    }

    #[test]
    fn valid_post_is_ok() {
        let data = STANDARD.encode(json!({"id": "abc", "title": "Hello"}).to_string());
        assert_eq!(process_push(&push_body(&data)), PushOutcome::Ok);
    }

    #[test]
    fn mistyped_envelope_fields_keep_valid_data() {
        let data = STANDARD.encode(json!({"id": "abc"}).to_string());

        for body in [
            json!({"message": {"data": data}, "subscription": 5}),
            json!({"message": {"data": data, "attributes": {"n": 1}}}),
            json!({"message": {"data": data, "attributes": ["source"]}}),
            json!({"message": {"data": data, "messageId": 7}}),
        ] {
            let body = serde_json::to_vec(&body).unwrap();
            assert_eq!(process_push(&body), PushOutcome::Ok, "{}", String::from_utf8_lossy(&body));
        }
    }

    #[test]
    fn non_string_data_is_bad_message() {
        for data in [json!(123), json!(true), json!({"nested": "x"}), json!(["e30="])] {
            let body = serde_json::to_vec(&json!({"message": {"data": data}})).unwrap();
            assert_eq!(process_push(&body), PushOutcome::BadMessage);
        }

        let body = serde_json::to_vec(&json!({"message": {"data": null}})).unwrap();
        assert_eq!(process_push(&body), PushOutcome::NoData);
    }

    #[test]
    fn line_wrapped_base64_is_accepted() {
        let post = json!({"id": "wrapped", "title": "x".repeat(80)});
        let encoded = STANDARD.encode(post.to_string());
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        let post = decode_post(&wrapped).unwrap();
        assert_eq!(post["id"], json!("wrapped"));
        assert_eq!(process_push(&push_body(&wrapped)), PushOutcome::Ok);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut bytes = b"{\"id\": \"a".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"\"}");

        let post = decode_post(&STANDARD.encode(bytes)).unwrap();
        assert_eq!(post["id"], json!("a\u{fffd}"));
    }
}
