use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::post::display_value;

/// One outbound Pub/Sub message: base64 payload plus string attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubsubMessage {
    pub data: String,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub messages: Vec<PubsubMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    #[serde(default)]
    pub message_ids: Vec<String>,
}

/// Envelope POSTed by a push subscription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Kept untyped: a non-string payload is a bad message, not a missing one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub attributes: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
}

impl PushEnvelope {
    /// Reads each field on its own so one oddly typed field never hides the others.
    pub fn from_value(value: &Value) -> Self {
        Self {
            message: value
                .get("message")
                .filter(|m| m.is_object())
                .map(PushMessage::from_value),
            subscription: value
                .get("subscription")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl PushMessage {
    pub fn from_value(value: &Value) -> Self {
        let attributes = value
            .get("attributes")
            .and_then(Value::as_object)
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), display_value(v)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            data: value.get("data").cloned(),
            attributes,
            message_id: value
                .get("messageId")
                .and_then(Value::as_str)
                .map(str::to_string),
            publish_time: value
                .get("publishTime")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}
