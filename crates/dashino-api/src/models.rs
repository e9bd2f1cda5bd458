// Request bodies understood by the Dashino webhook and state endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Body of `POST /api/states/{key}/value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Value stored under the key.
    pub data: Value,
    /// Combine with the stored value (`true`) or replace it (`false`).
    pub merge: bool,
    /// Logical origin of the update.
    pub source: String,
}

/// Structured webhook message for widget-driven dashboards.
///
/// Absent fields are omitted from the JSON entirely; the dashboard treats a
/// missing key differently from `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "widgetId", skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WebhookMessage {
    pub fn is_empty(&self) -> bool {
        self.widget_id.is_none() && self.message_type.is_none() && self.data.is_none()
    }

    /// Placeholder sent when a forward call carries nothing at all.
    pub fn empty_forward() -> Self {
        Self {
            widget_id: None,
            message_type: Some("dashino-forward".into()),
            data: Some(json!({})),
        }
    }
}

/// Fixed diagnostic payload used by `test_connectivity`.
pub fn connectivity_probe() -> Value {
    json!({ "type": "dashino-test", "data": { "ok": true } })
}
