// ── Dashino services ──
//
// The four automation-facing operations. Each request type mirrors the
// service schema: unknown fields are rejected and every field is optional
// unless the operation cannot run without it.

use std::sync::Arc;

use dashino_api::{DEFAULT_SOURCE, DashinoClient, StateUpdate, WebhookMessage};
use dashino_config::ResolvedSettings;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::entity::{EntityStates, FieldTransform, extract_field_value, is_valid_entity_id};
use crate::error::CoreError;

// ── Requests ─────────────────────────────────────────────────────────

/// `forward`: post a message to the webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardRequest {
    #[serde(rename = "widgetId", default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Sent verbatim when present, even as `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// `set_state`: write a value under a state key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// `set_state_field`: write one field derived from an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStateFieldRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub field: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map<String, Value>>,
    #[serde(default)]
    pub as_number: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// `clear_state`: delete a state key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClearStateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Accepted for schema compatibility; the delete carries no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ── Session ──────────────────────────────────────────────────────────

/// Per-entry defaults applied when a request leaves a field out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDefaults {
    pub source: String,
    pub state_key: Option<String>,
    pub widget_id: Option<String>,
    pub message_type: Option<String>,
}

impl ServiceDefaults {
    pub fn from_settings(settings: &ResolvedSettings) -> Self {
        Self {
            source: settings.default_source.clone(),
            state_key: settings.default_state_key.clone(),
            widget_id: settings.default_widget_id.clone(),
            message_type: settings.default_type.clone(),
        }
    }
}

/// One configured Dashino entry: a shared client plus its defaults.
#[derive(Debug, Clone)]
pub struct Dashino {
    client: Arc<DashinoClient>,
    defaults: ServiceDefaults,
}

impl Dashino {
    pub fn new(client: Arc<DashinoClient>, defaults: ServiceDefaults) -> Self {
        Self { client, defaults }
    }

    /// Build a session from validated settings.
    ///
    /// `http` is reused when given; otherwise a client is built from the
    /// settings' TLS options.
    pub fn from_settings(
        settings: &ResolvedSettings,
        http: Option<reqwest::Client>,
    ) -> Result<Self, CoreError> {
        let http = match http {
            Some(http) => http,
            None => settings
                .transport_config()
                .build_client()
                .map_err(|e| CoreError::from_api("setup", e))?,
        };
        let client = DashinoClient::new(http, settings.client_config())
            .map_err(|e| CoreError::from_api("setup", e))?;
        Ok(Self::new(
            Arc::new(client),
            ServiceDefaults::from_settings(settings),
        ))
    }

    pub fn client(&self) -> &DashinoClient {
        &self.client
    }

    pub fn defaults(&self) -> &ServiceDefaults {
        &self.defaults
    }

    fn forward_source<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, CoreError> {
        non_empty(requested)
            .or(non_empty(Some(self.defaults.source.as_str())))
            .ok_or_else(|| CoreError::validation("Dashino source is required"))
    }

    fn source_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        non_empty(requested)
            .or(non_empty(Some(self.defaults.source.as_str())))
            .unwrap_or(DEFAULT_SOURCE)
    }

    /// The requested state key, else the entry default.
    pub fn state_key<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, CoreError> {
        non_empty(requested)
            .or(non_empty(self.defaults.state_key.as_deref()))
            .ok_or_else(|| CoreError::validation("Dashino state key is required"))
    }

    // ── Body building ────────────────────────────────────────────────

    /// Payload posted by [`forward`](Self::forward).
    pub fn forward_body(&self, req: &ForwardRequest) -> Value {
        if let Some(raw) = &req.raw {
            return raw.clone();
        }

        let message = WebhookMessage {
            widget_id: non_empty(req.widget_id.as_deref())
                .or(non_empty(self.defaults.widget_id.as_deref()))
                .map(str::to_owned),
            message_type: non_empty(req.message_type.as_deref())
                .or(non_empty(self.defaults.message_type.as_deref()))
                .map(str::to_owned),
            data: req.data.clone(),
        };
        let message = if message.is_empty() {
            WebhookMessage::empty_forward()
        } else {
            message
        };
        serde_json::to_value(message).unwrap_or_else(|_| json!({}))
    }

    /// Resolved key and body for [`set_state`](Self::set_state).
    ///
    /// A non-null `raw` replaces the whole body.
    pub fn state_body(&self, req: &SetStateRequest) -> Result<(String, Value), CoreError> {
        let key = self.state_key(req.key.as_deref())?.to_owned();
        if let Some(raw) = req.raw.as_ref().filter(|v| !v.is_null()) {
            return Ok((key, raw.clone()));
        }

        let merge = if req.replace == Some(true) {
            false
        } else {
            req.merge.unwrap_or(true)
        };
        let update = StateUpdate {
            data: req.data.clone().unwrap_or_else(|| json!({})),
            merge,
            source: self.source_for(req.source.as_deref()).to_owned(),
        };
        let body = serde_json::to_value(update).map_err(|e| CoreError::validation(e.to_string()))?;
        Ok((key, body))
    }

    /// Resolved key and body for [`set_state_field`](Self::set_state_field).
    pub fn state_field_body(
        &self,
        req: &SetStateFieldRequest,
        states: &dyn EntityStates,
    ) -> Result<(String, StateUpdate), CoreError> {
        let key = self.state_key(req.key.as_deref())?.to_owned();
        if req.field.is_empty() {
            return Err(CoreError::validation("Dashino field is required"));
        }
        if req.entity_id.is_empty() {
            return Err(CoreError::validation("Dashino entity_id is required"));
        }
        if !is_valid_entity_id(&req.entity_id) {
            return Err(CoreError::validation(format!(
                "Invalid entity id '{}'",
                req.entity_id
            )));
        }

        let entity = states
            .get(&req.entity_id)
            .ok_or_else(|| CoreError::EntityNotFound {
                entity_id: req.entity_id.clone(),
            })?;
        let transform = FieldTransform {
            map: req.map.as_ref(),
            as_number: req.as_number,
            round: req.round,
        };
        let value = extract_field_value(&entity, req.attribute.as_deref(), &transform)?;

        let mut data = Map::new();
        data.insert(req.field.clone(), value);
        Ok((
            key,
            StateUpdate {
                data: Value::Object(data),
                merge: req.merge.unwrap_or(true),
                source: self.source_for(req.source.as_deref()).to_owned(),
            },
        ))
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Post a message to `/api/webhooks/{source}`.
    pub async fn forward(&self, req: &ForwardRequest) -> Result<(), CoreError> {
        let source = self.forward_source(req.source.as_deref())?;
        let body = self.forward_body(req);
        debug!(source, "forwarding webhook message");
        self.client
            .forward_webhook(Some(source), &body)
            .await
            .map_err(|e| failed("forward", e))
    }

    /// Write a state value. Returns the dashboard's JSON echo, if any.
    pub async fn set_state(&self, req: &SetStateRequest) -> Result<Option<Value>, CoreError> {
        let (key, body) = self.state_body(req)?;
        debug!(key = %key, "setting state");
        self.client
            .set_state_value(&key, &body)
            .await
            .map_err(|e| failed("set_state", e))
    }

    /// Write one field derived from an entity's state or attribute.
    pub async fn set_state_field(
        &self,
        req: &SetStateFieldRequest,
        states: &dyn EntityStates,
    ) -> Result<Option<Value>, CoreError> {
        let (key, body) = self.state_field_body(req, states)?;
        debug!(key = %key, field = %req.field, entity_id = %req.entity_id, "setting state field");
        self.client
            .set_state_value(&key, &body)
            .await
            .map_err(|e| failed("set_state_field", e))
    }

    /// Delete a state key.
    pub async fn clear_state(&self, req: &ClearStateRequest) -> Result<(), CoreError> {
        let key = self.state_key(req.key.as_deref())?;
        debug!(key, "clearing state");
        self.client
            .clear_state_value(key)
            .await
            .map_err(|e| failed("clear_state", e))
    }
}

fn failed(operation: &'static str, err: dashino_api::Error) -> CoreError {
    let err = CoreError::from_api(operation, err);
    warn!(operation, error = %err, "Dashino call failed");
    err
}
