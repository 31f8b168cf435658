use serde::{Deserialize, Serialize};
use store::{DEFAULT_QUERY_LIMIT, EventAction, EventQuery, event};

/// Body of `POST /events`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRequest {
    pub project_key: String,
    /// Absent or null matches every action
    #[serde(default)]
    pub action: Option<EventAction>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_QUERY_LIMIT
}

impl From<EventRequest> for EventQuery {
    fn from(request: EventRequest) -> Self {
        EventQuery::new(request.project_key)
            .with_action(request.action)
            .with_limit(request.limit)
    }
}

/// One event as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub action: String,
    pub project_key: String,
    /// Decoded when the stored value is XDR, the stored text otherwise
    pub value: serde_json::Value,
    pub ledger: i64,
}

/// JSON form of a stored value, whichever way it was ingested.
///
/// Raw rows hold base64 XDR and decoded rows hold JSON text. Neither JSON
/// numbers, literals, strings nor containers decode as a valid `ScVal`, so
/// trying XDR first is unambiguous. Anything else is returned as a string.
pub fn stored_value_json(value: &str) -> serde_json::Value {
    match scval::decode(value) {
        Ok(native) => native.to_json(),
        Err(_) => serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string())),
    }
}

impl From<event::Model> for EventResponse {
    fn from(model: event::Model) -> Self {
        Self {
            value: stored_value_json(&model.value),
            action: model.action,
            project_key: model.project_key,
            ledger: model.ledger,
        }
    }
}
