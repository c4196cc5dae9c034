//! The WebSocket event envelope.

use serde::Serialize;

/// Server → client event names.
pub mod names {
    pub const ENTRY_CREATE: &str = "ENTRY_CREATE";
    pub const ENTRY_UPDATE: &str = "ENTRY_UPDATE";
    pub const ENTRY_REMOVE: &str = "ENTRY_REMOVE";
    pub const ENTRY_PINNED: &str = "ENTRY_PINNED";
    pub const ENTRY_HELPING: &str = "ENTRY_HELPING";
    pub const STACK_REMOVE: &str = "STACK_REMOVE";
    pub const QUEUE_OPEN: &str = "QUEUE_OPEN";
    pub const QUEUE_CLEAR: &str = "QUEUE_CLEAR";
    pub const QUEUE_RANDOMIZE: &str = "QUEUE_RANDOMIZE";
    pub const NOT_HELPED: &str = "NOT_HELPED";
    pub const ANNOUNCEMENT_CREATE: &str = "ANNOUNCEMENT_CREATE";
    pub const ANNOUNCEMENT_DELETE: &str = "ANNOUNCEMENT_DELETE";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
    pub const USER_STATUS_UPDATE: &str = "USER_STATUS_UPDATE";
    pub const QUEUE_CONNECTIONS_UPDATE: &str = "QUEUE_CONNECTIONS_UPDATE";
    pub const REFRESH: &str = "REFRESH";
    pub const PING: &str = "PING";
}

/// A single event as sent over a WebSocket connection.
///
/// Serializes to `{"e": "<EVENT_NAME>", "d": <payload>}`.
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    #[serde(rename = "e")]
    pub event: String,

    #[serde(rename = "d")]
    pub data: serde_json::Value,
}

impl WsEvent {
    /// Build an event from a name and any serializable payload.
    pub fn new(event: &str, data: impl Serialize) -> Self {
        Self {
            event: event.to_string(),
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_short_field_names() {
        let event = WsEvent::new(names::QUEUE_OPEN, true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"e": "QUEUE_OPEN", "d": true}));
    }

    #[test]
    fn null_payload_serializes_as_null() {
        let event = WsEvent::new(names::REFRESH, serde_json::Value::Null);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"e":"REFRESH","d":null}"#);
    }
}
