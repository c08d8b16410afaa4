//! Streaming event model.
//!
//! Inbound WebSocket frames carry a channel tag (a single string or an
//! array of them), an event type and a payload that is usually a
//! JSON-encoded string. `delete` events are the exception: their payload is
//! a bare identifier and must pass through undecoded.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::case::{camel_case, snake_case, transform_keys};
use crate::error::{Error, Result};

/// An inbound frame exactly as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "string_or_seq")]
    pub stream: Vec<String>,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub payload: Option<String>,
    /// Server-reported in-band error. Its presence terminates the
    /// subscription.
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded streaming event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Channel tags this event was published under.
    pub stream: Vec<String>,
    /// Event type, e.g. `update`, `notification`, `delete`.
    pub event: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Structured payload with caller-convention keys.
    Json(Value),
    /// Raw passthrough, used for `delete` events carrying a bare id.
    Text(String),
    /// No payload, or a payload that failed to decode.
    Empty,
}

impl Event {
    /// Decode a raw frame.
    ///
    /// A malformed structured payload degrades to [`EventPayload::Empty`]
    /// rather than failing; an in-band `error` field is a hard error.
    pub fn from_raw(raw: RawEvent) -> Result<Event> {
        if let Some(message) = raw.error {
            return Err(Error::Streaming(message));
        }

        let payload = match raw.payload {
            None => EventPayload::Empty,
            Some(text) if raw.event == "delete" => EventPayload::Text(text),
            Some(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => EventPayload::Json(transform_keys(value, camel_case)),
                Err(_) => EventPayload::Empty,
            },
        };

        Ok(Event {
            stream: raw.stream,
            event: raw.event,
            payload,
        })
    }

    /// Whether this event should be delivered to a subscriber registered
    /// for `tag`. Matching is substring containment against each of the
    /// frame's tags.
    pub fn matches(&self, tag: &str) -> bool {
        self.stream.iter().any(|s| s.contains(tag))
    }
}

/// Outbound control frame for a streaming connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StreamCommand {
    Subscribe {
        stream: String,
        #[serde(flatten)]
        params: Map<String, Value>,
    },
    Unsubscribe {
        stream: String,
        #[serde(flatten)]
        params: Map<String, Value>,
    },
}

impl StreamCommand {
    pub fn subscribe(stream: impl Into<String>, params: Option<Value>) -> Self {
        StreamCommand::Subscribe {
            stream: stream.into(),
            params: filter_params(params),
        }
    }

    pub fn unsubscribe(stream: impl Into<String>, params: Option<Value>) -> Self {
        StreamCommand::Unsubscribe {
            stream: stream.into(),
            params: filter_params(params),
        }
    }

    /// Render the control frame for the wire.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Transport(e.to_string()))
    }
}

/// Filter parameters ride inside the control frame next to `type` and
/// `stream`, keyed in the wire convention.
fn filter_params(params: Option<Value>) -> Map<String, Value> {
    match params.map(|value| transform_keys(value, snake_case)) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrSeq::deserialize(deserializer)? {
        StringOrSeq::One(s) => vec![s],
        StringOrSeq::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(frame: Value) -> RawEvent {
        serde_json::from_value(frame).unwrap()
    }

    #[test]
    fn decodes_structured_payload_with_camel_keys() {
        let event = Event::from_raw(raw(json!({
            "stream": ["user"],
            "event": "update",
            "payload": r#"{"spoiler_text":"cw","content":"hi"}"#,
        })))
        .unwrap();

        assert_eq!(event.event, "update");
        assert_eq!(
            event.payload,
            EventPayload::Json(json!({ "spoilerText": "cw", "content": "hi" }))
        );
    }

    #[test]
    fn delete_payload_stays_raw() {
        let event = Event::from_raw(raw(json!({
            "stream": ["public"],
            "event": "delete",
            "payload": "12345",
        })))
        .unwrap();

        assert_eq!(event.payload, EventPayload::Text("12345".to_string()));
    }

    #[test]
    fn malformed_payload_degrades_to_empty() {
        let event = Event::from_raw(raw(json!({
            "stream": ["user"],
            "event": "filters_changed",
            "payload": "not json",
        })))
        .unwrap();

        assert_eq!(event.payload, EventPayload::Empty);
    }

    #[test]
    fn error_frame_is_a_hard_error() {
        let err = Event::from_raw(raw(json!({ "error": "Access token is invalid" }))).unwrap_err();
        assert!(matches!(err, Error::Streaming(_)));
    }

    #[test]
    fn stream_accepts_bare_string_or_array() {
        let one = raw(json!({ "stream": "user", "event": "update" }));
        assert_eq!(one.stream, vec!["user"]);

        let many = raw(json!({ "stream": ["hashtag:local", "tag_x"], "event": "update" }));
        assert_eq!(many.stream, vec!["hashtag:local", "tag_x"]);
    }

    #[test]
    fn matches_by_substring_containment() {
        let event = Event::from_raw(raw(json!({
            "stream": ["hashtag:local", "tag_x"],
            "event": "update",
        })))
        .unwrap();

        assert!(event.matches("hashtag:local"));
        assert!(event.matches("hashtag"));
        assert!(!event.matches("user"));
    }

    #[test]
    fn subscribe_command_carries_snake_cased_filters() {
        let cmd = StreamCommand::subscribe("hashtag:local", Some(json!({ "tag": "rust" })));
        let frame: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({ "type": "subscribe", "stream": "hashtag:local", "tag": "rust" })
        );
    }

    #[test]
    fn unsubscribe_mirrors_subscribe() {
        let cmd = StreamCommand::unsubscribe("list", Some(json!({ "listId": "9" })));
        let frame: Value = serde_json::from_str(&cmd.to_json().unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({ "type": "unsubscribe", "stream": "list", "list_id": "9" })
        );
    }
}
