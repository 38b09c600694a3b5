use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Decoded message ready for the builder.
///
/// Invariant: the inner value is always an object carrying an `attachments`
/// array, the shape the message builder expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Message(Value);

impl Message {
    /// Normalize a decoded snapshot value: a value that already carries an
    /// `attachments` field is used as-is, anything else is wrapped as the
    /// sole attachment.
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("attachments") => Self(Value::Object(map)),
            other => Self(json!({ "attachments": [other] })),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Wire text handed to the renderer as the builder's `msg` parameter.
    pub fn to_wire(&self) -> String {
        self.0.to_string()
    }
}

/// The flattened run-wide job map: output path to the message rendered there.
///
/// Keys are a pure function of (out root, group, test, entry name), so
/// re-running on unchanged input regenerates identical keys and merging maps
/// from several files can never collide across entries.
pub type JobMap = BTreeMap<String, Message>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_wraps_plain_object() {
        let message = Message::normalize(json!({"text": "hi"}));
        assert_eq!(
            message.as_value(),
            &json!({"attachments": [{"text": "hi"}]})
        );
    }

    #[test]
    fn test_normalize_keeps_existing_attachments() {
        let value = json!({"attachments": [{"text": "one"}, {"text": "two"}]});
        let message = Message::normalize(value.clone());
        assert_eq!(message.as_value(), &value);
    }

    #[test]
    fn test_normalize_wraps_non_object_values() {
        let message = Message::normalize(json!(["a", "b"]));
        assert_eq!(message.as_value(), &json!({"attachments": [["a", "b"]]}));
    }

    #[test]
    fn test_wire_round_trips_through_serde() {
        let message = Message::normalize(json!({"text": "hi"}));
        let parsed: Value = serde_json::from_str(&message.to_wire()).unwrap();
        assert_eq!(&parsed, message.as_value());
    }
}
