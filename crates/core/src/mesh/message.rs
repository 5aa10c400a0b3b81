//! # Mesh Messages
//!
//! Point-to-point message types exchanged between registered agents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload carried by a mesh message (arbitrary key → value)
pub type Payload = Map<String, Value>;

/// Kind of a mesh message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Response,
}

/// A point-to-point message between two agents
///
/// Immutable once constructed. The router hands it to the receiver's handler
/// and does not retain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshMessage {
    /// Id of the sending agent
    pub sender: String,
    /// Id of the intended receiver
    pub receiver: String,
    /// Request or response
    pub kind: MessageKind,
    /// Message content
    pub payload: Payload,
}

/// Outcome of a best-effort delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The receiver's handler was invoked with the message
    Delivered,
    /// The receiver is unknown; the message was discarded
    Dropped,
}

impl DeliveryStatus {
    /// Whether the message reached a handler
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_kind_serialization() {
        assert_eq!(serde_json::to_string(&MessageKind::Request).unwrap(), "\"request\"");
        assert_eq!(serde_json::to_string(&MessageKind::Response).unwrap(), "\"response\"");
    }

    #[test]
    fn test_delivery_status() {
        assert!(DeliveryStatus::Delivered.is_delivered());
        assert!(!DeliveryStatus::Dropped.is_delivered());
    }

    #[test]
    fn test_message_roundtrip() {
        let mut payload = Payload::new();
        payload.insert("task".to_string(), json!("generate tests"));
        let message = MeshMessage {
            sender: "coder".to_string(),
            receiver: "tester".to_string(),
            kind: MessageKind::Request,
            payload,
        };
        let json = serde_json::to_string(&message).unwrap();
        let back: MeshMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sender, "coder");
        assert_eq!(back.kind, MessageKind::Request);
        assert_eq!(back.payload.get("task"), Some(&json!("generate tests")));
    }
}
