//! Message envelopes - single communication events between agents.

mod content;

pub use content::*;

use chrono::{DateTime, Utc};
use influence_graph::{AgentId, SnapshotError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Last timestamp handed out, in microseconds since the epoch.
static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Wall-clock time at microsecond precision, clamped so that successive
/// calls never go backwards.
fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    let micros = now.timestamp_micros();
    let previous = LAST_STAMP_MICROS.fetch_max(micros, Ordering::SeqCst);
    DateTime::from_timestamp_micros(previous.max(micros)).unwrap_or(now)
}

/// Kind of communication carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Public event, visible to everyone.
    GlobalEvent,
    /// Private event between a few agents.
    LocalEvent,
    /// Fan-out copy produced by a node.
    Broadcast,
    /// Point-to-point message.
    Direct,
    /// Reply generated by an external system.
    SystemResponse,
}

/// A single communication event.
///
/// Everything except the importance record in `content` is fixed after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub sender: AgentId,
    pub receiver: AgentId,
    pub message_type: MessageType,
    pub content: MessageContent,
    timestamp: DateTime<Utc>,
}

impl MessageEnvelope {
    /// Create an envelope stamped with the current time.
    pub fn new(
        sender: impl Into<AgentId>,
        receiver: impl Into<AgentId>,
        message_type: MessageType,
        content: MessageContent,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            message_type,
            content,
            timestamp: next_timestamp(),
        }
    }

    /// A fresh envelope with the same type and content, sent to `receiver`.
    pub fn readdressed(&self, sender: AgentId, receiver: AgentId) -> Self {
        Self::new(sender, receiver, self.message_type, self.content.clone())
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Assigned importance; unscored messages count as 0.0.
    pub fn importance(&self) -> f32 {
        self.content.importance().unwrap_or(0.0)
    }

    pub fn is_scored(&self) -> bool {
        self.content.importance().is_some()
    }

    pub fn set_importance(&mut self, importance: f32) {
        self.content.set_importance(importance);
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON. All five fields are required.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MessageEnvelope {
        MessageEnvelope::new(
            "ana",
            "ben",
            MessageType::LocalEvent,
            MessageContent::new()
                .with_record(ContentRecord::event("Ana found a map"))
                .with_record(ContentRecord::field("place", "old mill")),
        )
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let stamps: Vec<_> = (0..500)
            .map(|_| MessageEnvelope::new("a", "b", MessageType::Direct, MessageContent::new()))
            .map(|m| m.timestamp())
            .collect();

        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_unscored_importance_is_zero() {
        let mut message = sample();
        assert!(!message.is_scored());
        assert_eq!(message.importance(), 0.0);

        message.set_importance(0.75);
        assert!(message.is_scored());
        assert_eq!(message.importance(), 0.75);
    }

    #[test]
    fn test_readdressed_copies_body() {
        let original = sample();
        let copy = original.readdressed(AgentId::central(), AgentId::from("cy"));

        assert!(copy.sender.is_central());
        assert_eq!(copy.receiver, AgentId::from("cy"));
        assert_eq!(copy.message_type, original.message_type);
        assert_eq!(copy.content, original.content);
        assert!(copy.timestamp() >= original.timestamp());
    }

    #[test]
    fn test_json_round_trip() {
        let mut message = sample();
        message.set_importance(0.4);

        let json = message.to_json().unwrap();
        for field in ["sender", "receiver", "message_type", "content", "timestamp"] {
            assert!(json.contains(&format!("\"{field}\"")), "missing {field}");
        }

        let back = MessageEnvelope::from_json(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let json = r#"{
            "sender": "a",
            "receiver": "b",
            "message_type": "direct",
            "content": []
        }"#;
        assert!(matches!(
            MessageEnvelope::from_json(json),
            Err(SnapshotError::Malformed(_))
        ));
    }
}
