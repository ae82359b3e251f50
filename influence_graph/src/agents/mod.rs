//! Agent identifiers and per-agent state snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Opaque identifier for a participant in the influence network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Sender identity used for messages fanned out by a node.
    pub const CENTRAL: &'static str = "central";

    /// Create an agent ID from any string token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random agent ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The broadcast sentinel.
    pub fn central() -> Self {
        Self(Self::CENTRAL.to_string())
    }

    pub fn is_central(&self) -> bool {
        self.0 == Self::CENTRAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time state of a single agent, as recorded in a world snapshot.
///
/// Agent behaviour lives outside this crate; the snapshot keeps the agent's
/// identity plus whatever attributes its owner chose to export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: AgentId,

    /// Exported attributes, ordered by key for stable output.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl AgentSnapshot {
    /// Create a snapshot with no attributes.
    pub fn new(agent_id: impl Into<AgentId>) -> Self {
        Self {
            agent_id: agent_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
