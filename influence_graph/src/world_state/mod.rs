//! World state - a point-in-time snapshot of the whole simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::agents::{AgentId, AgentSnapshot};
use crate::error::{SnapshotError, TopologyError};
use crate::topology::{NetworkTopology, TopologySnapshot};

/// A global (public) or local (private) event in the world log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Human-readable summary of what happened. Empty when a producer only
    /// attached details.
    #[serde(default)]
    pub description: String,

    /// Agents involved in the event.
    #[serde(default)]
    pub participants: Vec<AgentId>,

    /// Free-form details attached by the producer of the event. Kept in their
    /// own object so any key is allowed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl EventRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            participants: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_participant(mut self, agent: impl Into<AgentId>) -> Self {
        self.participants.push(agent.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// The complete state of the world at a point in time.
///
/// Every field defaults to an empty collection when missing from a
/// serialized payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldState {
    /// Influence topology as an adjacency map.
    #[serde(default)]
    pub base_network: TopologySnapshot,

    /// Public events visible to every agent.
    #[serde(default)]
    pub global_events: Vec<EventRecord>,

    /// Private events visible to their participants.
    #[serde(default)]
    pub local_events: Vec<EventRecord>,

    /// Per-agent state snapshots.
    #[serde(default)]
    pub agent_states: Vec<AgentSnapshot>,

    /// Narrative motifs shared across the world.
    #[serde(default)]
    pub global_motifs: Vec<String>,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh random topology over `agent_ids` and snapshot it.
    pub fn from_agents<I, A, R>(
        agent_ids: I,
        edge_probability: f64,
        rng: &mut R,
    ) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
        R: Rng + ?Sized,
    {
        let topology = NetworkTopology::generate(agent_ids, edge_probability, rng)?;
        Ok(Self::from_topology(&topology))
    }

    /// Snapshot an existing topology.
    pub fn from_topology(topology: &NetworkTopology) -> Self {
        Self {
            base_network: topology.snapshot(),
            ..Self::default()
        }
    }

    /// Rebuild a live topology from the stored snapshot.
    pub fn topology(&self, edge_probability: f64) -> Result<NetworkTopology, TopologyError> {
        NetworkTopology::from_snapshot(&self.base_network, edge_probability)
    }

    pub fn record_global_event(&mut self, event: EventRecord) {
        self.global_events.push(event);
    }

    pub fn record_local_event(&mut self, event: EventRecord) {
        self.local_events.push(event);
    }

    pub fn push_agent_state(&mut self, state: AgentSnapshot) {
        self.agent_states.push(state);
    }

    pub fn add_motif(&mut self, motif: impl Into<String>) {
        self.global_motifs.push(motif.into());
    }

    /// Look up the snapshot for an agent.
    pub fn agent_state(&self, agent: &AgentId) -> Option<&AgentSnapshot> {
        self.agent_states.iter().find(|s| &s.agent_id == agent)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON. The stored network must satisfy the topology
    /// invariants.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let state: Self = serde_json::from_str(json)?;
        NetworkTopology::from_snapshot(&state.base_network, crate::DEFAULT_EDGE_PROBABILITY)?;
        Ok(state)
    }
}

impl std::fmt::Display for WorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldState(nodes={}, edges={}, global_events={}, local_events={}, agents={}, motifs={})",
            self.base_network.len(),
            self.base_network.edge_count(),
            self.global_events.len(),
            self.local_events.len(),
            self.agent_states.len(),
            self.global_motifs.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn populated() -> WorldState {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut state = WorldState::from_agents(["ana", "ben", "cy"], 1.0, &mut rng).unwrap();

        state.record_global_event(
            EventRecord::new("The harvest failed")
                .with_participant("ana")
                .with_detail("severity", 0.8),
        );
        state.record_local_event(EventRecord::new("Ben told Cy a secret").with_participant("ben"));
        state.push_agent_state(AgentSnapshot::new("ana").with_attribute("mood", "anxious"));
        state.add_motif("scarcity breeds suspicion");
        state
    }

    #[test]
    fn test_from_agents_builds_topology() {
        let state = populated();
        assert_eq!(state.base_network.len(), 3);
        assert_eq!(state.base_network.edge_count(), 3);

        let topology = state.topology(1.0).unwrap();
        assert!(topology.has_edge(&AgentId::from("ana"), &AgentId::from("cy")));
    }

    #[test]
    fn test_json_round_trip() {
        let state = populated();
        let json = state.to_json().unwrap();
        assert!(json.contains("\"base_network\""));

        let back = WorldState::from_json(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let state = WorldState::from_json(r#"{"global_motifs": ["rivalry"]}"#).unwrap();
        assert!(state.base_network.is_empty());
        assert!(state.global_events.is_empty());
        assert!(state.local_events.is_empty());
        assert!(state.agent_states.is_empty());
        assert_eq!(state.global_motifs, vec!["rivalry".to_string()]);

        assert_eq!(WorldState::from_json("{}").unwrap(), WorldState::new());
    }

    #[test]
    fn test_malformed_payloads_fail() {
        // Description of the wrong type
        assert!(WorldState::from_json(r#"{"global_events": [{"description": 3}]}"#).is_err());
        // Wrong type for motifs
        assert!(WorldState::from_json(r#"{"global_motifs": "rivalry"}"#).is_err());
        // Network with a self-loop
        assert!(matches!(
            WorldState::from_json(r#"{"base_network": {"a": ["a"]}}"#),
            Err(SnapshotError::Invalid(TopologyError::SelfLoop(_)))
        ));
    }

    #[test]
    fn test_details_may_reuse_field_names() {
        let mut state = WorldState::new();
        state.record_global_event(
            EventRecord::new("storm")
                .with_detail("description", "extra")
                .with_detail("participants", 2),
        );
        state.push_agent_state(AgentSnapshot::new("ana").with_attribute("agent_id", "other"));

        let back = WorldState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.global_events[0].description, "storm");
        assert_eq!(back.global_events[0].details["description"], "extra");
        assert_eq!(back.agent_states[0].agent_id, AgentId::from("ana"));
        assert_eq!(back.agent_states[0].attribute("agent_id").unwrap(), "other");
    }

    #[test]
    fn test_event_without_description() {
        let state = WorldState::from_json(
            r#"{"local_events": [{"participants": ["ana"], "details": {"kind": "whisper"}}]}"#,
        )
        .unwrap();

        let event = &state.local_events[0];
        assert!(event.description.is_empty());
        assert_eq!(event.participants, vec![AgentId::from("ana")]);
        assert_eq!(event.details["kind"], "whisper");
    }

    #[test]
    fn test_agent_state_lookup() {
        let state = populated();
        let ana = state.agent_state(&AgentId::from("ana")).unwrap();
        assert_eq!(ana.attribute("mood").unwrap(), "anxious");
        assert!(state.agent_state(&AgentId::from("cy")).is_none());
    }

    #[test]
    fn test_display_summary() {
        let summary = populated().to_string();
        assert_eq!(
            summary,
            "WorldState(nodes=3, edges=3, global_events=1, local_events=1, agents=1, motifs=1)"
        );
    }
}
