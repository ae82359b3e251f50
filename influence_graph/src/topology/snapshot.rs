//! Serializable adjacency view of a topology.
//!
//! The JSON form is an object mapping each agent id to its ordered list of
//! out-neighbours. Entry order follows the topology's node order, so the
//! snapshot is a sequence of pairs rather than a hash map.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::agents::AgentId;

/// Ordered adjacency list of a directed graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologySnapshot {
    adjacency: Vec<(AgentId, Vec<AgentId>)>,
}

impl TopologySnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node with its out-neighbours.
    pub fn push(&mut self, node: AgentId, successors: Vec<AgentId>) {
        self.adjacency.push((node, successors));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_node(mut self, node: impl Into<AgentId>, successors: &[&str]) -> Self {
        self.push(
            node.into(),
            successors.iter().map(|s| AgentId::from(*s)).collect(),
        );
        self
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AgentId> {
        self.adjacency.iter().map(|(node, _)| node)
    }

    /// Out-neighbours of a node, or `None` if the node is not listed.
    pub fn successors(&self, node: &AgentId) -> Option<&[AgentId]> {
        self.adjacency
            .iter()
            .find(|(n, _)| n == node)
            .map(|(_, succ)| succ.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &[AgentId])> {
        self.adjacency
            .iter()
            .map(|(node, succ)| (node, succ.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|(_, succ)| succ.len()).sum()
    }
}

impl Serialize for TopologySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.adjacency.iter().map(|(node, succ)| (node, succ)))
    }
}

impl<'de> Deserialize<'de> for TopologySnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AdjacencyVisitor)
    }
}

struct AdjacencyVisitor;

impl<'de> Visitor<'de> for AdjacencyVisitor {
    type Value = TopologySnapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from agent id to a list of out-neighbour ids")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut adjacency = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((node, successors)) = map.next_entry::<AgentId, Vec<AgentId>>()? {
            adjacency.push((node, successors));
        }
        Ok(TopologySnapshot { adjacency })
    }
}
