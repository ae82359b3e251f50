//! Network topology - the directed influence graph between agents.
//!
//! The graph is a plain adjacency list over a fixed node set. Two invariants
//! hold after construction and after every mutation:
//! - no self-loops;
//! - for distinct agents `a`, `b`, at most one of `a -> b`, `b -> a` exists.

mod agreement;
mod snapshot;

pub use agreement::*;
pub use snapshot::*;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::agents::AgentId;
use crate::error::{SnapshotError, TopologyError};

/// Edge probability used when none is given.
pub const DEFAULT_EDGE_PROBABILITY: f64 = 0.5;

/// Validate that `p` is a probability.
pub fn check_probability(p: f64) -> Result<f64, TopologyError> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(TopologyError::InvalidProbability(p))
    }
}

/// Unique identifier for topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyId(pub Uuid);

impl TopologyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TopologyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TopologyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directed graph of influence relationships over a fixed set of agents.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    id: TopologyId,

    /// Probability used when generating edges.
    edge_probability: f64,

    /// Agents in construction order.
    nodes: Vec<AgentId>,

    /// Out-neighbours per agent, in the order the edges were added.
    successors: HashMap<AgentId, Vec<AgentId>>,
}

impl NetworkTopology {
    /// Create a topology with one node per agent and no edges.
    ///
    /// The broadcast sentinel ([`AgentId::CENTRAL`]) is not a valid agent.
    pub fn empty<I, A>(agent_ids: I, edge_probability: f64) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
    {
        let edge_probability = check_probability(edge_probability)?;
        let mut nodes = Vec::new();
        let mut successors = HashMap::new();

        for agent in agent_ids {
            let agent = agent.into();
            if agent.is_central() {
                return Err(TopologyError::ReservedAgent(agent));
            }
            if successors.contains_key(&agent) {
                return Err(TopologyError::DuplicateAgent(agent));
            }
            successors.insert(agent.clone(), Vec::new());
            nodes.push(agent);
        }

        Ok(Self {
            id: TopologyId::new(),
            edge_probability,
            nodes,
            successors,
        })
    }

    /// Build a random topology over `agent_ids`.
    ///
    /// Ordered pairs are visited in permutation order of the input: for each
    /// `start` in input order, each `end` in input order, skipping
    /// `start == end`. A pair is skipped when `end -> start` already exists;
    /// otherwise `start -> end` is added if a uniform draw from `[0, 1)` is
    /// below `edge_probability`. Whichever direction of a pair is visited
    /// first gets the only draw.
    pub fn generate<I, A, R>(
        agent_ids: I,
        edge_probability: f64,
        rng: &mut R,
    ) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
        R: Rng + ?Sized,
    {
        let mut topology = Self::empty(agent_ids, edge_probability)?;
        topology.generate_edges(rng);
        debug!(
            topology = %topology.id,
            nodes = topology.nodes.len(),
            edges = topology.edge_count(),
            p = topology.edge_probability,
            "generated random topology"
        );
        Ok(topology)
    }

    fn generate_edges<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for start in &self.nodes {
            for end in &self.nodes {
                if start == end || self.has_edge(end, start) {
                    continue;
                }
                if rng.gen::<f64>() < self.edge_probability {
                    if let Some(out) = self.successors.get_mut(start) {
                        out.push(end.clone());
                    }
                }
            }
        }
    }

    /// Rebuild a topology from its adjacency snapshot.
    ///
    /// Every neighbour must be a listed node and the edges must satisfy the
    /// graph invariants.
    pub fn from_snapshot(
        snapshot: &TopologySnapshot,
        edge_probability: f64,
    ) -> Result<Self, TopologyError> {
        let mut topology = Self::empty(snapshot.nodes().cloned(), edge_probability)?;
        for (node, successors) in snapshot.iter() {
            for succ in successors {
                topology.connect_edge(node, succ)?;
            }
        }
        Ok(topology)
    }

    /// Adjacency snapshot in node order.
    pub fn snapshot(&self) -> TopologySnapshot {
        let mut snapshot = TopologySnapshot::new();
        for node in &self.nodes {
            snapshot.push(node.clone(), self.successors(node).to_vec());
        }
        snapshot
    }

    /// Pretty-printed JSON adjacency map.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Decode a JSON adjacency map. The result gets a fresh id and the
    /// default edge probability.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: TopologySnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(&snapshot, DEFAULT_EDGE_PROBABILITY)?)
    }

    pub fn id(&self) -> TopologyId {
        self.id
    }

    pub fn edge_probability(&self) -> f64 {
        self.edge_probability
    }

    /// Agents in construction order.
    pub fn nodes(&self) -> &[AgentId] {
        &self.nodes
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.successors.contains_key(agent)
    }

    pub fn has_edge(&self, start: &AgentId, end: &AgentId) -> bool {
        self.successors
            .get(start)
            .is_some_and(|out| out.contains(end))
    }

    /// Out-neighbours of `agent`; empty for unknown agents.
    pub fn successors(&self, agent: &AgentId) -> &[AgentId] {
        self.successors.get(agent).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All edges as `(start, end)` pairs, in node order.
    pub fn edges(&self) -> impl Iterator<Item = (&AgentId, &AgentId)> {
        self.nodes
            .iter()
            .flat_map(move |start| self.successors(start).iter().map(move |end| (start, end)))
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(Vec::len).sum()
    }

    fn require_agent(&self, agent: &AgentId) -> Result<(), TopologyError> {
        if self.contains(agent) {
            Ok(())
        } else {
            Err(TopologyError::UnknownAgent(agent.clone()))
        }
    }

    /// Add `start -> end` if absent.
    ///
    /// Returns whether the edge set changed. Refuses self-loops and edges
    /// whose reverse is already present.
    pub fn connect_edge(&mut self, start: &AgentId, end: &AgentId) -> Result<bool, TopologyError> {
        self.require_agent(start)?;
        self.require_agent(end)?;
        if start == end {
            return Err(TopologyError::SelfLoop(start.clone()));
        }
        if self.has_edge(start, end) {
            return Ok(false);
        }
        if self.has_edge(end, start) {
            return Err(TopologyError::BidirectionalEdge {
                start: start.clone(),
                end: end.clone(),
            });
        }

        if let Some(out) = self.successors.get_mut(start) {
            out.push(end.clone());
        }
        Ok(true)
    }

    /// Remove `start -> end` if present. Returns whether the edge set changed.
    pub fn disconnect_edge(&mut self, start: &AgentId, end: &AgentId) -> bool {
        match self.successors.get_mut(start) {
            Some(out) => match out.iter().position(|n| n == end) {
                Some(pos) => {
                    out.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Replace `start -> end` with `end -> start`.
    pub fn reverse_edge(&mut self, start: &AgentId, end: &AgentId) -> Result<(), TopologyError> {
        if !self.disconnect_edge(start, end) {
            return Err(TopologyError::MissingEdge {
                start: start.clone(),
                end: end.clone(),
            });
        }
        if let Some(out) = self.successors.get_mut(end) {
            out.push(start.clone());
        }
        Ok(())
    }

    /// Apply `action` to `start -> end` if and only if `agreement` accepts it.
    ///
    /// Returns whether the action was applied. Errors from the underlying
    /// mutation (e.g. reversing a missing edge) are returned as-is.
    pub fn execute<G>(
        &mut self,
        start: &AgentId,
        end: &AgentId,
        agreement: &mut G,
        action: EdgeAction,
    ) -> Result<bool, TopologyError>
    where
        G: Agreement + ?Sized,
    {
        if !agreement.agree(start, end, action) {
            trace!(%start, %end, %action, "mutation declined");
            return Ok(false);
        }

        match action {
            EdgeAction::Reverse => self.reverse_edge(start, end)?,
            EdgeAction::Disconnect => {
                self.disconnect_edge(start, end);
            }
            EdgeAction::Connect => {
                self.connect_edge(start, end)?;
            }
        }
        trace!(%start, %end, %action, "mutation applied");
        Ok(true)
    }

    /// [`execute`](Self::execute) with the action given by name.
    pub fn execute_named<G>(
        &mut self,
        start: &AgentId,
        end: &AgentId,
        agreement: &mut G,
        action: &str,
    ) -> Result<bool, TopologyError>
    where
        G: Agreement + ?Sized,
    {
        let action = action.parse::<EdgeAction>()?;
        self.execute(start, end, agreement, action)
    }
}

impl std::fmt::Display for NetworkTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
