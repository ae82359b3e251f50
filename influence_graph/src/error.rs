//! Error types for the `influence_graph` crate.

use crate::agents::AgentId;

/// Errors raised while building or mutating a [`NetworkTopology`](crate::NetworkTopology).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    /// A probability was NaN or outside `[0, 1]`.
    #[error("probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    /// The same agent was listed twice when building a topology.
    #[error("duplicate agent id: {0}")]
    DuplicateAgent(AgentId),

    /// The id is reserved for the broadcast sender and cannot name an agent.
    #[error("agent id {0} is reserved")]
    ReservedAgent(AgentId),

    /// The agent is not part of the topology's node set.
    #[error("agent not found in topology: {0}")]
    UnknownAgent(AgentId),

    /// An edge from an agent to itself was requested.
    #[error("self-loop on agent {0} is not allowed")]
    SelfLoop(AgentId),

    /// Adding the edge would leave both directions between two agents.
    #[error("edge {start} -> {end} would pair with existing edge {end} -> {start}")]
    BidirectionalEdge {
        /// Requested tail.
        start: AgentId,
        /// Requested head.
        end: AgentId,
    },

    /// The edge to reverse does not exist.
    #[error("cannot reverse missing edge {start} -> {end}")]
    MissingEdge {
        /// Expected tail.
        start: AgentId,
        /// Expected head.
        end: AgentId,
    },

    /// A gated mutation was requested by an unrecognized name.
    #[error("unknown edge action: {0}")]
    UnknownAction(String),
}

impl TopologyError {
    /// True for caller logic errors against an existing graph (as opposed to
    /// construction-time validation).
    pub fn is_invalid_mutation(&self) -> bool {
        matches!(
            self,
            Self::MissingEdge { .. }
                | Self::UnknownAction(_)
                | Self::SelfLoop(_)
                | Self::BidirectionalEdge { .. }
        )
    }
}

/// Errors raised while encoding or decoding JSON snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The payload could not be parsed or is missing required fields.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed but violates a graph invariant.
    #[error("malformed snapshot: {0}")]
    Invalid(#[from] TopologyError),
}
