//! Broadcast channel - the transient buffer of in-flight messages.

use influence_graph::TopologyId;

use crate::message::MessageEnvelope;

/// Ordered buffer of messages awaiting evaluation and commit.
///
/// Insertion order is preserved. Nothing is removed except by
/// [`clear`](Self::clear).
#[derive(Debug, Clone, Default)]
pub struct BroadcastChannel {
    messages: Vec<MessageEnvelope>,

    /// Topologies this channel fans out across.
    topologies: Vec<TopologyId>,
}

impl BroadcastChannel {
    /// Create an empty channel with no associated topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty channel bound to one topology.
    pub fn for_topology(topology: TopologyId) -> Self {
        Self {
            messages: Vec::new(),
            topologies: vec![topology],
        }
    }

    /// Associate another topology. Returns false if it was already associated.
    pub fn associate(&mut self, topology: TopologyId) -> bool {
        if self.topologies.contains(&topology) {
            return false;
        }
        self.topologies.push(topology);
        true
    }

    pub fn topologies(&self) -> &[TopologyId] {
        &self.topologies
    }

    pub fn push(&mut self, message: MessageEnvelope) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[MessageEnvelope] {
        &self.messages
    }

    pub(crate) fn messages_mut(&mut self) -> &mut [MessageEnvelope] {
        &mut self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages whose importance is at least `threshold`.
    pub fn filter_by_importance(&self, threshold: f32) -> Vec<&MessageEnvelope> {
        self.messages
            .iter()
            .filter(|m| m.importance() >= threshold)
            .collect()
    }

    /// Messages whose importance strictly exceeds `threshold`, in buffer order.
    pub fn above_threshold(&self, threshold: f32) -> Vec<&MessageEnvelope> {
        self.messages
            .iter()
            .filter(|m| m.importance() > threshold)
            .collect()
    }

    /// Drop every buffered message. Associations are kept.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
