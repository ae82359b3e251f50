//! Node - runs the broadcast, evaluate, cherry-pick pipeline over one topology.
//!
//! A dissemination round is three strictly ordered phases:
//! 1. **Broadcast**: every agent in the topology independently receives a
//!    copy of the source message with the delivery probability.
//! 2. **Evaluate**: every buffered message is scored by the injected scorer.
//! 3. **Cherry-pick**: buffered messages scoring above the threshold are
//!    appended to the history log, in buffer order.
//!
//! The buffer is never drained by the pipeline itself.

use influence_graph::{check_probability, AgentId, NetworkTopology};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::channel::BroadcastChannel;
use crate::error::NodeError;
use crate::history::{Chain, HistoryLog};
use crate::message::MessageEnvelope;
use crate::scoring::{validate_score, ImportanceScorer};

/// Unique identifier for nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Importance a message must strictly exceed to be committed.
pub const DEFAULT_IMPORTANCE_THRESHOLD: f32 = 0.5;

/// Pipeline parameters for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeConfig {
    /// Chance that a given agent receives a broadcast copy.
    pub delivery_probability: f64,

    /// Importance a message must strictly exceed to be committed.
    pub importance_threshold: f32,
}

impl NodeConfig {
    /// Deliver with the topology's edge probability and the default threshold.
    pub fn for_topology(topology: &NetworkTopology) -> Self {
        Self {
            delivery_probability: topology.edge_probability(),
            importance_threshold: DEFAULT_IMPORTANCE_THRESHOLD,
        }
    }

    pub fn with_delivery_probability(mut self, p: f64) -> Self {
        self.delivery_probability = p;
        self
    }

    pub fn with_importance_threshold(mut self, threshold: f32) -> Self {
        self.importance_threshold = threshold;
        self
    }
}

/// Outcome of one full round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundReport {
    /// Copies appended to the buffer by the broadcast phase.
    pub delivered: usize,
    /// Messages scored by the evaluate phase.
    pub evaluated: usize,
    /// Messages appended to the history log by the cherry-pick phase.
    pub committed: usize,
}

/// Binds a topology, a broadcast buffer, and a history log.
pub struct Node<S, H = Chain> {
    id: NodeId,
    topology: NetworkTopology,
    channel: BroadcastChannel,
    history: H,
    scorer: S,
    rng: SmallRng,
    config: NodeConfig,
}

impl<S: ImportanceScorer> Node<S, Chain> {
    /// Create a node with an empty in-memory chain and a config derived from
    /// the topology.
    pub fn new(topology: NetworkTopology, scorer: S, rng: SmallRng) -> Self {
        let config = NodeConfig::for_topology(&topology);
        Self {
            id: NodeId::new(),
            channel: BroadcastChannel::for_topology(topology.id()),
            topology,
            history: Chain::new(),
            scorer,
            rng,
            config,
        }
    }
}

impl<S, H> Node<S, H>
where
    S: ImportanceScorer,
    H: HistoryLog,
{
    /// Create a node from explicit parts.
    pub fn with_parts(
        topology: NetworkTopology,
        scorer: S,
        history: H,
        config: NodeConfig,
        rng: SmallRng,
    ) -> Result<Self, NodeError> {
        check_probability(config.delivery_probability)?;
        if !(0.0..=1.0).contains(&config.importance_threshold) {
            return Err(NodeError::InvalidThreshold(config.importance_threshold));
        }

        Ok(Self {
            id: NodeId::new(),
            channel: BroadcastChannel::for_topology(topology.id()),
            topology,
            history,
            scorer,
            rng,
            config,
        })
    }

    /// Fan `source` out to the topology's agents.
    ///
    /// Each agent independently receives a copy, sent from the central
    /// sentinel, with the delivery probability. Returns the number of copies
    /// appended to the buffer.
    pub fn broadcast_messages(&mut self, source: &MessageEnvelope) -> usize {
        let p = self.config.delivery_probability;
        let mut delivered = 0;

        for agent in self.topology.nodes() {
            if self.rng.gen::<f64>() < p {
                self.channel
                    .push(source.readdressed(AgentId::central(), agent.clone()));
                delivered += 1;
            } else {
                trace!(node = %self.id, %agent, "delivery skipped");
            }
        }

        debug!(node = %self.id, delivered, buffered = self.channel.len(), "broadcast");
        delivered
    }

    /// Score every buffered message and write the score into its content.
    ///
    /// All scores are computed before any is written back, so a failure
    /// leaves the buffer untouched. Returns the number of messages scored.
    pub fn evaluate_messages(&mut self) -> Result<usize, NodeError> {
        let mut scores = Vec::with_capacity(self.channel.len());

        for (index, message) in self.channel.messages().iter().enumerate() {
            let score = self
                .scorer
                .evaluate(&message.content)
                .and_then(validate_score)
                .map_err(|source| {
                    warn!(node = %self.id, index, error = %source, "evaluation aborted");
                    NodeError::Scoring {
                        index,
                        receiver: message.receiver.clone(),
                        source,
                    }
                })?;
            scores.push(score);
        }

        let evaluated = scores.len();
        for (message, score) in self.channel.messages_mut().iter_mut().zip(scores) {
            message.set_importance(score);
        }

        debug!(node = %self.id, evaluated, "evaluated");
        Ok(evaluated)
    }

    /// Commit buffered messages scoring strictly above the threshold.
    ///
    /// Messages are committed in buffer order and stay in the buffer. On a
    /// rejected append the pass stops; earlier commits are kept. Returns the
    /// number committed.
    pub fn cherrypick_messages(&mut self) -> Result<usize, NodeError> {
        let threshold = self.config.importance_threshold;
        let mut committed = 0;

        for (index, message) in self.channel.messages().iter().enumerate() {
            if message.importance() <= threshold {
                continue;
            }
            self.history
                .add_block(message.clone())
                .map_err(|source| {
                    warn!(node = %self.id, index, committed, error = %source, "commit rejected");
                    NodeError::Commit {
                        index,
                        committed,
                        source,
                    }
                })?;
            committed += 1;
        }

        debug!(node = %self.id, committed, threshold, "cherry-picked");
        Ok(committed)
    }

    /// Broadcast, evaluate, then cherry-pick.
    pub fn run_round(&mut self, source: &MessageEnvelope) -> Result<RoundReport, NodeError> {
        let delivered = self.broadcast_messages(source);
        let evaluated = self.evaluate_messages()?;
        let committed = self.cherrypick_messages()?;
        Ok(RoundReport {
            delivered,
            evaluated,
            committed,
        })
    }

    /// Empty the broadcast buffer.
    pub fn clear_messages(&mut self) {
        self.channel.clear();
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn topology(&self) -> &NetworkTopology {
        &self.topology
    }

    /// Mutable access for gated edge mutations between rounds.
    pub fn topology_mut(&mut self) -> &mut NetworkTopology {
        &mut self.topology
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CommitError;
    use crate::message::{MessageContent, MessageType};
    use crate::scoring::{KeywordScorer, ScoringError};
    use rand::SeedableRng;
    use std::collections::VecDeque;

    fn topology(p: f64) -> NetworkTopology {
        let mut rng = SmallRng::seed_from_u64(1);
        NetworkTopology::generate(["A", "B", "C"], p, &mut rng).unwrap()
    }

    fn source(text: &str) -> MessageEnvelope {
        MessageEnvelope::new(
            AgentId::central(),
            AgentId::central(),
            MessageType::GlobalEvent,
            MessageContent::from_text(text),
        )
    }

    /// Scorer that returns queued scores in order.
    fn scripted(scores: &[f32]) -> impl FnMut(&MessageContent) -> Result<f32, ScoringError> {
        let mut queue: VecDeque<f32> = scores.iter().copied().collect();
        move |_: &MessageContent| {
            queue
                .pop_front()
                .ok_or_else(|| ScoringError::Failed("script exhausted".to_string()))
        }
    }

    /// History log that rejects the n-th append.
    struct FailingLog {
        accepted: Vec<MessageEnvelope>,
        fail_at: usize,
    }

    impl HistoryLog for FailingLog {
        fn add_block(&mut self, message: MessageEnvelope) -> Result<(), CommitError> {
            if self.accepted.len() == self.fail_at {
                return Err(CommitError::Rejected("disk full".to_string()));
            }
            self.accepted.push(message);
            Ok(())
        }
    }

    #[test]
    fn test_delivery_defaults_to_edge_probability() {
        let node = Node::new(topology(0.3), KeywordScorer::default(), SmallRng::seed_from_u64(0));
        assert_eq!(node.config().delivery_probability, 0.3);
        assert_eq!(node.config().importance_threshold, DEFAULT_IMPORTANCE_THRESHOLD);
        assert_eq!(node.channel().topologies(), &[node.topology().id()]);
    }

    #[test]
    fn test_broadcast_full_probability_reaches_everyone_once() {
        let mut node = Node::new(topology(1.0), KeywordScorer::default(), SmallRng::seed_from_u64(0));

        let delivered = node.broadcast_messages(&source("news"));
        assert_eq!(delivered, 3);

        let receivers: Vec<_> = node
            .channel()
            .messages()
            .iter()
            .map(|m| m.receiver.as_str())
            .collect();
        assert_eq!(receivers, vec!["A", "B", "C"]);
        assert!(node.channel().messages().iter().all(|m| m.sender.is_central()));
    }

    #[test]
    fn test_broadcast_zero_probability_reaches_nobody() {
        let config = NodeConfig::for_topology(&topology(1.0)).with_delivery_probability(0.0);
        let mut node = Node::with_parts(
            topology(1.0),
            KeywordScorer::default(),
            Chain::new(),
            config,
            SmallRng::seed_from_u64(0),
        )
        .unwrap();

        for _ in 0..10 {
            assert_eq!(node.broadcast_messages(&source("news")), 0);
        }
        assert!(node.channel().is_empty());
    }

    #[test]
    fn test_with_parts_rejects_bad_config() {
        let bad_p = NodeConfig::for_topology(&topology(0.5)).with_delivery_probability(2.0);
        assert!(Node::with_parts(
            topology(0.5),
            KeywordScorer::default(),
            Chain::new(),
            bad_p,
            SmallRng::seed_from_u64(0)
        )
        .is_err());

        let bad_threshold = NodeConfig::for_topology(&topology(0.5)).with_importance_threshold(-1.0);
        assert!(Node::with_parts(
            topology(0.5),
            KeywordScorer::default(),
            Chain::new(),
            bad_threshold,
            SmallRng::seed_from_u64(0)
        )
        .is_err());
    }

    #[test]
    fn test_evaluate_scores_every_buffered_message() {
        let mut node = Node::new(topology(1.0), KeywordScorer::default(), SmallRng::seed_from_u64(0));
        let outside = source("secret war");
        node.broadcast_messages(&source("secret war"));

        assert_eq!(node.evaluate_messages().unwrap(), 3);
        assert!(node.channel().messages().iter().all(MessageEnvelope::is_scored));
        assert!(!outside.is_scored());
    }

    #[test]
    fn test_reevaluation_does_not_touch_committed_messages() {
        let mut node = Node::new(
            topology(1.0),
            scripted(&[0.9, 0.9, 0.9, 0.1, 0.1, 0.1]),
            SmallRng::seed_from_u64(0),
        );
        node.broadcast_messages(&source("news"));
        node.evaluate_messages().unwrap();
        assert_eq!(node.cherrypick_messages().unwrap(), 3);

        assert_eq!(node.evaluate_messages().unwrap(), 3);
        assert!(node.channel().messages().iter().all(|m| m.importance() == 0.1));
        assert_eq!(node.history().len(), 3);
        assert!(node.history().messages().all(|m| m.importance() == 0.9));
    }

    #[test]
    fn test_evaluate_failure_leaves_buffer_untouched() {
        let mut node = Node::new(topology(1.0), scripted(&[0.9, 0.8]), SmallRng::seed_from_u64(0));
        node.broadcast_messages(&source("news"));

        let err = node.evaluate_messages().unwrap_err();
        assert!(matches!(
            err,
            NodeError::Scoring { index: 2, source: ScoringError::Failed(_), .. }
        ));
        assert!(node.channel().messages().iter().all(|m| !m.is_scored()));
    }

    #[test]
    fn test_evaluate_rejects_out_of_range_scores() {
        let mut node = Node::new(topology(1.0), scripted(&[0.2, 1.5, 0.1]), SmallRng::seed_from_u64(0));
        node.broadcast_messages(&source("news"));

        let err = node.evaluate_messages().unwrap_err();
        assert!(matches!(
            err,
            NodeError::Scoring { index: 1, source: ScoringError::InvalidScore(_), .. }
        ));
    }

    #[test]
    fn test_reevaluation_overwrites_scores() {
        let mut node = Node::new(
            topology(1.0),
            scripted(&[0.1, 0.1, 0.1, 0.9, 0.9, 0.9]),
            SmallRng::seed_from_u64(0),
        );
        node.broadcast_messages(&source("news"));

        node.evaluate_messages().unwrap();
        node.evaluate_messages().unwrap();

        for message in node.channel().messages() {
            assert_eq!(message.importance(), 0.9);
            assert_eq!(message.content.len(), 2);
        }
    }

    #[test]
    fn test_cherrypick_commits_strictly_above_threshold() {
        let mut node = Node::new(topology(1.0), scripted(&[0.9, 0.5, 0.6]), SmallRng::seed_from_u64(0));
        node.broadcast_messages(&source("news"));
        node.evaluate_messages().unwrap();

        assert_eq!(node.cherrypick_messages().unwrap(), 2);

        let committed: Vec<_> = node.history().messages().map(|m| m.receiver.as_str()).collect();
        assert_eq!(committed, vec!["A", "C"]);
        assert_eq!(node.channel().len(), 3);
    }

    #[test]
    fn test_cherrypick_unscored_messages_are_not_committed() {
        let mut node = Node::new(topology(1.0), KeywordScorer::default(), SmallRng::seed_from_u64(0));
        node.broadcast_messages(&source("betrayal"));

        assert_eq!(node.cherrypick_messages().unwrap(), 0);
        assert!(node.history().is_empty());
    }

    #[test]
    fn test_commit_failure_keeps_earlier_commits() {
        let config = NodeConfig::for_topology(&topology(1.0));
        let log = FailingLog {
            accepted: Vec::new(),
            fail_at: 1,
        };
        let mut node = Node::with_parts(
            topology(1.0),
            scripted(&[0.9, 0.8, 0.7]),
            log,
            config,
            SmallRng::seed_from_u64(0),
        )
        .unwrap();
        node.broadcast_messages(&source("news"));
        node.evaluate_messages().unwrap();

        let err = node.cherrypick_messages().unwrap_err();
        assert!(matches!(err, NodeError::Commit { index: 1, committed: 1, .. }));
        assert_eq!(node.history().accepted.len(), 1);
        assert_eq!(node.history().accepted[0].receiver, AgentId::from("A"));
    }

    #[test]
    fn test_run_round_and_clear() {
        let mut node = Node::new(topology(1.0), KeywordScorer::default(), SmallRng::seed_from_u64(0));

        let report = node.run_round(&source("a betrayal at the festival")).unwrap();
        assert_eq!(
            report,
            RoundReport {
                delivered: 3,
                evaluated: 3,
                committed: 3
            }
        );

        node.clear_messages();
        assert!(node.channel().is_empty());
        assert_eq!(node.history().len(), 3);
    }

    #[test]
    fn test_same_seed_same_deliveries() {
        let receivers = |seed: u64| {
            let mut node = Node::new(topology(0.5), KeywordScorer::default(), SmallRng::seed_from_u64(seed));
            for _ in 0..5 {
                node.broadcast_messages(&source("news"));
            }
            node.channel()
                .messages()
                .iter()
                .map(|m| m.receiver.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(receivers(77), receivers(77));
    }
}
