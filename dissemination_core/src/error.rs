//! Error types for the `dissemination_core` crate.

use influence_graph::{AgentId, TopologyError};

use crate::history::CommitError;
use crate::scoring::ScoringError;

/// Errors surfaced by a node's pipeline phases.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Evaluation aborted; no message in the buffer was updated.
    #[error("scoring message {index} for {receiver} failed: {source}")]
    Scoring {
        /// Buffer position of the failing message.
        index: usize,
        /// Receiver of the failing message.
        receiver: AgentId,
        source: ScoringError,
    },

    /// Cherry-pick stopped; the first `committed` qualifying messages stay
    /// in the history log.
    #[error("committing message {index} failed after {committed} commits: {source}")]
    Commit {
        /// Buffer position of the rejected message.
        index: usize,
        /// Messages committed earlier in the same pass.
        committed: usize,
        source: CommitError,
    },

    /// The commit threshold is not within `[0, 1]`.
    #[error("importance threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    /// Invalid probability or topology mutation.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] TopologyError),

    #[error("importance threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),
}
