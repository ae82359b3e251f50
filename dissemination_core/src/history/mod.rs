//! History log - the append-only record of committed messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MessageEnvelope;

/// Raised when the history log refuses an append.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommitError {
    #[error("history log rejected block: {0}")]
    Rejected(String),
}

/// Append-only destination for committed messages.
pub trait HistoryLog {
    fn add_block(&mut self, message: MessageEnvelope) -> Result<(), CommitError>;
}

/// One committed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 0.
    pub index: u64,
    pub message: MessageEnvelope,
    pub committed_at: DateTime<Utc>,
}

/// In-memory chain of blocks local to one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,

    /// Maximum number of blocks, if bounded.
    #[serde(default)]
    capacity: Option<usize>,
}

impl Chain {
    /// Create an unbounded chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain that rejects appends once it holds `capacity` blocks.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            blocks: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Committed messages in commit order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageEnvelope> {
        self.blocks.iter().map(|b| &b.message)
    }
}

impl HistoryLog for Chain {
    fn add_block(&mut self, message: MessageEnvelope) -> Result<(), CommitError> {
        if let Some(capacity) = self.capacity {
            if self.blocks.len() >= capacity {
                return Err(CommitError::Rejected(format!(
                    "chain is full ({capacity} blocks)"
                )));
            }
        }

        self.blocks.push(Block {
            index: self.blocks.len() as u64,
            message,
            committed_at: Utc::now(),
        });
        Ok(())
    }
}
