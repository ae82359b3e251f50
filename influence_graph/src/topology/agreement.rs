//! Gated topology mutations.
//!
//! An [`Agreement`] decides whether both endpoints consent to a proposed
//! [`EdgeAction`]. The default protocol is a coin flip; closures can be used
//! wherever a deterministic or negotiated rule is needed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::check_probability;
use crate::agents::AgentId;
use crate::error::TopologyError;

/// Acceptance rate of the default agreement protocol.
pub const DEFAULT_ACCEPTANCE_RATE: f64 = 0.5;

/// Edge mutations that can be proposed through
/// [`NetworkTopology::execute`](super::NetworkTopology::execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAction {
    /// Flip `start -> end` into `end -> start`.
    Reverse,
    /// Drop `start -> end`.
    Disconnect,
    /// Add `start -> end`.
    Connect,
}

impl EdgeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeAction::Reverse => "reverse",
            EdgeAction::Disconnect => "disconnect",
            EdgeAction::Connect => "connect",
        }
    }
}

impl FromStr for EdgeAction {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reverse" => Ok(EdgeAction::Reverse),
            "disconnect" => Ok(EdgeAction::Disconnect),
            "connect" => Ok(EdgeAction::Connect),
            other => Err(TopologyError::UnknownAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for EdgeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate gating a proposed edge mutation.
pub trait Agreement {
    /// Return true if both endpoints accept `action` on `start -> end`.
    fn agree(&mut self, start: &AgentId, end: &AgentId, action: EdgeAction) -> bool;
}

impl<F> Agreement for F
where
    F: FnMut(&AgentId, &AgentId, EdgeAction) -> bool,
{
    fn agree(&mut self, start: &AgentId, end: &AgentId, action: EdgeAction) -> bool {
        self(start, end, action)
    }
}

/// Accepts any proposal with a fixed probability, independent of its arguments.
#[derive(Debug, Clone)]
pub struct RandomAgreement<R = SmallRng> {
    acceptance_rate: f64,
    rng: R,
}

impl RandomAgreement<SmallRng> {
    /// Default coin-flip protocol with a seeded generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            acceptance_rate: DEFAULT_ACCEPTANCE_RATE,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomAgreement<R> {
    /// Create a protocol accepting with `acceptance_rate`, drawing from `rng`.
    pub fn new(acceptance_rate: f64, rng: R) -> Result<Self, TopologyError> {
        Ok(Self {
            acceptance_rate: check_probability(acceptance_rate)?,
            rng,
        })
    }

    pub fn acceptance_rate(&self) -> f64 {
        self.acceptance_rate
    }
}

impl<R: Rng> Agreement for RandomAgreement<R> {
    fn agree(&mut self, _start: &AgentId, _end: &AgentId, _action: EdgeAction) -> bool {
        self.rng.gen::<f64>() < self.acceptance_rate
    }
}
