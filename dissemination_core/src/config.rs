//! Simulation configuration, loaded from TOML.
//!
//! Every section and field is optional; missing values take their defaults.

use influence_graph::{
    check_probability, NetworkTopology, DEFAULT_ACCEPTANCE_RATE, DEFAULT_EDGE_PROBABILITY,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::node::{NodeConfig, DEFAULT_IMPORTANCE_THRESHOLD};
use crate::scoring::ScoreWeights;

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub dissemination: DisseminationConfig,
    #[serde(default)]
    pub agreement: AgreementConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every probability and the threshold lie within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability(self.topology.edge_probability)?;
        if let Some(p) = self.dissemination.delivery_probability {
            check_probability(p)?;
        }
        check_probability(self.agreement.acceptance_rate)?;

        let threshold = self.dissemination.importance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }

    /// Pipeline parameters for a node running over `topology`.
    pub fn node_config(&self, topology: &NetworkTopology) -> NodeConfig {
        let config = NodeConfig::for_topology(topology)
            .with_importance_threshold(self.dissemination.importance_threshold);
        match self.dissemination.delivery_probability {
            Some(p) => config.with_delivery_probability(p),
            None => config,
        }
    }
}

/// Topology generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Chance that an ordered pair gets an edge.
    pub edge_probability: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            edge_probability: DEFAULT_EDGE_PROBABILITY,
        }
    }
}

/// Broadcast and commit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisseminationConfig {
    /// Per-agent delivery chance; falls back to the edge probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_probability: Option<f64>,
    /// Importance a message must strictly exceed to be committed.
    pub importance_threshold: f32,
}

impl Default for DisseminationConfig {
    fn default() -> Self {
        Self {
            delivery_probability: None,
            importance_threshold: DEFAULT_IMPORTANCE_THRESHOLD,
        }
    }
}

/// Edge mutation agreement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgreementConfig {
    /// Chance that a proposed mutation is accepted.
    pub acceptance_rate: f64,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            acceptance_rate: DEFAULT_ACCEPTANCE_RATE,
        }
    }
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for every random source in the run.
    pub seed: u64,
    /// Number of agents to create.
    pub agents: usize,
    /// Number of dissemination rounds.
    pub rounds: u32,
    /// Gated edge reversals proposed after each round.
    pub mutations_per_round: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            agents: 8,
            rounds: 5,
            mutations_per_round: 2,
        }
    }
}
