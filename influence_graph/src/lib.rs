//! # Influence Graph
//!
//! The data side of the influence simulation: who the agents are, who
//! influences whom, and what the world looks like at a point in time.
//! This crate holds no dissemination logic.

pub mod agents;
pub mod error;
pub mod topology;
pub mod world_state;

pub use agents::*;
pub use error::*;
pub use topology::*;
pub use world_state::*;
