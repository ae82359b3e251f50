//! # Dissemination Core
//!
//! Moves messages through an influence network and decides which of them a
//! node keeps. Works on top of `influence_graph`.
//!
//! ## Core Components
//!
//! - **message**: Envelopes with typed content and monotonic timestamps
//! - **channel**: Ordered buffer of in-flight messages
//! - **scoring**: Importance scorer seam plus a keyword-weight scorer
//! - **history**: Append-only log seam plus an in-memory chain
//! - **node**: The broadcast, evaluate, cherry-pick pipeline
//! - **config**: TOML configuration for the whole simulation

pub mod channel;
pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod node;
pub mod scoring;

pub use channel::*;
pub use config::*;
pub use error::*;
pub use history::*;
pub use message::*;
pub use node::*;
pub use scoring::*;
