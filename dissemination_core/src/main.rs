//! Runs a seeded dissemination simulation and prints the resulting world
//! state as JSON.
//!
//! Each round the node broadcasts one seed event, scores the copies, commits
//! the important ones, clears its buffer, then proposes a few gated edge
//! reversals on the topology.

use clap::Parser;
use dissemination_core::{
    Chain, ContentRecord, KeywordScorer, MessageContent, MessageEnvelope, MessageType, Node,
    SimulationConfig,
};
use influence_graph::{
    AgentId, AgentSnapshot, EdgeAction, EventRecord, NetworkTopology, RandomAgreement, WorldState,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Events cycled through as broadcast sources.
const SEED_EVENTS: &[(&str, &str)] = &[
    ("A storm flattened the eastern fields", "weather"),
    ("The elders announced a harvest festival", "festival"),
    ("Rumours of a secret alliance between the river clans", "politics"),
    ("A trusted envoy was caught in a betrayal", "politics"),
    ("Border skirmishes may turn into open war", "conflict"),
    ("A traveller spoke of a death in the hills", "loss"),
];

/// Command line arguments for the simulation.
#[derive(Parser, Debug)]
#[command(name = "disseminate")]
#[command(about = "Simulate message dissemination over a random influence network")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of agents
    #[arg(long)]
    agents: Option<usize>,

    /// Override the number of rounds
    #[arg(long)]
    rounds: Option<u32>,

    /// Write the final world state here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(agents) = args.agents {
        config.run.agents = agents;
    }
    if let Some(rounds) = args.rounds {
        config.run.rounds = rounds;
    }
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let state = simulate(&config)?;
    let json = state.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(path = %path.display(), "world state written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn simulate(config: &SimulationConfig) -> Result<WorldState, Box<dyn std::error::Error>> {
    let seed = config.run.seed;
    let agents: Vec<AgentId> = (0..config.run.agents)
        .map(|i| AgentId::new(format!("agent-{i}")))
        .collect();

    let mut topology_rng = SmallRng::seed_from_u64(seed);
    let topology = NetworkTopology::generate(
        agents.clone(),
        config.topology.edge_probability,
        &mut topology_rng,
    )?;
    info!(
        topology = %topology,
        agents = agents.len(),
        edges = topology.edge_count(),
        "topology generated"
    );

    let node_config = config.node_config(&topology);
    let mut node = Node::with_parts(
        topology,
        KeywordScorer::new(config.scoring.clone()),
        Chain::new(),
        node_config,
        SmallRng::seed_from_u64(seed.wrapping_add(1)),
    )?;
    let mut agreement = RandomAgreement::new(
        config.agreement.acceptance_rate,
        SmallRng::seed_from_u64(seed.wrapping_add(2)),
    )?;
    let mut mutation_rng = SmallRng::seed_from_u64(seed.wrapping_add(3));
    let mut reversals = 0u32;

    for round in 0..config.run.rounds {
        let (text, motif) = SEED_EVENTS[round as usize % SEED_EVENTS.len()];
        let source = MessageEnvelope::new(
            AgentId::central(),
            AgentId::central(),
            MessageType::GlobalEvent,
            MessageContent::new()
                .with_record(ContentRecord::event(text))
                .with_record(ContentRecord::motif(motif)),
        );

        let report = node.run_round(&source)?;
        info!(
            round,
            delivered = report.delivered,
            committed = report.committed,
            "round complete"
        );
        node.clear_messages();

        for _ in 0..config.run.mutations_per_round {
            let edges: Vec<(AgentId, AgentId)> = node
                .topology()
                .edges()
                .map(|(s, e)| (s.clone(), e.clone()))
                .collect();
            if edges.is_empty() {
                break;
            }
            let (start, end) = &edges[mutation_rng.gen_range(0..edges.len())];
            match node
                .topology_mut()
                .execute(start, end, &mut agreement, EdgeAction::Reverse)
            {
                Ok(true) => reversals += 1,
                Ok(false) => {}
                Err(err) => warn!(%start, %end, error = %err, "reversal failed"),
            }
        }
    }
    info!(reversals, committed = node.history().len(), "simulation finished");

    Ok(build_world_state(&node, &agents))
}

/// Snapshot the node's topology and chain into a world state.
fn build_world_state<S>(node: &Node<S>, agents: &[AgentId]) -> WorldState
where
    S: dissemination_core::ImportanceScorer,
{
    let mut state = WorldState::from_topology(node.topology());

    for block in node.history().blocks() {
        let message = &block.message;
        let description = message
            .content
            .text_fragments()
            .next()
            .unwrap_or_default()
            .to_string();

        state.record_local_event(
            EventRecord::new(description)
                .with_participant(message.receiver.clone())
                .with_detail("block", block.index)
                .with_detail("importance", f64::from(message.importance())),
        );
    }

    for agent in agents {
        let received = node
            .history()
            .messages()
            .filter(|m| &m.receiver == agent)
            .count();
        state.push_agent_state(
            AgentSnapshot::new(agent.clone())
                .with_attribute("out_degree", node.topology().successors(agent).len())
                .with_attribute("committed_messages", received),
        );
    }

    let mut motifs: Vec<&str> = Vec::new();
    for record in node.history().messages().flat_map(|m| m.content.records()) {
        if let ContentRecord::Motif { motif } = record {
            if !motifs.contains(&motif.as_str()) {
                motifs.push(motif);
            }
        }
    }
    for motif in motifs {
        state.add_motif(motif);
    }

    state
}
