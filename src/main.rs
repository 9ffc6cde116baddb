mod app;
mod sim;
mod util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui::vec2;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::sim::{EmbeddingWorker, HttpEmbedder, Participant, SimConfig, SimulationState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Number of generated nodes (overrides the config file).
    #[arg(long)]
    nodes: Option<usize>,
    /// Seed for every random choice; omit for a different run each time.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file overriding simulation constants.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Text-embedding endpoint; without it propagation is never similarity-biased.
    #[arg(long)]
    embedding_url: Option<String>,
    #[arg(long, default_value_t = 8)]
    embedding_timeout_secs: u64,
    /// Sign in under this display name at start.
    #[arg(long)]
    participant: Option<String>,
    /// Disable autonomous events.
    #[arg(long)]
    no_auto: bool,
}

fn build_simulation(args: &Args) -> Result<SimulationState> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(nodes) = args.nodes {
        config.node_count = nodes;
    }

    let mut sim = SimulationState::new(config, vec2(1100.0, 820.0), args.seed);
    if let Some(url) = &args.embedding_url {
        let embedder = HttpEmbedder::new(url.as_str(), Duration::from_secs(args.embedding_timeout_secs))
            .context("failed to build embedding client")?;
        sim = sim.with_embeddings(EmbeddingWorker::spawn(Arc::new(embedder)));
        info!(%url, "similarity biasing enabled");
    }
    sim.set_auto_events(!args.no_auto);

    if let Some(name) = args.participant.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
        sim.sign_in(&Participant::local_id(name), name);
    }
    Ok(sim)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let sim = build_simulation(&args)?;
    info!(
        nodes = sim.graph().len(),
        seed = ?args.seed,
        auto = sim.auto_events(),
        "starting social-drift"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "social-drift",
        options,
        Box::new(move |cc| Ok(Box::new(app::SocialDriftApp::new(cc, sim)))),
    )
    .map_err(|error| anyhow!("window failed: {error}"))
}
