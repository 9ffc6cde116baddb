mod build;
mod config;
mod effects;
mod embedding;
mod graph;
mod interaction;
mod physics;
mod propagation;
mod snapshot;
mod state;
mod stimulus;

pub use config::SimConfig;
pub use embedding::{EmbeddingWorker, HttpEmbedder};
pub use snapshot::RenderSnapshot;
pub use state::{Participant, SimulationState};
