use eframe::egui::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::build::{clustered_graph, spawn_node};
use super::config::SimConfig;
use super::effects::EffectScheduler;
use super::embedding::{EmbeddingJob, EmbeddingReply, EmbeddingWorker};
use super::graph::{Graph, NodeId};
use super::interaction::PointerState;
use super::physics::{PhysicsScratch, step_physics};
use super::propagation::{PropagationOrigin, schedule_propagation};
use super::stimulus::StimulusClock;

/// The signed-in person this client acts for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    /// Stable id for a display name chosen on this machine.
    pub fn local_id(name: &str) -> String {
        format!("local:{}", name.trim().to_lowercase())
    }
}

/// Everything one running simulation owns. All mutation goes through here,
/// on the frame-loop thread.
pub struct SimulationState {
    pub(super) config: SimConfig,
    pub(super) graph: Graph,
    pub(super) effects: EffectScheduler,
    pub(super) rng: StdRng,
    pub(super) bounds: Vec2,
    /// Bumped on every reset; embedding replies from an older graph are discarded.
    pub(super) generation: u64,
    pub(super) participant: Option<Participant>,
    pub(super) running: bool,
    pub(super) auto_events: bool,
    pub(super) pointer: PointerState,
    pub(super) clock: StimulusClock,
    embeddings: Option<EmbeddingWorker>,
    scratch: PhysicsScratch,
}

impl SimulationState {
    /// Builds a fresh clustered graph. `seed` makes every random choice
    /// reproducible; `None` draws from entropy.
    pub fn new(config: SimConfig, bounds: Vec2, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let graph = clustered_graph(&config, config.node_count, bounds, &mut rng);

        Self {
            config,
            graph,
            effects: EffectScheduler::new(),
            rng,
            bounds,
            generation: 0,
            participant: None,
            running: true,
            auto_events: true,
            pointer: PointerState::default(),
            clock: StimulusClock::default(),
            embeddings: None,
            scratch: PhysicsScratch::default(),
        }
    }

    /// Attaches an embedding worker and asks it for every node's label vector.
    pub fn with_embeddings(mut self, worker: EmbeddingWorker) -> Self {
        worker.set_generation(self.generation);
        self.embeddings = Some(worker);
        self.request_label_embeddings();
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn pending_effects(&self) -> usize {
        self.effects.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn auto_events(&self) -> bool {
        self.auto_events
    }

    pub fn set_auto_events(&mut self, enabled: bool) {
        self.auto_events = enabled;
    }

    pub fn set_bounds(&mut self, bounds: Vec2) {
        if bounds.x > 0.0 && bounds.y > 0.0 {
            self.bounds = bounds;
        }
    }

    /// Discards the graph and every pending effect, then builds a new one.
    /// A signed-in participant is bound again.
    pub fn reset(&mut self, now: f64) {
        self.generation += 1;
        self.graph = clustered_graph(
            &self.config,
            self.config.node_count,
            self.bounds,
            &mut self.rng,
        );
        self.effects.clear();
        self.pointer = PointerState::default();
        self.clock = StimulusClock {
            last_auto: now,
            last_ambient: now,
        };
        if let Some(worker) = &self.embeddings {
            worker.set_generation(self.generation);
        }

        self.request_label_embeddings();
        if let Some(participant) = self.participant.clone() {
            self.ensure_user_node(&participant.id, &participant.name);
        }
        info!(
            generation = self.generation,
            nodes = self.graph.len(),
            edges = self.graph.edges.len(),
            "simulation reset"
        );
    }

    /// Binds `participant_id` to exactly one node. An existing node gets the
    /// new label and any missing links to its nearest peers; otherwise a node
    /// is created at the canvas centre.
    pub fn ensure_user_node(&mut self, participant_id: &str, name: &str) -> NodeId {
        let strength = self.config.initial_edge_strength * 0.8;
        let links = self.config.neighbor_count;

        if let Some(id) = self.graph.find_by_user(participant_id) {
            let renamed = self
                .graph
                .node_mut(id)
                .is_some_and(|node| node.label.replace(name.to_owned()).as_deref() != Some(name));
            self.graph.connect_nearest(id, links, strength);
            if renamed {
                self.request_embedding(EmbeddingJob::NodeLabel {
                    generation: self.generation,
                    node: id,
                    text: name.to_owned(),
                });
            }
            debug!(node = id, participant = participant_id, "participant re-bound");
            return id;
        }

        let centre = self.bounds * 0.5;
        let id = spawn_node(&mut self.graph, &self.config, centre, &mut self.rng);
        if let Some(node) = self.graph.node_mut(id) {
            node.user_id = Some(participant_id.to_owned());
            node.label = Some(name.to_owned());
        }
        self.graph.connect_nearest(id, links + 1, strength);
        self.request_embedding(EmbeddingJob::NodeLabel {
            generation: self.generation,
            node: id,
            text: name.to_owned(),
        });
        info!(node = id, participant = participant_id, "participant bound to new node");
        id
    }

    /// Makes this client act for `participant_id` and returns its node.
    pub fn sign_in(&mut self, participant_id: &str, name: &str) -> NodeId {
        self.participant = Some(Participant {
            id: participant_id.to_owned(),
            name: name.to_owned(),
        });
        self.ensure_user_node(participant_id, name)
    }

    pub fn sign_out(&mut self) {
        self.pointer_leave();
        self.participant = None;
    }

    /// The node bound to the signed-in participant.
    pub fn owner_node(&self) -> Option<NodeId> {
        let participant = self.participant.as_ref()?;
        self.graph.find_by_user(&participant.id)
    }

    /// Starts a propagation rooted at `source`. With an embedding worker the
    /// text is resolved first and the effects are scheduled when the reply
    /// arrives; without one they are scheduled now, unbiased. Returns false
    /// when `source` does not resolve.
    pub fn propagate(
        &mut self,
        source: NodeId,
        text: &str,
        origin: PropagationOrigin,
        now: f64,
    ) -> bool {
        if self.graph.node(source).is_none() {
            return false;
        }

        let job = EmbeddingJob::Propagation {
            generation: self.generation,
            source,
            text: text.to_owned(),
            origin,
        };
        if self.request_embedding(job) {
            debug!(source, ?origin, "propagation waiting for embedding");
            return true;
        }

        self.schedule(source, None, origin, now);
        true
    }

    /// Propagates text submitted by the signed-in participant from their node.
    pub fn propagate_participant_text(&mut self, text: &str, now: f64) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        match self.owner_node() {
            Some(owner) => self.propagate(owner, text, PropagationOrigin::Participant, now),
            None => false,
        }
    }

    /// One display frame: embedding replies, due effects, physics, then the
    /// autonomous stimulus. A paused simulation does nothing; replies wait
    /// in the worker channel and are scheduled from the resume time.
    pub fn frame(&mut self, now: f64, dt_ms: f32) {
        if !self.running {
            return;
        }
        self.poll_embeddings(now);

        self.effects.drain(now, &mut self.graph, &self.config);
        step_physics(
            &mut self.graph,
            &self.config,
            self.bounds,
            now,
            dt_ms,
            &mut self.scratch,
            &mut self.rng,
        );
        self.run_stimulus(now);
    }

    fn schedule(
        &mut self,
        source: NodeId,
        embedding: Option<&[f32]>,
        origin: PropagationOrigin,
        now: f64,
    ) {
        let report = schedule_propagation(
            &mut self.graph,
            &mut self.effects,
            &self.config,
            source,
            embedding,
            origin,
            now,
            &mut self.rng,
        );
        match report {
            Some(report) => info!(
                source,
                ?origin,
                reached = report.reached,
                scheduled = report.scheduled,
                biased = report.biased,
                "propagation scheduled"
            ),
            None => debug!(source, "propagation source vanished"),
        }
    }

    fn request_embedding(&mut self, job: EmbeddingJob) -> bool {
        let Some(worker) = &self.embeddings else {
            return false;
        };
        if worker.submit(job) {
            return true;
        }
        warn!("embedding worker is gone, continuing without embeddings");
        self.embeddings = None;
        false
    }

    fn request_label_embeddings(&mut self) {
        if self.embeddings.is_none() {
            return;
        }
        let jobs = self
            .graph
            .nodes
            .iter()
            .map(|node| EmbeddingJob::NodeLabel {
                generation: self.generation,
                node: node.id,
                text: node.label.clone().unwrap_or_else(|| node.id.to_string()),
            })
            .collect::<Vec<_>>();
        for job in jobs {
            if !self.request_embedding(job) {
                break;
            }
        }
    }

    fn poll_embeddings(&mut self, now: f64) {
        let Some(worker) = &self.embeddings else {
            return;
        };
        for reply in worker.poll() {
            self.apply_embedding(reply, now);
        }
    }

    pub(super) fn apply_embedding(&mut self, reply: EmbeddingReply, now: f64) {
        if reply.job.generation() != self.generation {
            debug!(
                stale = reply.job.generation(),
                current = self.generation,
                "discarding embedding for a previous graph"
            );
            return;
        }

        match reply.job {
            EmbeddingJob::NodeLabel { node, .. } => match self.graph.node_mut(node) {
                Some(target) => target.embedding = reply.embedding,
                None => debug!(node, "embedding target vanished"),
            },
            EmbeddingJob::Propagation { source, origin, .. } => {
                self.schedule(source, reply.embedding.as_deref(), origin, now);
            }
        }
    }
}
