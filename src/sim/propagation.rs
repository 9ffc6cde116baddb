use rand::Rng;

use super::config::SimConfig;
use super::effects::{EffectKind, EffectScheduler};
use super::graph::{Graph, NodeId, SemanticPull};
use crate::util::cosine_similarity;

/// Who started a propagation. Autonomous sources leave weaker traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationOrigin {
    Participant,
    Autonomous,
}

struct OriginProfile {
    edge_bump: f32,
    pull_floor: f32,
    pull_scale: f32,
    pull_base_ms: f64,
    pull_jitter_ms: f64,
    motion_scale: f32,
}

impl PropagationOrigin {
    fn profile(self) -> OriginProfile {
        match self {
            Self::Participant => OriginProfile {
                edge_bump: 0.22,
                pull_floor: 0.06,
                pull_scale: 0.55,
                pull_base_ms: 14_000.0,
                pull_jitter_ms: 6_000.0,
                motion_scale: 0.6,
            },
            Self::Autonomous => OriginProfile {
                edge_bump: 0.16,
                pull_floor: 0.04,
                pull_scale: 0.45,
                pull_base_ms: 16_000.0,
                pull_jitter_ms: 8_000.0,
                motion_scale: 0.5,
            },
        }
    }
}

const REDDEN_OFFSET_MS: f64 = 120.0;
const MOTION_OFFSET_MS: f64 = 220.0;
const REDDEN_SCALE: f32 = 0.9;
const MIN_BIASED_DELAY_MS: f64 = 30.0;
const MAX_BIASED_INTENSITY: f32 = 1.4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub reached: usize,
    pub scheduled: usize,
    pub biased: usize,
}

/// Schedules shrink, redden and attach-or-flee effects on every node within
/// `max_hops` of `source`. When `text_embedding` is present, nodes with a
/// cached embedding react sooner and harder in proportion to similarity, and
/// strongly similar ones get a reinforced edge and a semantic pull.
///
/// Returns `None` when `source` does not resolve.
#[allow(clippy::too_many_arguments)]
pub(super) fn schedule_propagation<R: Rng>(
    graph: &mut Graph,
    effects: &mut EffectScheduler,
    config: &SimConfig,
    source: NodeId,
    text_embedding: Option<&[f32]>,
    origin: PropagationOrigin,
    now: f64,
    rng: &mut R,
) -> Option<PropagationReport> {
    graph.node(source)?;
    let profile = origin.profile();
    let distances = graph.bfs_distances(source, config.max_hops);
    let mut report = PropagationReport {
        reached: distances.len(),
        ..PropagationReport::default()
    };

    for (&target, &hops) in &distances {
        let hops_f = hops as f32;
        let mut delay = hops as f64 * config.hop_delay_ms
            + rng.gen_range(0.0..config.hop_delay_jitter_ms.max(f64::EPSILON));
        let mut intensity = (1.0 - hops_f * config.hop_intensity_falloff
            + rng.gen_range(-0.07_f32..0.07))
        .max(config.min_intensity);

        let similarity = text_embedding.and_then(|text| {
            let embedding = graph.node(target)?.embedding.as_deref()?;
            Some((cosine_similarity(text, embedding) + 1.0) / 2.0)
        });

        if let Some(s) = similarity {
            report.biased += 1;
            delay = (delay * (1.0 - 0.55 * f64::from(s))).max(MIN_BIASED_DELAY_MS);
            intensity = (intensity * (1.0 + 0.9 * s)).min(MAX_BIASED_INTENSITY);

            if s > config.similarity_threshold && target != source {
                let bump = s * profile.edge_bump;
                graph.reinforce_edge(
                    source,
                    target,
                    bump,
                    (config.initial_edge_strength + bump).min(1.0),
                );
                let until =
                    now + profile.pull_base_ms + rng.gen_range(0.0..profile.pull_jitter_ms);
                if let Some(node) = graph.node_mut(target) {
                    node.semantic_pull = Some(SemanticPull {
                        target: source,
                        strength: (s * profile.pull_scale).max(profile.pull_floor),
                        until,
                    });
                }
            }
        }

        let motion = if rng.gen_bool(config.attach_probability) {
            EffectKind::Attach
        } else {
            EffectKind::Flee
        };

        effects.schedule(now, delay, target, EffectKind::Shrink, intensity, source);
        effects.schedule(
            now,
            delay + REDDEN_OFFSET_MS,
            target,
            EffectKind::Redden,
            intensity * REDDEN_SCALE,
            source,
        );
        effects.schedule(
            now,
            delay + MOTION_OFFSET_MS,
            target,
            motion,
            intensity * profile.motion_scale,
            source,
        );
        report.scheduled += 3;
    }

    Some(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eframe::egui::vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn chain(len: usize) -> Graph {
        let mut graph = Graph::new();
        for index in 0..len {
            graph.add_node(vec2(50.0 + index as f32 * 80.0, 100.0), 22.0);
        }
        for index in 1..len {
            graph.upsert_edge(index - 1, index, 0.5);
        }
        graph
    }

    #[test]
    fn unbiased_propagation_schedules_three_effects_per_reached_node() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        let mut graph = chain(7);
        let mut effects = EffectScheduler::new();

        let report = schedule_propagation(
            &mut graph,
            &mut effects,
            &config,
            0,
            None,
            PropagationOrigin::Participant,
            1000.0,
            &mut rng,
        )
        .expect("source exists");

        assert_eq!(report.reached, 5);
        assert_eq!(report.biased, 0);
        assert_eq!(effects.len(), 15);

        let mut kinds: HashMap<NodeId, Vec<EffectKind>> = HashMap::new();
        let mut shrink_due: HashMap<NodeId, f64> = HashMap::new();
        for effect in effects.pending() {
            kinds.entry(effect.target).or_default().push(effect.kind);
            if effect.kind == EffectKind::Shrink {
                shrink_due.insert(effect.target, effect.due);
            }
        }

        for target in 0..5 {
            let kinds = &kinds[&target];
            assert_eq!(kinds.len(), 3);
            assert!(kinds.contains(&EffectKind::Shrink));
            assert!(kinds.contains(&EffectKind::Redden));
            assert!(kinds.contains(&EffectKind::Attach) || kinds.contains(&EffectKind::Flee));
        }
        assert!(!kinds.contains_key(&5));

        for target in 1..5 {
            assert!(shrink_due[&target] >= shrink_due[&(target - 1)]);
        }
    }

    #[test]
    fn missing_source_schedules_nothing() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut graph = chain(3);
        let mut effects = EffectScheduler::new();
        let report = schedule_propagation(
            &mut graph,
            &mut effects,
            &config,
            17,
            None,
            PropagationOrigin::Autonomous,
            0.0,
            &mut rng,
        );
        assert!(report.is_none());
        assert!(effects.is_empty());
    }

    #[test]
    fn similar_nodes_gain_edge_and_pull() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut graph = chain(4);
        graph.nodes[2].embedding = Some(vec![1.0, 0.0, 0.0]);
        graph.nodes[3].embedding = Some(vec![-1.0, 0.0, 0.0]);
        let mut effects = EffectScheduler::new();

        let report = schedule_propagation(
            &mut graph,
            &mut effects,
            &config,
            0,
            Some(&[1.0, 0.0, 0.0]),
            PropagationOrigin::Participant,
            0.0,
            &mut rng,
        )
        .expect("source exists");

        assert_eq!(report.biased, 2);
        let edge = graph.find_edge(0, 2).expect("edge created for similar node");
        assert!((edge.strength - 0.72).abs() < 1e-5);
        let pull = graph.nodes[2].semantic_pull.as_ref().expect("pull set");
        assert_eq!(pull.target, 0);
        assert!((14_000.0..20_000.0).contains(&pull.until));

        assert!(graph.find_edge(0, 3).is_none());
        assert!(graph.nodes[3].semantic_pull.is_none());
        for edge in &graph.edges {
            assert!((0.0..=1.0).contains(&edge.strength));
        }
    }

    #[test]
    fn similarity_shortens_delay() {
        let config = SimConfig::default();
        let mut graph = chain(3);
        graph.nodes[2].embedding = Some(vec![0.0, 1.0]);

        let mut unbiased = EffectScheduler::new();
        schedule_propagation(
            &mut graph.clone(),
            &mut unbiased,
            &config,
            0,
            None,
            PropagationOrigin::Autonomous,
            0.0,
            &mut StdRng::seed_from_u64(9),
        );
        let mut biased = EffectScheduler::new();
        schedule_propagation(
            &mut graph,
            &mut biased,
            &config,
            0,
            Some(&[0.0, 1.0]),
            PropagationOrigin::Autonomous,
            0.0,
            &mut StdRng::seed_from_u64(9),
        );

        let shrink_due = |effects: &EffectScheduler| {
            effects
                .pending()
                .iter()
                .find(|effect| effect.target == 2 && effect.kind == EffectKind::Shrink)
                .map(|effect| effect.due)
                .expect("hop-2 shrink scheduled")
        };
        assert!(shrink_due(&biased) < shrink_due(&unbiased));
    }
}
