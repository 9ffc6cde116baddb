use tracing::debug;

use super::config::SimConfig;
use super::graph::{Graph, NodeId};
use crate::util::direction_to;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Shrink,
    Redden,
    Attach,
    Flee,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub due: f64,
    pub target: NodeId,
    pub kind: EffectKind,
    pub intensity: f32,
    pub source: NodeId,
}

const SHRINK_FACTOR: f32 = 0.08;
const SHRINK_ATTENTION: f32 = 0.06;
const REDDEN_ATTENTION: f32 = 0.14;
const REDDEN_HUE_OFFSET: f32 = 3.0;
const LIGHT_DROP: f32 = 2.0;
const ATTACH_IMPULSE: f32 = 0.28;
const FLEE_IMPULSE: f32 = 0.24;

/// Time-ordered queue of delayed perturbations, drained once per frame.
#[derive(Clone, Debug, Default)]
pub struct EffectScheduler {
    queue: Vec<Effect>,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[Effect] {
        &self.queue
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn schedule(
        &mut self,
        now: f64,
        delay_ms: f64,
        target: NodeId,
        kind: EffectKind,
        intensity: f32,
        source: NodeId,
    ) {
        self.queue.push(Effect {
            due: now + delay_ms.max(0.0),
            target,
            kind,
            intensity,
            source,
        });
    }

    /// Applies and removes every effect due at or before `now`. Effects whose
    /// target no longer resolves are dropped. Returns the number applied.
    pub fn drain(&mut self, now: f64, graph: &mut Graph, config: &SimConfig) -> usize {
        let mut applied = 0usize;
        let mut dropped = 0usize;
        let mut index = 0;
        while index < self.queue.len() {
            if self.queue[index].due > now {
                index += 1;
                continue;
            }

            let effect = self.queue.swap_remove(index);
            if apply_effect(&effect, graph, config) {
                applied += 1;
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            debug!(dropped, "dropped effects with stale targets");
        }
        applied
    }
}

fn apply_effect(effect: &Effect, graph: &mut Graph, config: &SimConfig) -> bool {
    let source_pos = graph.node(effect.source).map(|node| node.pos);
    let Some(node) = graph.node_mut(effect.target) else {
        return false;
    };
    let intensity = effect.intensity;

    match effect.kind {
        EffectKind::Shrink => {
            let shrunk = node.radius * (1.0 - SHRINK_FACTOR * intensity);
            node.set_radius(shrunk, config.min_radius);
            node.add_attention(SHRINK_ATTENTION * intensity);
            node.light_offset -= LIGHT_DROP * intensity;
        }
        EffectKind::Redden => {
            node.add_attention(REDDEN_ATTENTION * intensity);
            node.color_offset += REDDEN_HUE_OFFSET * intensity;
            node.light_offset -= LIGHT_DROP * intensity;
        }
        EffectKind::Attach => {
            if let Some(source) = source_pos {
                let (direction, _) = direction_to(node.pos, source, config.min_distance);
                node.velocity += direction * ATTACH_IMPULSE * intensity;
            }
        }
        EffectKind::Flee => {
            if let Some(source) = source_pos {
                let (direction, _) = direction_to(source, node.pos, config.min_distance);
                node.velocity += direction * FLEE_IMPULSE * intensity;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Vec2, vec2};

    use super::*;

    fn pair() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(vec2(0.0, 0.0), 22.0);
        graph.add_node(vec2(100.0, 0.0), 22.0);
        graph
    }

    #[test]
    fn effect_waits_until_due() {
        let config = SimConfig::default();
        let mut graph = pair();
        let mut scheduler = EffectScheduler::new();
        scheduler.schedule(1000.0, 250.0, 1, EffectKind::Redden, 1.0, 0);

        assert_eq!(scheduler.drain(1249.9, &mut graph, &config), 0);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(graph.nodes[1].attention, 0.0);

        assert_eq!(scheduler.drain(1250.0, &mut graph, &config), 1);
        assert!(scheduler.is_empty());
        assert!(graph.nodes[1].attention > 0.0);
    }

    #[test]
    fn stale_targets_are_dropped_silently() {
        let config = SimConfig::default();
        let mut graph = pair();
        let mut scheduler = EffectScheduler::new();
        scheduler.schedule(0.0, 0.0, 42, EffectKind::Shrink, 1.0, 0);
        assert_eq!(scheduler.drain(10.0, &mut graph, &config), 0);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn shrink_never_goes_below_min_radius() {
        let config = SimConfig::default();
        let mut graph = pair();
        let mut scheduler = EffectScheduler::new();
        for _ in 0..200 {
            scheduler.schedule(0.0, 0.0, 0, EffectKind::Shrink, 1.4, 1);
        }
        scheduler.drain(1.0, &mut graph, &config);
        assert!(graph.nodes[0].radius >= config.min_radius);
        assert!(graph.nodes[0].attention <= 1.0);
    }

    #[test]
    fn attach_and_flee_push_in_opposite_directions() {
        let config = SimConfig::default();
        let mut graph = pair();
        let mut scheduler = EffectScheduler::new();
        scheduler.schedule(0.0, 0.0, 1, EffectKind::Attach, 1.0, 0);
        scheduler.drain(0.0, &mut graph, &config);
        assert!(graph.nodes[1].velocity.x < 0.0);

        graph.nodes[1].velocity = Vec2::ZERO;
        scheduler.schedule(0.0, 0.0, 1, EffectKind::Flee, 1.0, 0);
        scheduler.drain(0.0, &mut graph, &config);
        assert!(graph.nodes[1].velocity.x > 0.0);
    }
}
