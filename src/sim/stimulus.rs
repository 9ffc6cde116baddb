use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use rand::Rng;
use tracing::debug;

use super::SimulationState;
use super::graph::{InteractionState, NodeId};
use super::interaction::{intensify_nearby, regroup_partners, tap_pulse};
use super::propagation::PropagationOrigin;
use crate::util::direction_to;

const OWNER_SKIP_PROBABILITY: f64 = 0.82;
const EXCLUSION_PROBABILITY: f64 = 0.28;
const EDGE_JOLT_PROBABILITY: f64 = 0.012;

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct StimulusClock {
    pub(super) last_auto: f64,
    pub(super) last_ambient: f64,
}

/// The kind of synthetic interaction an autonomous event imitates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StimulusKind {
    Signal,
    Hover,
    Tap,
    Relocate,
}

impl StimulusKind {
    fn from_roll(roll: f64) -> Self {
        if roll < 0.14 {
            Self::Signal
        } else if roll < 0.45 {
            Self::Hover
        } else if roll < 0.82 {
            Self::Tap
        } else {
            Self::Relocate
        }
    }
}

impl SimulationState {
    pub(super) fn run_stimulus(&mut self, now: f64) {
        if now - self.clock.last_ambient >= self.config.ambient_interval_ms {
            self.clock.last_ambient = now;
            self.ambient_pulse();
        }

        if self.auto_events && now - self.clock.last_auto >= self.config.auto_interval_ms {
            self.clock.last_auto = now;
            if self.rng.gen_bool(self.config.auto_fire_probability) {
                self.auto_event(now);
            }
        }
    }

    /// Keeps the participant's node faintly alive while idle, and now and
    /// then jolts a random edge.
    fn ambient_pulse(&mut self) {
        if !self.pointer.down
            && let Some(owner) = self.owner_node()
        {
            if let Some(node) = self.graph.node_mut(owner) {
                node.add_attention(0.02);
            }
            intensify_nearby(&mut self.graph, &self.config, owner, 1.0, 0.01);
        }

        if !self.graph.edges.is_empty() && self.rng.gen_bool(EDGE_JOLT_PROBABILITY) {
            let index = self.rng.gen_range(0..self.graph.edges.len());
            let jolt = self.rng.gen_range(-0.15_f32..0.15);
            self.graph.edges[index].adjust(jolt);
        }
    }

    /// Picks a random node and makes it act as if someone interacted with
    /// it. Returns the node and what was imitated, or `None` when nothing
    /// happened.
    pub(super) fn auto_event(&mut self, now: f64) -> Option<(NodeId, StimulusKind)> {
        if self.graph.is_empty() {
            return None;
        }
        let target = self.rng.gen_range(0..self.graph.len());
        if self.grabbed() == Some(target) || self.held_by_participant(target) {
            return None;
        }
        if self.owner_node() == Some(target) && self.rng.gen_bool(OWNER_SKIP_PROBABILITY) {
            return None;
        }

        let kind = StimulusKind::from_roll(self.rng.gen_range(0.0..1.0));
        match kind {
            StimulusKind::Signal => {
                let text = match self.graph.node(target).and_then(|node| node.label.clone()) {
                    Some(label) => label,
                    None => format!("signal-{}", self.rng.gen_range(0..9999)),
                };
                self.propagate(target, &text, PropagationOrigin::Autonomous, now);
                return Some((target, kind));
            }
            StimulusKind::Hover => self.imitate_hover(target),
            StimulusKind::Tap => self.imitate_tap(target),
            StimulusKind::Relocate => self.imitate_relocation(target, now),
        }

        for index in 0..self.graph.edges.len() {
            if self.graph.edges[index].touches(target) {
                let drift = self.rng.gen_range(-0.06_f32..0.06);
                self.graph.edges[index].adjust(drift);
            }
        }

        if self.rng.gen_bool(EXCLUSION_PROBABILITY) {
            self.exclude_one_neighbor(target);
        }

        debug!(node = target, ?kind, "autonomous event");
        Some((target, kind))
    }

    /// Dragged or freshly dropped nodes belong to the participant until released.
    fn held_by_participant(&self, target: NodeId) -> bool {
        self.graph.node(target).is_some_and(|node| {
            matches!(
                node.interaction,
                InteractionState::Dragging | InteractionState::Pinned { .. }
            )
        })
    }

    fn bump_incident_randomly(&mut self, target: NodeId, scale: f32) {
        for index in 0..self.graph.edges.len() {
            if self.graph.edges[index].touches(target) {
                let bump = scale * self.rng.gen_range(0.0_f32..1.0);
                self.graph.edges[index].adjust(bump);
            }
        }
    }

    fn imitate_hover(&mut self, target: NodeId) {
        let attention = 0.22 + self.rng.gen_range(0.0_f32..0.18);
        let hue = self.rng.gen_range(-9.0_f32..9.0);
        let light = self.rng.gen_range(-2.0_f32..2.0);
        if let Some(node) = self.graph.node_mut(target) {
            node.add_attention(attention);
            node.color_offset += hue;
            node.light_offset += light;
        }
        intensify_nearby(&mut self.graph, &self.config, target, 1.1, 0.06);
        self.bump_incident_randomly(target, 0.08);
    }

    fn imitate_tap(&mut self, target: NodeId) {
        tap_pulse(&mut self.graph, &self.config, target);
        let impulse = vec2(self.rng.gen_range(-1.1..1.1), self.rng.gen_range(-1.1..1.1));
        if let Some(node) = self.graph.node_mut(target) {
            node.velocity += impulse;
        }
        self.bump_incident_randomly(target, 0.12);
    }

    /// Moves the node somewhere in the middle of the canvas, holds it there
    /// briefly, and nudges a few partners to gather around it.
    fn imitate_relocation(&mut self, target: NodeId, now: f64) {
        if self.grabbed() == Some(target) || self.held_by_participant(target) {
            return;
        }
        let config = &self.config;
        let spot = vec2(
            self.bounds.x * self.rng.gen_range(0.15..0.85) + self.rng.gen_range(-24.0..24.0),
            self.bounds.y * self.rng.gen_range(0.15..0.85) + self.rng.gen_range(-24.0..24.0),
        );
        let attention = 0.2 + self.rng.gen_range(0.0_f32..0.14);
        let until = now + config.auto_drag_cooldown_ms;
        let Some(node) = self.graph.node_mut(target) else {
            return;
        };
        node.pos = spot;
        node.velocity = Vec2::ZERO;
        node.add_attention(attention);
        node.interaction = InteractionState::CoolingDown { until };
        node.cooldown_until = node.cooldown_until.max(until);
        node.extend_release_ramp(now + config.release_ramp_ms);

        let desired = self.rng.gen_range(2..=5);
        let partners = regroup_partners(&self.graph, config, target, desired, spot);
        for partner in partners {
            let angle = self.rng.gen_range(0.0..TAU);
            let reach = self.rng.gen_range(10.0_f32..74.0);
            let gather = spot + vec2(angle.cos(), angle.sin()) * reach;
            let speed = self.rng.gen_range(0.04_f32..0.10);
            let Some(node) = self.graph.node_mut(partner) else {
                continue;
            };
            let (direction, _) = direction_to(node.pos, gather, 1.0);
            node.velocity = direction * speed;
            node.add_attention(0.04);
            node.extend_release_ramp(now + config.release_ramp_ms);
            self.graph.reinforce_edge(
                target,
                partner,
                0.12,
                (config.initial_edge_strength + 0.06).min(1.0),
            );
        }
    }

    /// One neighbor falls out with the rest of the target's circle.
    fn exclude_one_neighbor(&mut self, target: NodeId) {
        let neighbors = self.graph.neighbors(target);
        if neighbors.len() < 2 {
            return;
        }
        let excluded = neighbors[self.rng.gen_range(0..neighbors.len())];

        for index in 0..self.graph.edges.len() {
            let edge = &self.graph.edges[index];
            if edge.touches(excluded) && neighbors.contains(&edge.other(excluded)) {
                let cut = 0.35 * self.rng.gen_range(0.0_f32..1.0);
                self.graph.edges[index].adjust(-cut);
            }
        }
        if let Some(node) = self.graph.node_mut(excluded) {
            node.add_attention(-0.5);
            node.light_offset += 20.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::super::config::SimConfig;
    use super::*;

    fn quiet_state(seed: u64) -> SimulationState {
        let config = SimConfig {
            node_count: 16,
            ..SimConfig::default()
        };
        SimulationState::new(config, vec2(900.0, 700.0), Some(seed))
    }

    #[test]
    fn roll_thresholds_map_to_modes() {
        assert_eq!(StimulusKind::from_roll(0.0), StimulusKind::Signal);
        assert_eq!(StimulusKind::from_roll(0.2), StimulusKind::Hover);
        assert_eq!(StimulusKind::from_roll(0.6), StimulusKind::Tap);
        assert_eq!(StimulusKind::from_roll(0.9), StimulusKind::Relocate);
    }

    #[test]
    fn many_auto_events_keep_invariants() {
        let mut state = quiet_state(12);
        state.sign_in("owner", "Owner");
        let mut kinds = Vec::new();
        for step in 0..400 {
            let now = step as f64 * 50.0;
            if let Some((_, kind)) = state.auto_event(now) {
                kinds.push(kind);
            }
            state.effects.drain(now, &mut state.graph, &state.config);
        }

        assert!(kinds.contains(&StimulusKind::Relocate));
        assert!(kinds.contains(&StimulusKind::Signal));
        for node in &state.graph.nodes {
            assert!((0.0..=1.0).contains(&node.attention));
            assert!(node.radius >= state.config.min_radius);
        }
        for edge in &state.graph.edges {
            assert!((0.0..=1.0).contains(&edge.strength));
            assert_ne!(edge.a, edge.b);
        }
    }

    #[test]
    fn relocation_cools_down_instead_of_locking_forever() {
        let mut state = quiet_state(3);
        state.set_auto_events(false);
        state.imitate_relocation(0, 1000.0);
        let node = &state.graph.nodes[0];
        assert_eq!(node.interaction, InteractionState::CoolingDown { until: 3400.0 });
        assert!(node.pos.x >= 900.0 * 0.15 - 24.0 && node.pos.x <= 900.0 * 0.85 + 24.0);

        let mut now = 1000.0;
        while now < 3500.0 {
            now += 16.0;
            state.frame(now, 16.0);
        }
        assert_eq!(state.graph.nodes[0].interaction, InteractionState::Free);
    }

    #[test]
    fn dragged_owner_node_is_left_alone() {
        let mut state = quiet_state(13);
        let owner = state.sign_in("owner", "Owner");
        let grip = state.graph.nodes[owner].pos;
        assert_eq!(state.pointer_down(grip, 1000.0), Some(owner));

        state.imitate_relocation(owner, 1010.0);
        for step in 0..300 {
            state.auto_event(1020.0 + step as f64 * 50.0);
        }

        let node = &state.graph.nodes[owner];
        assert_eq!(state.grabbed(), Some(owner));
        assert_eq!(node.interaction, InteractionState::Dragging);
        assert_eq!(node.pos, grip);
    }

    #[test]
    fn auto_events_respect_toggle_and_interval() {
        let mut state = quiet_state(4);
        state.set_auto_events(false);
        state.run_stimulus(10_000.0);
        assert_eq!(state.clock.last_auto, 0.0);
        assert_eq!(state.clock.last_ambient, 10_000.0);

        state.set_auto_events(true);
        state.run_stimulus(10_100.0);
        assert_eq!(state.clock.last_auto, 10_100.0);
        state.run_stimulus(11_000.0);
        assert_eq!(state.clock.last_auto, 10_100.0);
    }

    #[test]
    fn exclusion_weakens_ties_to_the_rest_of_the_circle() {
        let mut state = quiet_state(5);
        state.rng = StdRng::seed_from_u64(99);
        let target = 0;
        let neighbors = state.graph.neighbors(target);
        assert!(neighbors.len() >= 2);
        for &neighbor in &neighbors {
            state.graph.nodes[neighbor].attention = 0.8;
        }
        let before = state.graph.edges.iter().map(|edge| edge.strength).sum::<f32>();

        state.exclude_one_neighbor(target);

        let after = state.graph.edges.iter().map(|edge| edge.strength).sum::<f32>();
        assert!(after <= before);
        assert!(
            neighbors
                .iter()
                .any(|&neighbor| (state.graph.nodes[neighbor].attention - 0.3).abs() < 1e-6)
        );
    }
}
