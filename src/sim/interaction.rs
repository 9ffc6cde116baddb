use eframe::egui::Vec2;
use rand::Rng;
use tracing::debug;

use super::SimulationState;
use super::config::SimConfig;
use super::graph::{Graph, InteractionState, NodeId};
use crate::util::direction_to;

const NEARBY_EDGE_BUMP: f32 = 0.02;
const GRAB_ATTENTION: f32 = 0.02;
const HOVER_ATTENTION: f32 = 0.015;
const TAP_ATTENTION: f32 = 0.12;
const TAP_EDGE_BUMP: f32 = 0.08;
const REGROUP_ATTENTION: f32 = 0.03;
const REGROUP_EDGE_BUMP: f32 = 0.12;
const REGROUP_NEW_EDGE_BONUS: f32 = 0.06;

#[derive(Clone, Copy, Debug)]
pub(super) struct Grab {
    pub(super) node: NodeId,
    /// Where the node sat when it was picked up.
    pub(super) origin: Vec2,
}

#[derive(Clone, Debug, Default)]
pub(super) struct PointerState {
    pub(super) pos: Vec2,
    pub(super) down: bool,
    pub(super) down_at: f64,
    pub(super) down_pos: Vec2,
    pub(super) grabbed: Option<Grab>,
    pub(super) hovered: Option<NodeId>,
}

/// What a pointer release turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerRelease {
    Ignored,
    Tapped(NodeId),
    Dropped(NodeId),
}

/// Raises attention of every node within `intensify_radius * factor` of
/// `source`, fading with distance, and firms up the source's edges.
pub(super) fn intensify_nearby(
    graph: &mut Graph,
    config: &SimConfig,
    source: NodeId,
    factor: f32,
    amount: f32,
) {
    let Some(origin) = graph.node(source).map(|node| node.pos) else {
        return;
    };
    let radius = config.intensify_radius * factor;
    if radius <= 0.0 {
        return;
    }

    for node in &mut graph.nodes {
        let distance = (node.pos - origin).length();
        if distance < radius {
            node.add_attention(amount * (1.0 - distance / radius));
        }
    }
    graph.adjust_incident_edges(source, NEARBY_EDGE_BUMP);
}

pub(super) fn tap_pulse(graph: &mut Graph, config: &SimConfig, id: NodeId) {
    let Some(node) = graph.node_mut(id) else {
        return;
    };
    node.add_attention(TAP_ATTENTION);
    graph.adjust_incident_edges(id, TAP_EDGE_BUMP);
    intensify_nearby(graph, config, id, 1.2, 0.12);
}

/// Up to `desired` partners for a regroup around `main`: strongest linked
/// neighbors first, then unlinked nodes nearest to `search_from` that lie
/// within `regroup_search_radius`.
pub(super) fn regroup_partners(
    graph: &Graph,
    config: &SimConfig,
    main: NodeId,
    desired: usize,
    search_from: Vec2,
) -> Vec<NodeId> {
    let mut chosen = graph.strongest_neighbors(main);
    chosen.truncate(desired);
    if chosen.len() >= desired {
        return chosen;
    }

    let mut exclude = chosen.clone();
    exclude.push(main);
    let radius_sq = config.regroup_search_radius * config.regroup_search_radius;
    let nearby = graph
        .nearest_nodes(search_from, &exclude, desired - chosen.len())
        .into_iter()
        .filter(|&id| {
            graph
                .node(id)
                .is_some_and(|node| (node.pos - search_from).length_sq() <= radius_sq)
        })
        .collect::<Vec<_>>();
    chosen.extend(nearby);
    chosen
}

impl SimulationState {
    #[cfg(test)]
    pub fn hovered(&self) -> Option<NodeId> {
        self.pointer.hovered
    }

    pub fn grabbed(&self) -> Option<NodeId> {
        self.pointer.grabbed.map(|grab| grab.node)
    }

    /// Starts a drag when the pointer lands on the participant's own node.
    /// Returns the grabbed node.
    pub fn pointer_down(&mut self, pos: Vec2, now: f64) -> Option<NodeId> {
        self.pointer.pos = pos;
        self.pointer.down = true;
        self.pointer.down_at = now;
        self.pointer.down_pos = pos;
        self.pointer.grabbed = None;

        let hit = self.graph.node_at(pos, self.config.hit_padding)?;
        if self.owner_node() != Some(hit) {
            return None;
        }

        let node = self.graph.node_mut(hit)?;
        node.interaction = InteractionState::Dragging;
        node.cooldown_until = 0.0;
        node.home = node.pos;
        node.returning_home = false;
        node.velocity = Vec2::ZERO;
        node.add_attention(GRAB_ATTENTION);
        let origin = node.pos;
        intensify_nearby(&mut self.graph, &self.config, hit, 0.8, 0.03);

        self.pointer.grabbed = Some(Grab { node: hit, origin });
        debug!(node = hit, "grabbed own node");
        Some(hit)
    }

    pub fn pointer_move(&mut self, pos: Vec2, _now: f64) {
        self.pointer.pos = pos;

        if let Some(grab) = self.pointer.grabbed {
            if let Some(node) = self.graph.node_mut(grab.node) {
                node.pos = pos;
                node.velocity = Vec2::ZERO;
                node.add_attention(GRAB_ATTENTION);
            }
            intensify_nearby(&mut self.graph, &self.config, grab.node, 0.8, 0.03);
            return;
        }

        let hit = self.graph.node_at(pos, self.config.hit_padding);
        self.pointer.hovered = hit;
        let Some(id) = hit else {
            return;
        };

        let owned = self.owner_node() == Some(id);
        let hue_jitter = self.rng.gen_range(-4.0_f32..4.0) * 0.6;
        let light_jitter = self.rng.gen_range(-0.8_f32..0.8);
        if let Some(node) = self.graph.node_mut(id) {
            node.color_offset += hue_jitter;
            node.light_offset += light_jitter;
            if owned {
                node.add_attention(HOVER_ATTENTION);
            }
        }
        if owned {
            intensify_nearby(&mut self.graph, &self.config, id, 0.7, 0.01);
        }
    }

    /// Ends a press. A short, still press on the grabbed node is a tap and
    /// leaves it free; anything longer pins it where it was dropped.
    pub fn pointer_up(&mut self, pos: Vec2, now: f64) -> PointerRelease {
        self.pointer.pos = pos;
        let was_down = std::mem::take(&mut self.pointer.down);
        let held = now - self.pointer.down_at;
        let moved = (pos - self.pointer.down_pos).length();
        let is_tap =
            was_down && held < self.config.tap_max_ms && moved < self.config.tap_max_distance;

        let Some(grab) = self.pointer.grabbed.take() else {
            return PointerRelease::Ignored;
        };
        if self.graph.node(grab.node).is_none() {
            return PointerRelease::Ignored;
        }

        if is_tap {
            if let Some(node) = self.graph.node_mut(grab.node) {
                node.interaction = InteractionState::Free;
                node.velocity = Vec2::ZERO;
            }
            tap_pulse(&mut self.graph, &self.config, grab.node);
            debug!(node = grab.node, "tap");
            PointerRelease::Tapped(grab.node)
        } else {
            self.drop_grabbed(grab, now);
            PointerRelease::Dropped(grab.node)
        }
    }

    /// Abandons a drag without pinning. The node drifts back toward where it
    /// was picked up.
    pub fn pointer_leave(&mut self) {
        self.pointer.down = false;
        self.pointer.hovered = None;
        if let Some(grab) = self.pointer.grabbed.take()
            && let Some(node) = self.graph.node_mut(grab.node)
        {
            node.interaction = InteractionState::Free;
            node.returning_home = true;
        }
    }

    fn drop_grabbed(&mut self, grab: Grab, now: f64) {
        let config = &self.config;
        let Some(main) = self.graph.node_mut(grab.node) else {
            return;
        };
        main.interaction = InteractionState::Pinned {
            until: now + config.pin_ms,
        };
        main.cooldown_until = now + config.drag_cooldown_ms;
        main.velocity = Vec2::ZERO;
        main.extend_release_ramp(now + config.release_ramp_ms);
        let main_pos = main.pos;

        let desired = self.rng.gen_range(2..=5);
        let partners = regroup_partners(&self.graph, config, grab.node, desired, grab.origin);
        for &partner in &partners {
            let toward = self.rng.gen_range(0.06_f32..0.12);
            let Some(node) = self.graph.node_mut(partner) else {
                continue;
            };
            let (direction, _) = direction_to(node.pos, main_pos, 1.0);
            node.velocity += direction * toward;
            node.add_attention(REGROUP_ATTENTION);
            node.extend_release_ramp(now + config.release_ramp_ms);
            self.graph.reinforce_edge(
                grab.node,
                partner,
                REGROUP_EDGE_BUMP,
                (config.initial_edge_strength + REGROUP_NEW_EDGE_BONUS).min(1.0),
            );
        }

        debug!(node = grab.node, partners = partners.len(), "dropped own node");
    }
}
