use eframe::egui::{Vec2, vec2};
use rand::Rng;

use super::config::SimConfig;
use super::graph::{Graph, InteractionState, Node};
use crate::util::{direction_to, lerp};

#[derive(Default)]
pub(super) struct PhysicsScratch {
    positions: Vec<Vec2>,
    forces: Vec<Vec2>,
    damping: Vec<f32>,
    spring_count: Vec<u32>,
}

impl PhysicsScratch {
    fn reset(&mut self, graph: &Graph) {
        let node_count = graph.len();
        self.positions.clear();
        self.positions.extend(graph.nodes.iter().map(|node| node.pos));
        self.forces.clear();
        self.forces.resize(node_count, Vec2::ZERO);
        self.damping.clear();
        self.damping.resize(node_count, 1.0);
        self.spring_count.clear();
        self.spring_count.resize(node_count, 0);
    }
}

struct RedSource {
    id: usize,
    pos: Vec2,
    age_factor: f32,
}

/// Direction for coincident nodes, spread by the golden ratio so stacked
/// nodes separate along different axes.
fn fallback_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn bounce(node_pos: &mut Vec2, velocity: &mut Vec2, bounds: Vec2, config: &SimConfig) {
    let margin = config.bounds_margin;
    if bounds.x <= margin * 2.0 || bounds.y <= margin * 2.0 {
        return;
    }

    if node_pos.x < margin {
        node_pos.x = margin;
        velocity.x *= -config.bounce_damping;
    } else if node_pos.x > bounds.x - margin {
        node_pos.x = bounds.x - margin;
        velocity.x *= -config.bounce_damping;
    }

    if node_pos.y < margin {
        node_pos.y = margin;
        velocity.y *= -config.bounce_damping;
    } else if node_pos.y > bounds.y - margin {
        node_pos.y = bounds.y - margin;
        velocity.y *= -config.bounce_damping;
    }
}

pub(super) fn step_physics<R: Rng>(
    graph: &mut Graph,
    config: &SimConfig,
    bounds: Vec2,
    now: f64,
    dt_ms: f32,
    scratch: &mut PhysicsScratch,
    rng: &mut R,
) {
    let dt = dt_ms.clamp(0.0, config.max_frame_dt_ms);
    let node_count = graph.len();
    if node_count == 0 {
        return;
    }

    for node in &mut graph.nodes {
        if node.settle_interaction(now) {
            if node.interaction != InteractionState::Dragging {
                node.velocity = Vec2::ZERO;
            }
            continue;
        }

        node.pos += node.velocity;
        bounce(&mut node.pos, &mut node.velocity, bounds, config);
    }

    scratch.reset(graph);

    for index in 0..node_count {
        let home_target = {
            let node = &graph.nodes[index];
            if node.returning_home && !node.is_locked() {
                let neighbor = graph
                    .strongest_incident(index)
                    .filter(|edge| edge.strength > config.home_neighbor_strength)
                    .map(|edge| scratch.positions[edge.other(index)]);
                Some(neighbor.unwrap_or(node.home))
            } else {
                None
            }
        };

        let node = &mut graph.nodes[index];

        if node.semantic_pull.as_ref().is_some_and(|pull| pull.until <= now) {
            node.semantic_pull = None;
        }
        if let Some(pull) = &node.semantic_pull
            && pull.target != index
            && let Some(&target) = scratch.positions.get(pull.target)
        {
            let (direction, _) = direction_to(node.pos, target, config.min_distance);
            node.velocity += direction * config.semantic_pull_gain * pull.strength;
        }

        if node.attention > config.red_threshold {
            node.red_since.get_or_insert(now);
        } else {
            node.red_since = None;
        }

        if let Some(target) = home_target {
            let (direction, distance) = direction_to(node.pos, target, config.min_distance);
            let acceleration = distance * node.return_speed * 0.08 * dt;
            node.velocity += direction * acceleration;
            if (target - node.pos).length() < config.home_epsilon {
                node.returning_home = false;
            }
        }

        node.attention = (node.attention - config.attention_decay_per_ms * dt).clamp(0.0, 1.0);
        let target_radius = node.base_radius * (1.0 + node.attention * config.radius_attention_gain);
        let eased = node.radius + (target_radius - node.radius) * config.radius_easing;
        node.set_radius(eased, config.min_radius);
    }

    apply_red_alert(graph, config, now, dt);
    apply_springs(graph, config, now, scratch);
    resolve_collisions(graph, config, now);
    clamp_speeds(graph, config);
    update_colors(graph, config);

    for edge in &mut graph.edges {
        edge.adjust(rng.gen_range(-0.5_f32..0.5) * config.edge_drift_per_ms * dt);
    }
}

fn apply_red_alert(graph: &mut Graph, config: &SimConfig, now: f64, dt: f32) {
    let red_sources = graph
        .nodes
        .iter()
        .filter_map(|node| {
            let since = node.red_since?;
            let age = now - since;
            (age > config.red_alert_ms).then(|| RedSource {
                id: node.id,
                pos: node.pos,
                age_factor: ((age / (config.red_alert_ms * 2.0)) as f32).min(1.0),
            })
        })
        .collect::<Vec<_>>();

    for red in &red_sources {
        for other in &mut graph.nodes {
            if other.id == red.id || other.is_locked() {
                continue;
            }

            let (direction, distance) = direction_to(red.pos, other.pos, config.min_distance);
            let direction = if direction == Vec2::ZERO {
                fallback_direction(red.id, other.id)
            } else {
                direction
            };
            let repel = config.red_repel_base * red.age_factor / distance.powf(1.05);
            other.velocity += direction * repel * (dt * config.red_repel_dt_scale);
            other.attention = (other.attention
                - config.red_attention_drain_per_ms * dt * red.age_factor)
                .clamp(0.0, 1.0);
        }
    }
}

fn spring_factor(node: &Node, config: &SimConfig, now: f64) -> f32 {
    let pin_effect = node.pin_effect(now, config.pin_ms, config.release_ramp_ms, config.ramp_floor);
    if node.in_cooldown(now) {
        config.cooldown_spring_factor * pin_effect
    } else {
        pin_effect
    }
}

fn spring_damping(node: &Node, config: &SimConfig, now: f64) -> f32 {
    if node.in_cooldown(now) {
        config.cooldown_damping
    } else {
        let pin_effect =
            node.pin_effect(now, config.pin_ms, config.release_ramp_ms, config.ramp_floor);
        config.spring_damping + (1.0 - pin_effect) * 0.02
    }
}

fn apply_springs(graph: &mut Graph, config: &SimConfig, now: f64, scratch: &mut PhysicsScratch) {
    for edge in &graph.edges {
        let (from, to) = (edge.a, edge.b);
        let delta = scratch.positions[to] - scratch.positions[from];
        let distance = delta.length().max(config.min_distance);
        let direction = delta / distance;

        let rest_length = config.spring_rest_base + (1.0 - edge.strength) * config.spring_rest_spread;
        let force = direction * (distance - rest_length) * config.spring_constant * edge.strength;

        let node_from = &graph.nodes[from];
        let node_to = &graph.nodes[to];
        scratch.forces[from] += force * spring_factor(node_from, config, now);
        scratch.forces[to] -= force * spring_factor(node_to, config, now);
        scratch.damping[from] *= spring_damping(node_from, config, now);
        scratch.damping[to] *= spring_damping(node_to, config, now);
        scratch.spring_count[from] += 1;
        scratch.spring_count[to] += 1;
    }

    for (index, node) in graph.nodes.iter_mut().enumerate() {
        if !node.is_locked() {
            node.velocity += scratch.forces[index];
        }

        let damping = if scratch.spring_count[index] == 0 {
            config.spring_damping
        } else {
            scratch.damping[index]
        };
        node.velocity *= damping;
    }
}

fn resolve_collisions(graph: &mut Graph, config: &SimConfig, now: f64) {
    let node_count = graph.len();
    for i in 0..node_count {
        for j in (i + 1)..node_count {
            let (head, tail) = graph.nodes.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];

            let delta = b.pos - a.pos;
            let distance = delta.length();
            let min_distance = a.radius + b.radius + config.collision_margin;
            if distance >= min_distance {
                continue;
            }

            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                fallback_direction(i, j)
            };
            let overlap = (min_distance - distance) * config.collision_strength;
            let a_factor = if a.in_cooldown(now) {
                config.cooldown_collision_factor
            } else {
                1.0
            };
            let b_factor = if b.in_cooldown(now) {
                config.cooldown_collision_factor
            } else {
                1.0
            };

            if !a.is_locked() {
                a.velocity -= direction * overlap * a_factor;
            }
            if !b.is_locked() {
                b.velocity += direction * overlap * b_factor;
            }
        }
    }
}

fn clamp_speeds(graph: &mut Graph, config: &SimConfig) {
    let max_speed_sq = config.max_speed * config.max_speed;
    for node in &mut graph.nodes {
        let speed_sq = node.velocity.length_sq();
        if speed_sq > max_speed_sq {
            node.velocity *= config.max_speed / speed_sq.sqrt();
        }
    }
}

fn update_colors(graph: &mut Graph, config: &SimConfig) {
    for node in &mut graph.nodes {
        let base_hue = if node.attention > config.red_threshold {
            config.alarm_hue
        } else {
            lerp(config.calm_hue, config.alarm_hue, (node.attention * 0.9).min(1.0))
        };
        node.hue = base_hue + node.color_offset;
        node.lightness = (lerp(
            config.calm_lightness,
            config.alarm_lightness,
            node.attention * 0.6,
        ) + node.light_offset)
            .clamp(18.0, 80.0);
        node.color_offset *= config.hue_offset_decay;
        node.light_offset *= config.light_offset_decay;
    }
}
