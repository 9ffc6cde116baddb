use std::collections::{BTreeMap, HashMap, VecDeque};

use eframe::egui::Vec2;

pub type NodeId = usize;

/// Who or what currently controls a node's position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionState {
    Free,
    /// Position follows the pointer.
    Dragging,
    /// Dropped by its owner; stationary until `until`.
    Pinned { until: f64 },
    /// Relocated by the stimulus generator; stationary until `until`.
    CoolingDown { until: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SemanticPull {
    pub target: NodeId,
    pub strength: f32,
    pub until: f64,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub base_radius: f32,
    pub radius: f32,
    pub attention: f32,
    pub hue: f32,
    pub lightness: f32,
    pub color_offset: f32,
    pub light_offset: f32,
    pub interaction: InteractionState,
    pub cooldown_until: f64,
    pub release_ramp_until: f64,
    pub home: Vec2,
    pub returning_home: bool,
    pub return_speed: f32,
    pub red_since: Option<f64>,
    pub user_id: Option<String>,
    pub label: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub semantic_pull: Option<SemanticPull>,
}

impl Node {
    fn new(id: NodeId, pos: Vec2, base_radius: f32) -> Self {
        Self {
            id,
            pos,
            velocity: Vec2::ZERO,
            base_radius,
            radius: base_radius,
            attention: 0.0,
            hue: 0.0,
            lightness: 0.0,
            color_offset: 0.0,
            light_offset: 0.0,
            interaction: InteractionState::Free,
            cooldown_until: 0.0,
            release_ramp_until: 0.0,
            home: pos,
            returning_home: false,
            return_speed: 0.000_001_5,
            red_since: None,
            user_id: None,
            label: None,
            embedding: None,
            semantic_pull: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.interaction != InteractionState::Free
    }

    pub fn in_cooldown(&self, now: f64) -> bool {
        self.cooldown_until > now
    }

    pub fn add_attention(&mut self, amount: f32) {
        self.attention = (self.attention + amount).clamp(0.0, 1.0);
    }

    pub fn set_radius(&mut self, radius: f32, min_radius: f32) {
        self.radius = radius.max(min_radius);
    }

    pub fn extend_release_ramp(&mut self, until: f64) {
        self.release_ramp_until = self.release_ramp_until.max(until);
    }

    /// Fraction of spring influence restored after a release, in `[floor, 1]`.
    pub fn release_ramp(&self, now: f64, ramp_ms: f64, floor: f32) -> f32 {
        if self.release_ramp_until > now {
            let remaining = ((self.release_ramp_until - now) / ramp_ms) as f32;
            (1.0 - remaining).max(floor)
        } else {
            1.0
        }
    }

    /// Ramp further reduced while a pin is still counting down.
    pub fn pin_effect(&self, now: f64, pin_ms: f64, ramp_ms: f64, floor: f32) -> f32 {
        let ramp = self.release_ramp(now, ramp_ms, floor);
        match self.interaction {
            InteractionState::Pinned { until } if until > now => {
                (((until - now) / pin_ms) as f32).max(floor) * ramp
            }
            _ => ramp,
        }
    }

    /// Expires pins and cooldowns. Returns true while the node must stay stationary.
    pub fn settle_interaction(&mut self, now: f64) -> bool {
        match self.interaction {
            InteractionState::Free => false,
            InteractionState::Dragging => true,
            InteractionState::Pinned { until } => {
                if until > now || self.in_cooldown(now) {
                    true
                } else {
                    self.interaction = InteractionState::Free;
                    false
                }
            }
            InteractionState::CoolingDown { until } => {
                if until > now {
                    true
                } else {
                    self.interaction = InteractionState::Free;
                    false
                }
            }
        }
    }
}

/// Undirected connection, canonicalized so that `a < b`.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub strength: f32,
}

impl Edge {
    pub fn touches(&self, id: NodeId) -> bool {
        self.a == id || self.b == id
    }

    pub fn other(&self, id: NodeId) -> NodeId {
        if self.a == id { self.b } else { self.a }
    }

    pub fn adjust(&mut self, delta: f32) {
        self.strength = (self.strength + delta).clamp(0.0, 1.0);
    }
}

fn edge_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    (a.min(b), a.max(b))
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    index_by_pair: HashMap<(NodeId, NodeId), usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, pos: Vec2, base_radius: f32) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, pos, base_radius));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn find_by_user(&self, user_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.user_id.as_deref() == Some(user_id))
            .map(|node| node.id)
    }

    pub fn find_edge(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.index_by_pair
            .get(&edge_key(a, b))
            .and_then(|&index| self.edges.get(index))
    }

    pub fn find_edge_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Edge> {
        self.index_by_pair
            .get(&edge_key(a, b))
            .and_then(|&index| self.edges.get_mut(index))
    }

    /// Creates the edge if absent; an existing edge keeps its strength.
    /// Self-loops and unknown endpoints are refused.
    pub fn upsert_edge(&mut self, a: NodeId, b: NodeId, strength: f32) -> Option<&mut Edge> {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return None;
        }

        let key = edge_key(a, b);
        let index = match self.index_by_pair.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.edges.len();
                self.edges.push(Edge {
                    a: key.0,
                    b: key.1,
                    strength: strength.clamp(0.0, 1.0),
                });
                self.index_by_pair.insert(key, index);
                index
            }
        };
        self.edges.get_mut(index)
    }

    /// Adds `bump` to an existing edge, or creates it at `initial` strength.
    pub fn reinforce_edge(&mut self, a: NodeId, b: NodeId, bump: f32, initial: f32) {
        if let Some(edge) = self.find_edge_mut(a, b) {
            edge.adjust(bump);
        } else {
            self.upsert_edge(a, b, initial);
        }
    }

    pub fn adjust_incident_edges(&mut self, id: NodeId, delta: f32) {
        for edge in self.edges.iter_mut().filter(|edge| edge.touches(id)) {
            edge.adjust(delta);
        }
    }

    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|edge| edge.touches(id))
            .map(|edge| edge.other(id))
            .collect()
    }

    /// Neighbors ordered by descending edge strength.
    pub fn strongest_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut incident = self
            .edges
            .iter()
            .filter(|edge| edge.touches(id))
            .collect::<Vec<_>>();
        incident.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        incident.into_iter().map(|edge| edge.other(id)).collect()
    }

    pub fn strongest_incident(&self, id: NodeId) -> Option<&Edge> {
        self.edges
            .iter()
            .filter(|edge| edge.touches(id))
            .max_by(|a, b| a.strength.total_cmp(&b.strength))
    }

    /// Hop distances from `start` over the undirected adjacency. Nodes farther
    /// than `max_hops` (or unreachable) are absent.
    pub fn bfs_distances(&self, start: NodeId, max_hops: usize) -> BTreeMap<NodeId, usize> {
        let mut distances = BTreeMap::new();
        if start >= self.nodes.len() {
            return distances;
        }

        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adjacency[edge.a].push(edge.b);
            adjacency[edge.b].push(edge.a);
        }

        let mut queue = VecDeque::from([start]);
        distances.insert(start, 0);

        while let Some(current) = queue.pop_front() {
            let depth = distances[&current];
            if depth >= max_hops {
                continue;
            }

            for &next in &adjacency[current] {
                if !distances.contains_key(&next) {
                    distances.insert(next, depth + 1);
                    queue.push_back(next);
                }
            }
        }

        distances
    }

    /// The `count` nodes closest to `point`, nearest first, skipping `exclude`.
    pub fn nearest_nodes(&self, point: Vec2, exclude: &[NodeId], count: usize) -> Vec<NodeId> {
        let mut ranked = self
            .nodes
            .iter()
            .filter(|node| !exclude.contains(&node.id))
            .map(|node| (node.id, (node.pos - point).length_sq()))
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.into_iter().take(count).map(|(id, _)| id).collect()
    }

    /// Links `id` to its `count` spatially nearest nodes without touching
    /// edges that already exist.
    pub fn connect_nearest(&mut self, id: NodeId, count: usize, strength: f32) {
        let Some(point) = self.node(id).map(|node| node.pos) else {
            return;
        };
        for other in self.nearest_nodes(point, &[id], count) {
            self.upsert_edge(id, other, strength);
        }
    }

    /// Topmost node whose padded disc contains `point`.
    pub fn node_at(&self, point: Vec2, padding: f32) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|node| (node.pos - point).length() <= node.radius + padding)
            .map(|node| node.id)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn line_graph() -> Graph {
        let mut graph = Graph::new();
        let a = graph.add_node(vec2(0.0, 0.0), 22.0);
        let b = graph.add_node(vec2(100.0, 0.0), 22.0);
        let c = graph.add_node(vec2(200.0, 0.0), 22.0);
        graph.upsert_edge(a, b, 0.5);
        graph.upsert_edge(b, c, 0.5);
        graph
    }

    #[test]
    fn bfs_over_three_node_line() {
        let graph = line_graph();
        let distances = graph.bfs_distances(0, 4);
        assert_eq!(distances, BTreeMap::from([(0, 0), (1, 1), (2, 2)]));
    }

    #[test]
    fn bfs_respects_max_hops() {
        let mut graph = Graph::new();
        for index in 0..8 {
            graph.add_node(vec2(index as f32 * 50.0, 0.0), 22.0);
        }
        for index in 0..7 {
            graph.upsert_edge(index, index + 1, 0.5);
        }

        let distances = graph.bfs_distances(0, 4);
        assert_eq!(distances.len(), 5);
        assert!(distances.values().all(|&hops| hops <= 4));
        assert_eq!(distances.get(&1), Some(&1));
        assert!(!distances.contains_key(&5));
    }

    #[test]
    fn bfs_from_unknown_node_is_empty() {
        assert!(line_graph().bfs_distances(99, 4).is_empty());
    }

    #[test]
    fn upsert_is_order_independent_and_keeps_strength() {
        let mut graph = line_graph();
        graph
            .find_edge_mut(1, 0)
            .expect("edge exists")
            .adjust(0.3);
        graph.upsert_edge(1, 0, 0.1);

        assert_eq!(graph.edges.len(), 2);
        let edge = graph.find_edge(0, 1).expect("edge exists");
        assert_eq!((edge.a, edge.b), (0, 1));
        assert!((edge.strength - 0.8).abs() < 1e-6);
    }

    #[test]
    fn upsert_refuses_self_loops_and_missing_nodes() {
        let mut graph = line_graph();
        assert!(graph.upsert_edge(1, 1, 0.5).is_none());
        assert!(graph.upsert_edge(1, 7, 0.5).is_none());
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn edge_strength_stays_clamped() {
        let mut graph = line_graph();
        graph.reinforce_edge(0, 1, 5.0, 0.5);
        graph.adjust_incident_edges(2, -5.0);
        assert_eq!(graph.find_edge(0, 1).map(|edge| edge.strength), Some(1.0));
        assert_eq!(graph.find_edge(1, 2).map(|edge| edge.strength), Some(0.0));
    }

    #[test]
    fn neighbors_and_strongest_ordering() {
        let mut graph = line_graph();
        graph.find_edge_mut(1, 2).expect("edge exists").adjust(0.2);
        assert_eq!(graph.neighbors(1).len(), 2);
        assert_eq!(graph.strongest_neighbors(1), vec![2, 0]);
        assert_eq!(graph.strongest_incident(1).map(|edge| edge.b), Some(2));
    }

    #[test]
    fn hit_test_prefers_topmost_and_uses_padding() {
        let mut graph = Graph::new();
        graph.add_node(vec2(0.0, 0.0), 22.0);
        graph.add_node(vec2(5.0, 0.0), 22.0);
        assert_eq!(graph.node_at(vec2(2.0, 0.0), 10.0), Some(1));
        assert_eq!(graph.node_at(vec2(-30.0, 0.0), 10.0), Some(0));
        assert_eq!(graph.node_at(vec2(-40.0, 0.0), 10.0), None);
    }

    #[test]
    fn settle_interaction_waits_for_pin_and_cooldown() {
        let mut graph = line_graph();
        let node = graph.node_mut(0).expect("node exists");
        node.interaction = InteractionState::Pinned { until: 3000.0 };
        node.cooldown_until = 1600.0;

        assert!(node.settle_interaction(2000.0));
        assert!(node.is_locked());
        assert!(!node.settle_interaction(3000.0));
        assert_eq!(node.interaction, InteractionState::Free);
    }

    #[test]
    fn release_ramp_rises_from_floor() {
        let mut graph = line_graph();
        let node = graph.node_mut(0).expect("node exists");
        node.extend_release_ramp(10_000.0);
        assert_eq!(node.release_ramp(0.0, 10_000.0, 0.12), 0.12);
        assert!((node.release_ramp(5_000.0, 10_000.0, 0.12) - 0.5).abs() < 1e-6);
        assert_eq!(node.release_ramp(10_000.0, 10_000.0, 0.12), 1.0);
    }
}
