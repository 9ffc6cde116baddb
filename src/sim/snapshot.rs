use eframe::egui::Vec2;

use super::SimulationState;
use super::config::SimConfig;
use super::graph::NodeId;

const HALO_ATTENTION: f32 = 0.85;

#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub pos: Vec2,
    pub radius: f32,
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub attention: f32,
    pub label: Option<String>,
    pub owned: bool,
    pub hovered: bool,
    pub halo: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeView {
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
    pub alpha: f32,
}

/// Read-only picture of one frame.
#[derive(Clone, Debug, Default)]
pub struct RenderSnapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    /// Opacity of the ring around the participant's own node.
    pub owner_pulse: f32,
}

/// Stroke width and opacity for an edge: both grow with strength and with
/// how close its endpoints are.
pub fn edge_style(strength: f32, distance: f32, config: &SimConfig) -> (f32, f32) {
    let span = config.edge_max_distance - config.edge_min_distance;
    let closeness = (1.0 - (distance - config.edge_min_distance) / span).clamp(0.0, 1.0);
    let width = (0.6 + strength * 5.0 * closeness).max(0.4);
    let alpha = 0.06 + strength * 0.9 * closeness;
    (width, alpha)
}

impl SimulationState {
    pub fn snapshot(&self, now: f64) -> RenderSnapshot {
        let owner = self.owner_node();
        let hovered = self.pointer.hovered;

        let nodes = self
            .graph
            .nodes
            .iter()
            .map(|node| NodeView {
                id: node.id,
                pos: node.pos,
                radius: node.radius,
                hue: node.hue.rem_euclid(360.0),
                saturation: self.config.saturation,
                lightness: node.lightness,
                attention: node.attention,
                label: node.label.clone(),
                owned: owner == Some(node.id),
                hovered: hovered == Some(node.id),
                halo: node.attention > HALO_ATTENTION,
            })
            .collect();

        let edges = self
            .graph
            .edges
            .iter()
            .filter_map(|edge| {
                let from = self.graph.node(edge.a)?.pos;
                let to = self.graph.node(edge.b)?.pos;
                let (width, alpha) = edge_style(edge.strength, (to - from).length(), &self.config);
                Some(EdgeView {
                    from,
                    to,
                    width,
                    alpha,
                })
            })
            .collect();

        let seconds = (now / 1000.0) as f32;
        RenderSnapshot {
            nodes,
            edges,
            owner_pulse: 0.45 + 0.25 * (seconds * 3.0).sin().abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    #[test]
    fn edge_style_follows_strength_and_closeness() {
        let config = SimConfig::default();
        let (near_width, near_alpha) = edge_style(1.0, 20.0, &config);
        assert!((near_width - 5.6).abs() < 1e-5);
        assert!((near_alpha - 0.96).abs() < 1e-5);

        let (far_width, far_alpha) = edge_style(1.0, 500.0, &config);
        assert!((far_width - 0.6).abs() < 1e-6);
        assert!((far_alpha - 0.06).abs() < 1e-6);

        let (weak_width, _) = edge_style(0.2, 120.0, &config);
        let (strong_width, _) = edge_style(0.8, 120.0, &config);
        assert!(strong_width > weak_width);
    }

    #[test]
    fn snapshot_marks_owner_and_halo() {
        let mut state = SimulationState::new(SimConfig::default(), vec2(800.0, 600.0), Some(2));
        let owner = state.sign_in("u-1", "Ada");
        state.graph.nodes[0].attention = 0.9;

        let snapshot = state.snapshot(500.0);
        assert_eq!(snapshot.nodes.len(), state.graph.len());
        assert_eq!(snapshot.edges.len(), state.graph.edges.len());
        assert!(snapshot.nodes[owner].owned);
        assert_eq!(snapshot.nodes[owner].label.as_deref(), Some("Ada"));
        assert_eq!(snapshot.nodes.iter().filter(|node| node.owned).count(), 1);
        assert!(snapshot.nodes[0].halo);
        assert!((0.45..=0.7).contains(&snapshot.owner_pulse));
    }
}
