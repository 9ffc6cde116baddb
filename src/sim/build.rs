use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use rand::Rng;

use super::config::SimConfig;
use super::graph::{Graph, NodeId};

/// Splits `total` across `buckets` as evenly as possible, earlier buckets first.
fn partition(total: usize, buckets: usize) -> Vec<usize> {
    let buckets = buckets.max(1);
    let mut counts = vec![total / buckets; buckets];
    for count in counts.iter_mut().take(total % buckets) {
        *count += 1;
    }
    counts
}

/// Cluster centres: left, right, bottom-centre, then evenly around the canvas
/// centre for any extra clusters.
fn cluster_centers(count: usize, size: Vec2) -> Vec<Vec2> {
    let preset = [
        vec2((size.x * 0.18).max(80.0), (size.y * 0.4).max(80.0)),
        vec2((size.x * 0.82).max(80.0), (size.y * 0.4).max(80.0)),
        vec2((size.x * 0.5).max(80.0), (size.y * 0.82).max(120.0)),
    ];

    (0..count)
        .map(|index| {
            preset.get(index).copied().unwrap_or_else(|| {
                let angle = (index as f32 / count as f32) * TAU;
                size * 0.5 + vec2(angle.cos(), angle.sin()) * size.min_elem() * 0.32
            })
        })
        .collect()
}

pub(super) fn spawn_node<R: Rng>(
    graph: &mut Graph,
    config: &SimConfig,
    pos: Vec2,
    rng: &mut R,
) -> NodeId {
    let id = graph.add_node(pos, config.base_radius);
    if let Some(node) = graph.node_mut(id) {
        node.velocity = vec2(rng.gen_range(-0.15..0.15), rng.gen_range(-0.15..0.15));
        node.return_speed = config.return_speed;
    }
    id
}

/// Clustered graph: nodes scattered around a few centres, each linked to its
/// `neighbor_count` nearest peers.
pub fn clustered_graph<R: Rng>(
    config: &SimConfig,
    node_count: usize,
    size: Vec2,
    rng: &mut R,
) -> Graph {
    let mut graph = Graph::new();
    if node_count == 0 {
        return graph;
    }

    let margin = 12.0_f32;
    let cluster_radius = (size.min_elem() * 0.12).clamp(48.0, 90.0);
    let counts = partition(node_count, config.cluster_count);
    let centers = cluster_centers(counts.len(), size);

    for (center, count) in centers.into_iter().zip(counts) {
        for _ in 0..count {
            let angle = rng.gen_range(0.0..TAU);
            let reach = rng.gen_range(0.0..=cluster_radius * 0.85);
            let offset = vec2(angle.cos(), angle.sin()) * reach;
            let pos = vec2(
                (center.x + offset.x).clamp(margin, (size.x - margin).max(margin)),
                (center.y + offset.y).clamp(margin, (size.y - margin).max(margin)),
            );
            spawn_node(&mut graph, config, pos, rng);
        }
    }

    let neighbors = config.neighbor_count.min(node_count - 1);
    for id in 0..graph.len() {
        graph.connect_nearest(id, neighbors, config.initial_edge_strength);
    }

    graph
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn partition_spreads_remainder_first() {
        assert_eq!(partition(20, 3), vec![7, 7, 6]);
        assert_eq!(partition(2, 3), vec![1, 1, 0]);
        assert_eq!(partition(5, 0), vec![5]);
    }

    #[test]
    fn clustered_graph_is_sparse_and_deduplicated() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let graph = clustered_graph(&config, 20, vec2(1000.0, 700.0), &mut rng);

        assert_eq!(graph.len(), 20);
        assert!(graph.edges.len() >= 20 * 3 / 2);
        assert!(graph.edges.len() <= 20 * 3);
        for edge in &graph.edges {
            assert!(edge.a < edge.b);
        }

        let mut pairs = graph
            .edges
            .iter()
            .map(|edge| (edge.a, edge.b))
            .collect::<Vec<_>>();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), graph.edges.len());
    }

    #[test]
    fn every_node_has_at_least_k_neighbors_and_stays_on_canvas() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let size = vec2(800.0, 600.0);
        let graph = clustered_graph(&config, 18, size, &mut rng);

        for node in &graph.nodes {
            assert!(graph.neighbors(node.id).len() >= config.neighbor_count);
            assert!(node.pos.x >= 12.0 && node.pos.x <= size.x - 12.0);
            assert!(node.pos.y >= 12.0 && node.pos.y <= size.y - 12.0);
        }
    }

    #[test]
    fn tiny_graphs_do_not_panic() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(clustered_graph(&config, 0, vec2(400.0, 400.0), &mut rng).is_empty());
        let single = clustered_graph(&config, 1, vec2(400.0, 400.0), &mut rng);
        assert_eq!(single.len(), 1);
        assert!(single.edges.is_empty());
    }
}
