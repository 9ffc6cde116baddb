use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tuned simulation constants. Every field has a default, so a JSON config
/// file only needs to name the values it overrides.
///
/// Times are milliseconds, distances are canvas pixels, and per-tick rates
/// assume roughly one tick per display frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub node_count: usize,
    pub cluster_count: usize,
    /// Nearest neighbors each generated node links to.
    pub neighbor_count: usize,
    pub initial_edge_strength: f32,
    pub base_radius: f32,
    pub min_radius: f32,
    /// Radius grows to `base_radius * (1 + attention * radius_attention_gain)`.
    pub radius_attention_gain: f32,
    pub radius_easing: f32,
    pub max_frame_dt_ms: f32,
    pub bounds_margin: f32,
    pub bounce_damping: f32,
    pub min_distance: f32,

    pub attention_decay_per_ms: f32,
    pub red_threshold: f32,
    pub red_alert_ms: f64,
    pub red_repel_base: f32,
    pub red_repel_dt_scale: f32,
    pub red_attention_drain_per_ms: f32,

    pub spring_rest_base: f32,
    pub spring_rest_spread: f32,
    pub spring_constant: f32,
    pub spring_damping: f32,
    pub cooldown_damping: f32,
    pub cooldown_spring_factor: f32,
    /// Per-tick speed cap in pixels.
    pub max_speed: f32,
    /// Floor for the ramped spring influence right after a release.
    pub ramp_floor: f32,

    pub collision_margin: f32,
    pub collision_strength: f32,
    pub cooldown_collision_factor: f32,

    pub semantic_pull_gain: f32,
    pub home_neighbor_strength: f32,
    pub home_epsilon: f32,
    pub return_speed: f32,
    pub edge_drift_per_ms: f32,

    pub calm_hue: f32,
    pub alarm_hue: f32,
    pub saturation: f32,
    pub calm_lightness: f32,
    pub alarm_lightness: f32,
    pub hue_offset_decay: f32,
    pub light_offset_decay: f32,

    pub max_hops: usize,
    pub hop_delay_ms: f64,
    pub hop_delay_jitter_ms: f64,
    pub hop_intensity_falloff: f32,
    pub min_intensity: f32,
    pub similarity_threshold: f32,
    pub attach_probability: f64,

    pub pin_ms: f64,
    pub drag_cooldown_ms: f64,
    pub auto_drag_cooldown_ms: f64,
    pub release_ramp_ms: f64,
    pub tap_max_ms: f64,
    pub tap_max_distance: f32,
    pub hit_padding: f32,
    pub intensify_radius: f32,
    /// Nodes without an edge to a dropped node are only regrouped from
    /// within this distance.
    pub regroup_search_radius: f32,

    pub auto_interval_ms: f64,
    pub auto_fire_probability: f64,
    pub ambient_interval_ms: f64,

    pub edge_min_distance: f32,
    pub edge_max_distance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 20,
            cluster_count: 3,
            neighbor_count: 3,
            initial_edge_strength: 0.5,
            base_radius: 22.0,
            min_radius: 6.0,
            radius_attention_gain: 1.6,
            radius_easing: 0.01,
            max_frame_dt_ms: 60.0,
            bounds_margin: 10.0,
            bounce_damping: 0.3,
            min_distance: 1.0,

            attention_decay_per_ms: 0.0004,
            red_threshold: 0.88,
            red_alert_ms: 8000.0,
            red_repel_base: 0.16,
            red_repel_dt_scale: 0.002,
            red_attention_drain_per_ms: 0.0008,

            spring_rest_base: 60.0,
            spring_rest_spread: 120.0,
            spring_constant: 0.0016,
            spring_damping: 0.96,
            cooldown_damping: 0.992,
            cooldown_spring_factor: 0.08,
            max_speed: 6.0,
            ramp_floor: 0.12,

            collision_margin: 6.0,
            collision_strength: 0.008,
            cooldown_collision_factor: 0.12,

            semantic_pull_gain: 0.09,
            home_neighbor_strength: 0.46,
            home_epsilon: 0.2,
            return_speed: 0.000_001_5,
            edge_drift_per_ms: 0.0004,

            calm_hue: 220.0,
            alarm_hue: 8.0,
            saturation: 70.0,
            calm_lightness: 60.0,
            alarm_lightness: 45.0,
            hue_offset_decay: 0.985,
            light_offset_decay: 0.97,

            max_hops: 4,
            hop_delay_ms: 260.0,
            hop_delay_jitter_ms: 120.0,
            hop_intensity_falloff: 0.18,
            min_intensity: 0.2,
            similarity_threshold: 0.38,
            attach_probability: 0.55,

            pin_ms: 3000.0,
            drag_cooldown_ms: 1600.0,
            auto_drag_cooldown_ms: 2400.0,
            release_ramp_ms: 10_000.0,
            tap_max_ms: 300.0,
            tap_max_distance: 12.0,
            hit_padding: 10.0,
            intensify_radius: 150.0,
            regroup_search_radius: 160.0,

            auto_interval_ms: 2200.0,
            auto_fire_probability: 0.9,
            ambient_interval_ms: 220.0,

            edge_min_distance: 20.0,
            edge_max_distance: 220.0,
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("config is not valid JSON")?;
        Ok(config.sanitized())
    }

    /// Clamps values that would break the simulation invariants.
    pub fn sanitized(mut self) -> Self {
        self.min_radius = self.min_radius.max(1.0);
        self.base_radius = self.base_radius.max(self.min_radius);
        self.initial_edge_strength = self.initial_edge_strength.clamp(0.0, 1.0);
        self.cluster_count = self.cluster_count.max(1);
        self.max_frame_dt_ms = self.max_frame_dt_ms.max(1.0);
        self.min_distance = self.min_distance.max(0.0001);
        self.red_threshold = self.red_threshold.clamp(0.0, 1.0);
        self.attach_probability = self.attach_probability.clamp(0.0, 1.0);
        self.auto_fire_probability = self.auto_fire_probability.clamp(0.0, 1.0);
        self.release_ramp_ms = self.release_ramp_ms.max(1.0);
        self.pin_ms = self.pin_ms.max(1.0);
        if self.edge_max_distance <= self.edge_min_distance {
            self.edge_max_distance = self.edge_min_distance + 1.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "node_count": 42, "red_alert_ms": 500 }"#)
            .expect("valid config");
        assert_eq!(config.node_count, 42);
        assert_eq!(config.red_alert_ms, 500.0);
        assert_eq!(config.neighbor_count, SimConfig::default().neighbor_count);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(SimConfig::from_json("{ node_count: }").is_err());
    }

    #[test]
    fn sanitize_repairs_radius_and_strength() {
        let config = SimConfig {
            min_radius: -3.0,
            base_radius: 0.5,
            initial_edge_strength: 4.0,
            ..SimConfig::default()
        }
        .sanitized();
        assert_eq!(config.min_radius, 1.0);
        assert_eq!(config.base_radius, 1.0);
        assert_eq!(config.initial_edge_strength, 1.0);
    }
}
