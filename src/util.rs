use eframe::egui::Vec2;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Unit vector from `from` toward `to` plus the distance, floored at `min_distance`
/// so callers can divide by it safely.
pub fn direction_to(from: Vec2, to: Vec2, min_distance: f32) -> (Vec2, f32) {
    let delta = to - from;
    let distance = delta.length().max(min_distance);
    (delta / distance, distance)
}

/// Cosine similarity in [-1, 1]; mismatched lengths or zero vectors yield 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    #[test]
    fn cosine_of_parallel_and_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_degenerate_inputs_is_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn direction_to_floors_distance() {
        let (direction, distance) = direction_to(vec2(5.0, 5.0), vec2(5.0, 5.0), 1.0);
        assert_eq!(distance, 1.0);
        assert_eq!(direction, Vec2::ZERO);

        let (direction, distance) = direction_to(vec2(0.0, 0.0), vec2(3.0, 4.0), 1.0);
        assert!((distance - 5.0).abs() < 1e-6);
        assert!((direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(220.0, 8.0, 0.0), 220.0);
        assert_eq!(lerp(220.0, 8.0, 1.0), 8.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
    }
}
