use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

/// `hue` in degrees, `saturation` and `lightness` in percent, `alpha` in `[0, 1]`.
pub(super) fn hsl_color(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Color32 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |value: f32| ((value + m).clamp(0.0, 1.0) * 255.0).round() as u8;

    Color32::from_rgba_unmultiplied(
        channel(r),
        channel(g),
        channel(b),
        (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

pub(super) fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0) as u8)
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = 56.0;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 50));

    let mut x = rect.left() + step;
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + step;
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn canvas_to_screen(rect: Rect, canvas: Vec2) -> Pos2 {
    rect.min + canvas
}

pub(super) fn screen_to_canvas(rect: Rect, screen: Pos2) -> Vec2 {
    screen - rect.min
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_color(0.0, 100.0, 50.0, 1.0), Color32::from_rgb(255, 0, 0));
        assert_eq!(hsl_color(120.0, 100.0, 50.0, 1.0), Color32::from_rgb(0, 255, 0));
        assert_eq!(hsl_color(240.0, 100.0, 50.0, 1.0), Color32::from_rgb(0, 0, 255));
        assert_eq!(hsl_color(-120.0, 100.0, 50.0, 1.0), Color32::from_rgb(0, 0, 255));
        assert_eq!(hsl_color(42.0, 0.0, 100.0, 1.0), Color32::WHITE);
    }

    #[test]
    fn canvas_mapping_is_an_offset() {
        let rect = Rect::from_min_size(pos2(200.0, 40.0), vec2(800.0, 600.0));
        let screen = canvas_to_screen(rect, vec2(10.0, 20.0));
        assert_eq!(screen, pos2(210.0, 60.0));
        assert_eq!(screen_to_canvas(rect, screen), vec2(10.0, 20.0));
    }
}
