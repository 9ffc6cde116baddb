use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};

use crate::sim::RenderSnapshot;

use super::ViewModel;
use super::render_utils::{canvas_to_screen, draw_background, hsl_color, rgba, screen_to_canvas};

impl ViewModel {
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui, now: f64) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.fit_canvas(rect.size(), now);
        self.handle_pointer(ui, rect, now);

        let dt_ms = self
            .last_frame_ms
            .map_or(16.0, |last| (now - last).max(0.0) as f32);
        self.last_frame_ms = Some(now);
        self.sim.frame(now, dt_ms);

        let snapshot = self.sim.snapshot(now);
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);
        Self::paint_snapshot(&painter, rect, &snapshot);

        if let Some(hovered) = snapshot.nodes.iter().find(|node| node.hovered) {
            let name = hovered
                .label
                .clone()
                .unwrap_or_else(|| format!("node {}", hovered.id));
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{name}  |  attention {:.2}", hovered.attention),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
            let cursor = if self.sim.grabbed().is_some() {
                egui::CursorIcon::Grabbing
            } else if hovered.owned {
                egui::CursorIcon::Grab
            } else {
                egui::CursorIcon::Default
            };
            ui.output_mut(|output| output.cursor_icon = cursor);
        }

        ui.ctx().request_repaint();
    }

    /// Keeps the simulation bounds equal to the canvas. The very first
    /// layout regenerates the graph so clusters fit the real window.
    fn fit_canvas(&mut self, size: egui::Vec2, now: f64) {
        if self.canvas_size == Some(size) {
            return;
        }
        self.sim.set_bounds(size);
        if self.canvas_size.is_none() {
            self.sim.reset(now);
        }
        self.canvas_size = Some(size);
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, now: f64) {
        let (latest, pressed, released) = ui.input(|input| {
            (
                input.pointer.latest_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
            )
        });

        let Some(local) = latest
            .filter(|pos| rect.contains(*pos))
            .map(|pos| screen_to_canvas(rect, pos))
        else {
            if self.last_pointer.take().is_some() {
                self.sim.pointer_leave();
            }
            return;
        };

        if self.last_pointer != Some(local) {
            self.sim.pointer_move(local, now);
        }
        if pressed {
            self.sim.pointer_down(local, now);
        }
        if released {
            self.sim.pointer_up(local, now);
        }
        self.last_pointer = Some(local);
    }

    fn paint_snapshot(painter: &egui::Painter, rect: Rect, snapshot: &RenderSnapshot) {
        for edge in &snapshot.edges {
            painter.line_segment(
                [canvas_to_screen(rect, edge.from), canvas_to_screen(rect, edge.to)],
                Stroke::new(edge.width, rgba(226, 232, 240, edge.alpha)),
            );
        }

        for node in &snapshot.nodes {
            let center = canvas_to_screen(rect, node.pos);
            painter.circle_filled(
                center,
                node.radius,
                hsl_color(node.hue, node.saturation, node.lightness, 0.95),
            );
            painter.circle_stroke(
                center,
                node.radius,
                Stroke::new(2.0, rgba(0, 0, 0, 0.08 + node.attention * 0.35)),
            );

            if node.halo {
                painter.circle_stroke(
                    center,
                    node.radius + 6.0,
                    Stroke::new(
                        2.0 + node.attention * 6.0,
                        rgba(200, 20, 20, 0.12 + (node.attention - 0.85) * 2.0),
                    ),
                );
            }
            if node.owned {
                painter.circle_stroke(
                    center,
                    node.radius + 10.0,
                    Stroke::new(2.5, rgba(255, 255, 255, snapshot.owner_pulse)),
                );
            }
            if node.hovered {
                painter.circle_stroke(
                    center,
                    node.radius + 3.0,
                    Stroke::new(1.0, Color32::from_gray(220)),
                );
            }
            if let Some(label) = &node.label {
                painter.text(
                    center + vec2(0.0, node.radius + 14.0),
                    Align2::CENTER_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }
    }
}
