use std::time::Instant;

use eframe::egui::{Context, Vec2};

use crate::sim::SimulationState;

mod canvas;
mod render_utils;
mod ui;

pub struct SocialDriftApp {
    started: Instant,
    model: ViewModel,
}

struct ViewModel {
    sim: SimulationState,
    canvas_size: Option<Vec2>,
    last_frame_ms: Option<f64>,
    last_pointer: Option<Vec2>,
    sign_in_name: String,
    action_text: String,
    last_action: Option<String>,
}

impl SocialDriftApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, sim: SimulationState) -> Self {
        Self {
            started: Instant::now(),
            model: ViewModel::new(sim),
        }
    }
}

impl eframe::App for SocialDriftApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = self.started.elapsed().as_secs_f64() * 1000.0;
        self.model.show(ctx, now);
    }
}
