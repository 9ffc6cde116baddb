use eframe::egui::{self, Align, Context, Layout};

use crate::sim::SimulationState;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn new(sim: SimulationState) -> Self {
        let sign_in_name = sim
            .participant()
            .map(|participant| participant.name.clone())
            .unwrap_or_default();

        Self {
            sim,
            canvas_size: None,
            last_frame_ms: None,
            last_pointer: None,
            sign_in_name,
            action_text: String::new(),
            last_action: None,
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context, now: f64) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("social drift");
                    ui.separator();
                    match self.sim.participant() {
                        Some(participant) => ui.label(format!("signed in as {}", participant.name)),
                        None => ui.label("watching"),
                    };
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let state = if self.sim.is_running() { "running" } else { "paused" };
                        ui.label(state);
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui, now));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui, now));
    }
}
