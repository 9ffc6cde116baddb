use eframe::egui::{self, Key, Ui};

use crate::sim::Participant;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Simulation");
        ui.separator();
        ui.add_space(4.0);

        self.draw_participant(ui);
        ui.separator();
        self.draw_action(ui, now);
        ui.separator();

        let mut running = self.sim.is_running();
        if ui
            .checkbox(&mut running, "Run simulation")
            .on_hover_text("Pause to freeze physics, effects and autonomous events.")
            .changed()
        {
            self.sim.set_running(running);
        }

        let mut auto_events = self.sim.auto_events();
        if ui
            .checkbox(&mut auto_events, "Autonomous events")
            .on_hover_text("Let random nodes act on their own every couple of seconds.")
            .changed()
        {
            self.sim.set_auto_events(auto_events);
        }

        if ui
            .button("Reset graph")
            .on_hover_text("Discard every node and edge and grow a new population.")
            .clicked()
        {
            self.sim.reset(now);
            self.last_action = None;
        }

        ui.separator();
        let graph = self.sim.graph();
        ui.label(format!("nodes: {}", graph.len()));
        ui.label(format!("edges: {}", graph.edges.len()));
        ui.label(format!("pending effects: {}", self.sim.pending_effects()));
        ui.label(format!("generation: {}", self.sim.generation()));
    }

    fn draw_participant(&mut self, ui: &mut Ui) {
        if let Some(participant) = self.sim.participant() {
            ui.label(format!("Signed in as {}", participant.name));
            ui.small("Drag your ringed node to move it; tap it to pulse.");
            if ui.button("Sign out").clicked() {
                self.sim.sign_out();
            }
            return;
        }

        ui.label("Display name");
        let response = ui.text_edit_singleline(&mut self.sign_in_name);
        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        let name = self.sign_in_name.trim().to_owned();
        let clicked = ui
            .add_enabled(!name.is_empty(), egui::Button::new("Sign in"))
            .clicked();
        if (clicked || submitted) && !name.is_empty() {
            self.sim.sign_in(&Participant::local_id(&name), &name);
        }
    }

    fn draw_action(&mut self, ui: &mut Ui, now: f64) {
        let signed_in = self.sim.participant().is_some();
        ui.label("Say something");
        let response = ui.add_enabled(
            signed_in,
            egui::TextEdit::singleline(&mut self.action_text).hint_text("ripples out from you"),
        );
        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        let clicked = ui
            .add_enabled(signed_in, egui::Button::new("Send"))
            .clicked();

        if (clicked || submitted) && self.sim.propagate_participant_text(&self.action_text, now) {
            self.last_action = Some(self.action_text.trim().to_owned());
            self.action_text.clear();
        }
        if let Some(action) = &self.last_action {
            ui.small(format!("last: {action}"));
        }
    }
}
