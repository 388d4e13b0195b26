use eframe::egui;

use crate::engine::protocol::EngineCommand;
use crate::settings::settings_io::save_settings;
use crate::settings::Backend;

use super::app::StoryApp;

pub fn draw_left_panel(ctx: &egui::Context, app: &mut StoryApp) {
    egui::SidePanel::left("settings")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Settings");
            ui.separator();

            ui.label("Model");
            for backend in Backend::ALL {
                ui.radio_value(&mut app.settings.backend, backend, backend.label());
            }

            ui.separator();

            match app.settings.backend {
                Backend::Gemini => {
                    ui.label("Gemini model");
                    ui.text_edit_singleline(&mut app.settings.gemini_model);
                }
                Backend::OpenAiCompatible => {
                    ui.label("Endpoint");
                    ui.text_edit_singleline(&mut app.settings.openai_endpoint);
                    ui.label("Model name");
                    ui.text_edit_singleline(&mut app.settings.openai_model);
                }
                Backend::Demo => {
                    ui.label("Canned scenes, no model needed.");
                }
            }

            ui.label("Temperature");
            ui.add(egui::Slider::new(&mut app.settings.temperature, 0.0..=2.0));

            ui.separator();
            ui.label("UI Scale");
            ui.add(egui::Slider::new(&mut app.settings.ui_scale, 0.75..=2.0));

            ui.separator();

            let idle = !app.ui.pending;
            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("Apply")).clicked() {
                    let settings = app.settings.clone();
                    app.send_command(EngineCommand::ApplySettings(settings));
                }
                if ui.add_enabled(idle, egui::Button::new("Test")).clicked() {
                    app.send_command(EngineCommand::TestConnection);
                }
                if ui.button("Save").clicked() {
                    app.ui.status = match save_settings(&app.settings) {
                        Ok(()) => Some("Settings saved".into()),
                        Err(e) => Some(format!("Could not save settings: {e:#}")),
                    };
                }
            });

            if let Some(status) = &app.ui.status {
                ui.add_space(6.0);
                ui.label(status);
            }
        });
}
