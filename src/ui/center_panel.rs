use eframe::egui;

use crate::engine::progression::CONCLUDE_CHOICE;
use crate::engine::protocol::EngineCommand;
use crate::model::progress::{StoryLength, TurnResponse};
use crate::model::story_export::DEFAULT_EXPORT_FILE_NAME;

use super::app::StoryApp;

const EXAMPLE_PROMPTS: [&str; 3] = [
    "A dragon in a futuristic city",
    "A detective solving a mysterious case",
    "An explorer discovering an ancient temple",
];

pub fn draw_center_panel(ctx: &egui::Context, app: &mut StoryApp) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("AI Storytelling Adventure");
        ui.label("Create interactive stories powered by AI and your imagination");
        ui.separator();

        if let Some(error) = &app.ui.error {
            ui.colored_label(egui::Color32::from_rgb(200, 60, 60), error);
            ui.separator();
        }

        match app.ui.current.clone() {
            None => draw_start(ui, app),
            Some(turn) => draw_story(ui, app, &turn),
        }
    });
}

fn draw_start(ui: &mut egui::Ui, app: &mut StoryApp) {
    ui.heading("Begin Your Adventure");
    ui.add_space(6.0);

    ui.label("Choose your story length:");
    ui.horizontal(|ui| {
        for length in StoryLength::PRESETS {
            ui.selectable_value(&mut app.ui.length, length, length.label());
        }
        let custom = StoryLength::Custom(app.ui.custom_length);
        ui.selectable_value(&mut app.ui.length, custom, "Custom");
        if ui
            .add(egui::DragValue::new(&mut app.ui.custom_length).range(1..=50))
            .changed()
            && matches!(app.ui.length, StoryLength::Custom(_))
        {
            app.ui.length = StoryLength::Custom(app.ui.custom_length);
        }
    });

    ui.add_space(6.0);
    ui.label("Enter a prompt to begin your story. Be creative! Some examples:");
    for example in EXAMPLE_PROMPTS {
        if ui.link(format!("- \"{example}\"")).clicked() {
            app.ui.prompt_input = example.to_string();
        }
    }

    ui.add_space(6.0);
    ui.add(
        egui::TextEdit::multiline(&mut app.ui.prompt_input)
            .hint_text("Enter your story prompt...")
            .desired_rows(3)
            .desired_width(f32::INFINITY),
    );

    let can_submit = !app.ui.pending && !app.ui.prompt_input.trim().is_empty();
    ui.horizontal(|ui| {
        if ui
            .add_enabled(can_submit, egui::Button::new("Create My Adventure"))
            .clicked()
        {
            let prompt = app.ui.prompt_input.trim().to_string();
            let length = app.ui.length;
            app.send_command(EngineCommand::BeginStory { prompt, length });
        }
        if app.ui.pending {
            ui.spinner();
        }
    });
}

#[derive(Debug, PartialEq, Eq)]
enum NextStep {
    Ended,
    /// Still in progress, but the model offered no choices.
    ConcludeOnly,
    Choose,
}

fn next_step(turn: &TurnResponse) -> NextStep {
    if turn.progress.is_ending {
        NextStep::Ended
    } else if turn.choices.is_empty() {
        NextStep::ConcludeOnly
    } else {
        NextStep::Choose
    }
}

fn draw_story(ui: &mut egui::Ui, app: &mut StoryApp, turn: &TurnResponse) {
    let progress = turn.progress;
    let caption = if progress.is_ending {
        "The End".to_string()
    } else {
        format!("Scene {} of {}", progress.current, progress.max)
    };
    ui.add(egui::ProgressBar::new(progress.fraction()).text(caption));
    ui.add_space(6.0);

    let mut scroll = egui::ScrollArea::vertical().max_height((ui.available_height() - 160.0).max(120.0));
    if app.ui.should_scroll_top {
        scroll = scroll.vertical_scroll_offset(0.0);
        app.ui.should_scroll_top = false;
    }
    scroll.show(ui, |ui| {
        if let Some(image) = &turn.image {
            ui.hyperlink_to("View illustration", image);
            ui.add_space(6.0);
        }
        ui.label(&turn.story);
    });

    ui.separator();

    let idle = !app.ui.pending;

    match next_step(turn) {
        NextStep::Ended => {
            ui.label(egui::RichText::new("Your story has reached its conclusion.").italics());
        }
        NextStep::ConcludeOnly => {
            ui.label("The story offers no paths forward.");
            if ui.add_enabled(idle, egui::Button::new(CONCLUDE_CHOICE)).clicked() {
                app.send_command(EngineCommand::ConcludeStory);
            }
        }
        NextStep::Choose => {
            ui.label("What happens next?");
            for choice in &turn.choices {
                if ui.add_enabled(idle, egui::Button::new(choice.as_str())).clicked() {
                    app.send_command(EngineCommand::AdvanceStory(choice.clone()));
                }
            }
        }
    }

    ui.add_space(6.0);
    ui.horizontal(|ui| {
        if ui.add_enabled(idle, egui::Button::new("Save story")).clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .set_file_name(DEFAULT_EXPORT_FILE_NAME)
                .add_filter("Text", &["txt"])
                .save_file()
            {
                app.send_command(EngineCommand::SaveStory(path));
            }
        }
        if ui.add_enabled(idle, egui::Button::new("Start over")).clicked() {
            app.send_command(EngineCommand::Reset { length: None });
        }
        if app.ui.pending {
            ui.spinner();
        }
    });
}
