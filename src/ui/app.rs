use eframe::egui;
use std::sync::mpsc;

use crate::engine::engine::Engine;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::model::progress::{StoryLength, TurnResponse};
use crate::settings::{AppSettings, Credentials};

use super::center_panel::draw_center_panel;
use super::left_panel::draw_left_panel;

/* =========================
   UI State
   ========================= */

pub(crate) struct UiState {
    pub prompt_input: String,
    pub length: StoryLength,
    pub custom_length: u32,

    /// Latest turn; `None` until a story has begun.
    pub current: Option<TurnResponse>,
    pub pending: bool,
    pub error: Option<String>,
    pub status: Option<String>,

    pub should_scroll_top: bool,
}

impl UiState {
    fn new(length: StoryLength) -> Self {
        Self {
            prompt_input: String::new(),
            length,
            custom_length: length.max_segments(),
            current: None,
            pending: false,
            error: None,
            status: None,
            should_scroll_top: false,
        }
    }
}

/* =========================
   App
   ========================= */

pub struct StoryApp {
    pub(crate) ui: UiState,
    pub(crate) settings: AppSettings,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl StoryApp {
    pub fn new(settings: AppSettings, credentials: Credentials) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let engine_settings = settings.clone();
        std::thread::spawn(move || {
            match Engine::new(cmd_rx, resp_tx.clone(), engine_settings, credentials) {
                Ok(mut engine) => engine.run(),
                Err(e) => {
                    tracing::error!(error = %e, "engine failed to start");
                    let _ = resp_tx.send(EngineResponse::Failed(e.to_string()));
                }
            }
        });

        Self {
            ui: UiState::new(settings.default_length),
            settings,
            cmd_tx,
            resp_rx,
        }
    }

    /// Commands that start a turn mark the UI busy until the engine answers.
    pub(crate) fn send_command(&mut self, cmd: EngineCommand) {
        let starts_turn = matches!(
            cmd,
            EngineCommand::BeginStory { .. }
                | EngineCommand::AdvanceStory(_)
                | EngineCommand::ConcludeStory
        );

        if self.cmd_tx.send(cmd).is_err() {
            self.ui.error = Some("The story engine has stopped.".into());
            return;
        }
        if starts_turn {
            self.ui.pending = true;
            self.ui.error = None;
        }
    }

    fn drain_responses(&mut self) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            match resp {
                EngineResponse::Turn(turn) => {
                    self.ui.current = Some(turn);
                    self.ui.pending = false;
                    self.ui.should_scroll_top = true;
                }
                EngineResponse::TurnFailed(message) => {
                    self.ui.pending = false;
                    self.ui.error = Some(format!(
                        "Could not generate the next part of the story, try again.\n{message}"
                    ));
                }
                EngineResponse::Failed(message) => {
                    self.ui.pending = false;
                    self.ui.error = Some(message);
                }
                EngineResponse::Reset { .. } => {
                    self.ui.current = None;
                    self.ui.error = None;
                }
                EngineResponse::Saved(path) => {
                    self.ui.status = Some(format!("Saved to {}", path.display()));
                }
                EngineResponse::ConnectionStatus(status) => {
                    self.ui.status = Some(status);
                }
            }
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for StoryApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);

        self.drain_responses();

        draw_left_panel(ctx, self);
        draw_center_panel(ctx, self);

        if self.ui.pending {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
