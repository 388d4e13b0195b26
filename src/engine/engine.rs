use std::sync::mpsc::{Receiver, Sender};

use crate::engine::illustration::{build_illustrator, IllustrationLookup};
use crate::engine::llm_client::{
    build_generator, GenerationError, OpenAiCompatibleClient, TextGenerator,
};
use crate::engine::progression::{StoryError, StorySession, StoryTeller};
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::model::progress::TurnResponse;
use crate::model::story_export::save_story;
use crate::settings::{AppSettings, Backend, Credentials, GEMINI_KEY_VAR};

type DynTeller =
    StoryTeller<Box<dyn TextGenerator + Send>, Box<dyn IllustrationLookup + Send>>;

/// Background worker owning the session. Commands are handled one at a
/// time, so at most one turn is ever in flight.
pub struct Engine {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    session: StorySession,
    teller: DynTeller,
    settings: AppSettings,
    credentials: Credentials,
}

impl Engine {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        settings: AppSettings,
        credentials: Credentials,
    ) -> Result<Self, GenerationError> {
        let teller = build_teller(&settings, &credentials)?;
        Ok(Self {
            rx,
            tx,
            session: StorySession::with_length(settings.default_length),
            teller,
            settings,
            credentials,
        })
    }

    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            let response = self.handle(cmd);
            if self.tx.send(response).is_err() {
                break;
            }
        }
        tracing::debug!("engine channel closed");
    }

    fn handle(&mut self, cmd: EngineCommand) -> EngineResponse {
        match cmd {
            EngineCommand::BeginStory { prompt, length } => {
                self.turn_result(|teller, session| {
                    teller.begin_story(session, &prompt, length.max_segments())
                })
            }

            EngineCommand::AdvanceStory(choice) => {
                self.turn_result(|teller, session| teller.advance_story(session, &choice))
            }

            EngineCommand::ConcludeStory => {
                self.turn_result(|teller, session| teller.conclude_story(session))
            }

            EngineCommand::Reset { length } => {
                self.session.reset(length.map(|l| l.max_segments()));
                EngineResponse::Reset {
                    progress: self.session.progress(),
                }
            }

            EngineCommand::SaveStory(path) => match save_story(&path, self.session.history()) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "story saved");
                    EngineResponse::Saved(path)
                }
                Err(e) => EngineResponse::Failed(format!("{e:#}")),
            },

            EngineCommand::ApplySettings(settings) => {
                match build_teller(&settings, &self.credentials) {
                    Ok(teller) => {
                        tracing::info!(backend = ?settings.backend, "settings applied");
                        self.teller = teller;
                        self.settings = settings;
                        EngineResponse::ConnectionStatus(format!(
                            "Using {}",
                            self.settings.backend.label()
                        ))
                    }
                    Err(e) => EngineResponse::Failed(e.to_string()),
                }
            }

            EngineCommand::TestConnection => self.test_connection(),
        }
    }

    fn turn_result<F>(&mut self, turn: F) -> EngineResponse
    where
        F: FnOnce(&DynTeller, &mut StorySession) -> Result<TurnResponse, StoryError>,
    {
        match turn(&self.teller, &mut self.session) {
            Ok(response) => EngineResponse::Turn(response),
            Err(e) => {
                tracing::warn!(error = %e, "turn failed");
                EngineResponse::TurnFailed(e.to_string())
            }
        }
    }

    fn test_connection(&self) -> EngineResponse {
        match self.settings.backend {
            Backend::OpenAiCompatible => {
                let result = OpenAiCompatibleClient::new(
                    self.settings.openai_endpoint.clone(),
                    self.settings.openai_model.clone(),
                    self.settings.temperature,
                )
                .and_then(|client| client.test_connection());

                match result {
                    Ok(status) => EngineResponse::ConnectionStatus(status),
                    Err(e) => EngineResponse::Failed(e.to_string()),
                }
            }
            Backend::Gemini if self.credentials.gemini_api_key.is_none() => {
                EngineResponse::Failed(GenerationError::MissingCredentials(GEMINI_KEY_VAR).to_string())
            }
            backend => EngineResponse::ConnectionStatus(format!("Using {}", backend.label())),
        }
    }
}

fn build_teller(
    settings: &AppSettings,
    credentials: &Credentials,
) -> Result<DynTeller, GenerationError> {
    let generator = build_generator(settings, credentials)?;
    let illustrator = build_illustrator(credentials);
    Ok(StoryTeller::new(generator, illustrator))
}
