use std::path::PathBuf;

use crate::model::progress::{StoryLength, StoryProgress, TurnResponse};
use crate::settings::AppSettings;

pub enum EngineCommand {
    BeginStory { prompt: String, length: StoryLength },
    AdvanceStory(String),
    ConcludeStory,
    Reset { length: Option<StoryLength> },
    SaveStory(PathBuf),
    ApplySettings(AppSettings),
    TestConnection,
}

pub enum EngineResponse {
    Turn(TurnResponse),

    /// A story turn failed; the session is unchanged.
    TurnFailed(String),

    /// Any other command failed.
    Failed(String),

    Reset { progress: StoryProgress },
    Saved(PathBuf),
    ConnectionStatus(String),
}
