pub mod settings_io;

use serde::{Deserialize, Serialize};

use crate::model::progress::StoryLength;

pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";
pub const UNSPLASH_KEY_VAR: &str = "UNSPLASH_ACCESS_KEY";

/// Which text generator drives the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Gemini,
    OpenAiCompatible,
    Demo,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Gemini, Backend::OpenAiCompatible, Backend::Demo];

    pub fn label(self) -> &'static str {
        match self {
            Backend::Gemini => "Gemini",
            Backend::OpenAiCompatible => "Local (OpenAI compatible)",
            Backend::Demo => "Demo (offline)",
        }
    }
}

/// Persisted application settings. Credentials never land here; they
/// are read from the environment into [`Credentials`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub backend: Backend,
    pub gemini_model: String,
    pub openai_endpoint: String,
    pub openai_model: String,
    pub temperature: f32,
    pub default_length: StoryLength,
    pub ui_scale: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gemini_model: "gemini-1.5-flash".into(),
            openai_endpoint: "http://localhost:1234/v1".into(),
            openai_model: "local-model".into(),
            temperature: 0.7,
            default_length: StoryLength::default(),
            ui_scale: 1.0,
        }
    }
}

#[derive(Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: non_empty_var(GEMINI_KEY_VAR),
            unsplash_access_key: non_empty_var(UNSPLASH_KEY_VAR),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<set>"))
            .field(
                "unsplash_access_key",
                &self.unsplash_access_key.as_ref().map(|_| "<set>"),
            )
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
