use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::prompt_builder::CONCLUSION_HEADER;
use crate::settings::{AppSettings, Backend, Credentials, GEMINI_KEY_VAR};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Why the text generator could not produce anything.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0} is not set")]
    MissingCredentials(&'static str),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,
}

/// The single place the text-generation model is touched.
/// Returns raw, unparsed text.
pub trait TextGenerator {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        (**self).generate(instruction)
    }
}

pub fn build_generator(
    settings: &AppSettings,
    credentials: &Credentials,
) -> Result<Box<dyn TextGenerator + Send>, GenerationError> {
    let generator: Box<dyn TextGenerator + Send> = match settings.backend {
        Backend::Gemini => Box::new(GeminiClient::new(
            credentials.gemini_api_key.clone(),
            settings.gemini_model.clone(),
            settings.temperature,
        )?),
        Backend::OpenAiCompatible => Box::new(OpenAiCompatibleClient::new(
            settings.openai_endpoint.clone(),
            settings.openai_model.clone(),
            settings.temperature,
        )?),
        Backend::Demo => Box::new(DemoGenerator),
    };
    Ok(generator)
}

fn http_client() -> Result<Client, GenerationError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GenerationError::Transport(e.to_string()))
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/* =========================
   Gemini
   ========================= */

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Google Generative Language `generateContent` over blocking HTTP.
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model: model.into(),
            temperature,
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        // Missing key fails the turn, not construction.
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredentials(GEMINI_KEY_VAR))?;

        let req = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(instruction.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let resp = self
            .client
            .post(format!("{GEMINI_API_BASE}/models/{}:generateContent", self.model))
            .header("x-goog-api-key", api_key)
            .json(&req)
            .send()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let body: GenerateContentResponse = resp
            .json()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        non_empty(text)
    }
}

/* =========================
   OpenAI-compatible (LM Studio etc.)
   ========================= */

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompatibleClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
        })
    }

    pub fn test_connection(&self) -> Result<String, GenerationError> {
        let resp: serde_json::Value = self
            .client
            .get(format!("{}/models", self.endpoint))
            .send()
            .and_then(|r| r.json())
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(format!(
            "Connected ({} models available)",
            resp["data"].as_array().map(|a| a.len()).unwrap_or(0)
        ))
    }
}

impl TextGenerator for OpenAiCompatibleClient {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: instruction.to_string(),
            }],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&req)
            .send()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let body: ChatCompletionResponse = resp
            .json()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        non_empty(text)
    }
}

/* =========================
   Demo
   ========================= */

const DEMO_SCENES: [(&str, [&str; 3]); 3] = [
    (
        "The world around you shifts and changes. The air feels different, charged with an energy you've never felt before. You find yourself standing at the edge of a great precipice, the winds howling around you carrying whispers of forgotten lands.\n\nIn the distance, you can see a shimmering city of impossible architecture - towers that twist and curve defying gravity, bridges of light connecting floating islands. This must be what the legends spoke of.",
        [
            "Approach the shimmering city cautiously",
            "Look for a way down the precipice",
            "Call out to see if anyone is nearby",
        ],
    ),
    (
        "A bright flash of light momentarily blinds you, and when your vision clears, you realize you're no longer where you were. The landscape stretches before you, a tapestry of colors you've never seen before, under a sky with three moons.\n\nA figure approaches from the distance, tall and elegant, with features that seem almost human but not quite. \"We've been expecting you,\" they say with a voice that sounds like wind chimes.",
        [
            "Ask the figure who they are and where you are",
            "Look for a way to return home",
            "Express curiosity about this new world",
        ],
    ),
    (
        "The ordinary world fades away, replaced by something extraordinary. Ancient trees tower around you, their bark glowing with soft blue light, illuminating a path forward.\n\nStrange creatures watch from the shadows, their eyes reflecting the ethereal light. One steps forward - small, perhaps reaching your knee, with skin like polished stone. \"Follow me,\" it says, \"the Council awaits.\"",
        [
            "Follow the small creature to the Council",
            "Ask what the Council wants with you",
            "Look for a different path through the glowing forest",
        ],
    ),
];

const DEMO_CONCLUSION: &str = "The last of the light settles over the path behind you. Every choice you made has left its mark, and the places you passed through will remember your footsteps.\n\nYou turn for home, carrying the story with you. It ends here, but it will be told again.";

/// Offline generator answering with canned scenes, for trying the app
/// without a model.
pub struct DemoGenerator;

impl TextGenerator for DemoGenerator {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        let value = if instruction.contains(CONCLUSION_HEADER) {
            serde_json::json!({ "story": DEMO_CONCLUSION })
        } else {
            let (story, choices) = DEMO_SCENES
                .choose(&mut rand::thread_rng())
                .ok_or(GenerationError::EmptyResponse)?;
            serde_json::json!({ "story": story, "choices": choices })
        };
        Ok(value.to_string())
    }
}
