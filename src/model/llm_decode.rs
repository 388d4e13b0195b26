use serde::Deserialize;

use crate::model::generated_turn::GeneratedTurn;

/// The JSON object the model is instructed to answer with.
#[derive(Debug, Deserialize)]
struct RawTurn {
    story: String,
    #[serde(default)]
    choices: Option<Vec<String>>,
}

/// Decode a JSON document into a turn.
///
/// `choices` may be omitted; only an empty `story` is rejected.
pub fn decode_turn_json(json: &str) -> Result<GeneratedTurn, String> {
    let raw: RawTurn =
        serde_json::from_str(json).map_err(|e| format!("Invalid LLM output: {}", e))?;

    if raw.story.trim().is_empty() {
        return Err("story must be a non-empty string".to_string());
    }

    Ok(GeneratedTurn::new(raw.story, raw.choices.unwrap_or_default()))
}
