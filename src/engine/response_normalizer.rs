use std::sync::LazyLock;

use regex::Regex;

use crate::model::generated_turn::GeneratedTurn;
use crate::model::llm_decode::decode_turn_json;

pub const FALLBACK_CONCLUSION: &str = "As your journey comes to an end, you reflect on all that has transpired. The challenges faced, the choices made, and the growth experienced along the way have all shaped this unique adventure.\n\nThough this story concludes here, the memories and impact remain. Every ending is but a prelude to new beginnings, new adventures waiting to unfold.";

pub const FALLBACK_STORY: &str = "The AI couldn't generate a proper story. Let me create something for you...\n\nYou find yourself standing at a crossroads in a mysterious forest. The trees whisper secrets, and you sense that your choice of path will lead to very different adventures.";

pub const FALLBACK_CHOICES: [&str; 3] = [
    "Take the path glowing with blue light",
    "Follow the winding trail with red leaves",
    "Venture into the misty path straight ahead",
];

static STORY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']story["']\s*:\s*(?:"((?:\\[\s\S]|[^"\\])+)"|'((?:\\[\s\S]|[^'\\])+)')"#)
        .expect("story field pattern is valid")
});

static CHOICES_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']choices["']\s*:\s*\[([\s\S]*?)\]"#).expect("choices field pattern is valid")
});

/// Which step of the chain produced the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    EmbeddedJson,
    WholeJson,
    ConclusionFallback,
    FieldExtraction,
    StaticFallback,
}

/// Turn raw model text into a turn. Never fails.
pub fn normalize(raw: &str, conclude: bool) -> GeneratedTurn {
    normalize_with_strategy(raw, conclude).0
}

/// Like [`normalize`], also reporting which strategy won.
pub fn normalize_with_strategy(raw: &str, conclude: bool) -> (GeneratedTurn, Strategy) {
    if let Some(span) = braced_span(raw) {
        match decode_turn_json(span) {
            Ok(turn) => return (turn, Strategy::EmbeddedJson),
            Err(e) => tracing::debug!(error = %e, "embedded JSON rejected"),
        }
    }

    match decode_turn_json(raw) {
        Ok(turn) => return (turn, Strategy::WholeJson),
        Err(e) => tracing::debug!(error = %e, "whole-text JSON rejected"),
    }

    if conclude {
        tracing::warn!("model reply unusable, using canned conclusion");
        return (
            GeneratedTurn::new(FALLBACK_CONCLUSION, Vec::new()),
            Strategy::ConclusionFallback,
        );
    }

    if let Some(turn) = extract_fields(raw) {
        return (turn, Strategy::FieldExtraction);
    }

    tracing::warn!("model reply unusable, using canned crossroads");
    (
        GeneratedTurn::new(
            FALLBACK_STORY,
            FALLBACK_CHOICES.iter().map(|c| c.to_string()).collect(),
        ),
        Strategy::StaticFallback,
    )
}

/// First `{` through last `}`, inclusive.
fn braced_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn extract_fields(raw: &str) -> Option<GeneratedTurn> {
    let story_caps = STORY_FIELD.captures(raw)?;
    let choices_caps = CHOICES_FIELD.captures(raw)?;

    let story = story_caps.get(1).or_else(|| story_caps.get(2))?.as_str();
    let story = unescape(story);
    if story.trim().is_empty() {
        return None;
    }

    let choices: Vec<String> = choices_caps[1]
        .split(',')
        .map(|c| strip_quotes(c.trim()).to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if choices.is_empty() {
        return None;
    }

    Some(GeneratedTurn::new(story, choices))
}

fn unescape(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\n", "\n")
}

fn strip_quotes(text: &str) -> &str {
    const QUOTES: &[char] = &['"', '\''];
    let text = text.strip_prefix(QUOTES).unwrap_or(text);
    text.strip_suffix(QUOTES).unwrap_or(text)
}
