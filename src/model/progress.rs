use serde::{Deserialize, Serialize};

use crate::model::story_segment::StorySegment;

/// How many segments a story may run before it is forced to conclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
    Custom(u32),
}

impl StoryLength {
    pub const PRESETS: [StoryLength; 3] = [StoryLength::Short, StoryLength::Medium, StoryLength::Long];

    pub fn max_segments(self) -> u32 {
        match self {
            StoryLength::Short => 3,
            StoryLength::Medium => 7,
            StoryLength::Long => 12,
            StoryLength::Custom(n) => n.max(1),
        }
    }

    pub fn label(self) -> String {
        match self {
            StoryLength::Short => "Short (3 scenes)".into(),
            StoryLength::Medium => "Medium (7 scenes)".into(),
            StoryLength::Long => "Long (12 scenes)".into(),
            StoryLength::Custom(_) => format!("Custom ({} scenes)", self.max_segments()),
        }
    }
}

/// Progress figures shown next to the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryProgress {
    pub current: u32,
    pub max: u32,
    pub is_ending: bool,
}

impl StoryProgress {
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        (self.current as f32 / self.max as f32).min(1.0)
    }
}

/// What the session hands back to its caller after each turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub story: String,
    pub choices: Vec<String>,
    pub image: Option<String>,
    pub progress: StoryProgress,
}

impl TurnResponse {
    pub fn new(segment: &StorySegment, choices: Vec<String>, progress: StoryProgress) -> Self {
        Self {
            story: segment.text.clone(),
            choices,
            image: segment.image.clone(),
            progress,
        }
    }
}
