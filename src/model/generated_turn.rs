use serde::{Deserialize, Serialize};

/// Canonical shape of one model turn after normalization.
///
/// `story` is never empty. `choices` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTurn {
    pub story: String,
    pub choices: Vec<String>,
}

impl GeneratedTurn {
    pub fn new(story: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            story: story.into(),
            choices,
        }
    }
}
