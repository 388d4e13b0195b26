use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::story_segment::StorySegment;

pub const DEFAULT_EXPORT_FILE_NAME: &str = "my-ai-story.txt";

/// Render the history as plain text, one block per segment.
pub fn render_story<'a>(segments: impl IntoIterator<Item = &'a StorySegment>) -> String {
    let mut out = String::new();

    for segment in segments {
        out.push_str(&format!("Prompt: {}\n\n", segment.prompt));
        if let Some(image) = &segment.image {
            out.push_str(&format!("[Image: {}]\n\n", image));
        }
        out.push_str(&segment.text);
        out.push_str("\n\n---\n\n");
    }

    out
}

pub fn save_story<'a>(
    path: &Path,
    segments: impl IntoIterator<Item = &'a StorySegment>,
) -> Result<()> {
    fs::write(path, render_story(segments))
        .with_context(|| format!("writing story to {}", path.display()))
}
