use serde::{Deserialize, Serialize};

/// One generated installment of the story, together with the prompt or
/// choice that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySegment {
    pub text: String,
    pub prompt: String,
    pub image: Option<String>,
}

impl StorySegment {
    pub fn new(text: impl Into<String>, prompt: impl Into<String>, image: Option<String>) -> Self {
        Self {
            text: text.into(),
            prompt: prompt.into(),
            image,
        }
    }
}

/// Segments in narrative order. Only ever appended to, or cleared on reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryHistory {
    segments: Vec<StorySegment>,
}

impl StoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: StorySegment) {
        self.segments.push(segment);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&StorySegment> {
        self.segments.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StorySegment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[StorySegment] {
        &self.segments
    }
}

impl<'a> IntoIterator for &'a StoryHistory {
    type Item = &'a StorySegment;
    type IntoIter = std::slice::Iter<'a, StorySegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
