//! Story progression: the per-turn state machine.
//!
//! The caller owns a [`StorySession`] and hands it to a [`StoryTeller`] for
//! each transition. State is only written after the generator has answered
//! and the reply has been normalized, so a failed turn leaves the session
//! exactly as it was.

use std::fmt;

use thiserror::Error;
use tracing::instrument;

use crate::engine::illustration::IllustrationLookup;
use crate::engine::llm_client::{GenerationError, TextGenerator};
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::response_normalizer::normalize;
use crate::model::generated_turn::GeneratedTurn;
use crate::model::progress::{StoryLength, StoryProgress, TurnResponse};
use crate::model::story_export::render_story;
use crate::model::story_segment::{StoryHistory, StorySegment};

/// Offered after every continuing turn.
pub const CONCLUDE_CHOICE: &str = "Conclude this story";

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Could not generate the next part of the story: {0}")]
    GenerationUnavailable(#[from] GenerationError),

    #[error("Cannot {operation} while the story is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Prompt is required")]
    EmptyPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    /// In progress, but the next choice will be answered with a conclusion.
    Concluding,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::NotStarted => "not started",
            Phase::InProgress => "in progress",
            Phase::Concluding => "concluding",
            Phase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// True when the choice text asks for the story to end.
pub fn is_conclusion_request(choice: &str) -> bool {
    let choice = choice.to_lowercase();
    choice.contains("conclude") || choice.contains("end the story")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionState {
    pub segments_count: u32,
    pub length_budget: u32,
    pub is_ending: bool,
    pub current_choices: Vec<String>,
    pub current_segment: Option<StorySegment>,
}

impl ProgressionState {
    pub fn new(length_budget: u32) -> Self {
        Self {
            segments_count: 0,
            length_budget: length_budget.max(1),
            is_ending: false,
            current_choices: Vec::new(),
            current_segment: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_ending {
            Phase::Ended
        } else if self.segments_count == 0 {
            Phase::NotStarted
        } else if self.is_approaching_end() {
            Phase::Concluding
        } else {
            Phase::InProgress
        }
    }

    pub fn progress(&self) -> StoryProgress {
        StoryProgress {
            current: self.segments_count,
            max: self.length_budget,
            is_ending: self.is_ending,
        }
    }

    fn is_approaching_end(&self) -> bool {
        self.segments_count + 1 >= self.length_budget
    }

    /// Whether answering `choice` must produce a conclusion.
    pub fn must_conclude(&self, choice: &str) -> bool {
        is_conclusion_request(choice) || self.is_approaching_end()
    }

    /// State after the opening segment.
    pub fn after_start(&self, segment: StorySegment, turn: GeneratedTurn) -> Self {
        let segments_count = 1;
        let is_ending = segments_count >= self.length_budget;

        Self {
            segments_count,
            length_budget: self.length_budget,
            is_ending,
            current_choices: if is_ending { Vec::new() } else { turn.choices },
            current_segment: Some(segment),
        }
    }

    /// State after answering a choice; `concluded` is what
    /// [`must_conclude`](Self::must_conclude) said before the request.
    pub fn after_choice(&self, segment: StorySegment, turn: GeneratedTurn, concluded: bool) -> Self {
        let segments_count = self.segments_count + 1;
        let is_ending = concluded || segments_count >= self.length_budget;

        let current_choices = if is_ending {
            Vec::new()
        } else {
            let mut choices = turn.choices;
            choices.push(CONCLUDE_CHOICE.to_string());
            choices
        };

        Self {
            segments_count,
            length_budget: self.length_budget,
            is_ending,
            current_choices,
            current_segment: Some(segment),
        }
    }
}

/// Caller-owned narrative state: progression plus history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySession {
    state: ProgressionState,
    history: StoryHistory,
}

impl StorySession {
    pub fn new(length_budget: u32) -> Self {
        Self {
            state: ProgressionState::new(length_budget),
            history: StoryHistory::new(),
        }
    }

    pub fn with_length(length: StoryLength) -> Self {
        Self::new(length.max_segments())
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn history(&self) -> &StoryHistory {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn progress(&self) -> StoryProgress {
        self.state.progress()
    }

    pub fn current_choices(&self) -> &[String] {
        &self.state.current_choices
    }

    pub fn export(&self) -> String {
        render_story(&self.history)
    }

    /// Back to NotStarted. The budget is kept unless a new one is given.
    pub fn reset(&mut self, length_budget: Option<u32>) {
        let budget = length_budget.unwrap_or(self.state.length_budget);
        self.state = ProgressionState::new(budget);
        self.history.clear();
    }

    fn commit(&mut self, segment: StorySegment, state: ProgressionState) -> TurnResponse {
        let response = TurnResponse::new(&segment, state.current_choices.clone(), state.progress());
        self.history.push(segment);
        self.state = state;
        response
    }
}

/// Drives sessions through the prompt builder, generator, normalizer and
/// illustration lookup.
pub struct StoryTeller<G, I> {
    generator: G,
    illustrator: I,
}

impl<G: TextGenerator, I: IllustrationLookup> StoryTeller<G, I> {
    pub fn new(generator: G, illustrator: I) -> Self {
        Self {
            generator,
            illustrator,
        }
    }

    /// Opening turn. Fails without touching the session if the generator
    /// is unavailable.
    #[instrument(skip(self, session, prompt))]
    pub fn begin_story(
        &self,
        session: &mut StorySession,
        prompt: &str,
        length_budget: u32,
    ) -> Result<TurnResponse, StoryError> {
        let phase = session.phase();
        if phase != Phase::NotStarted {
            return Err(StoryError::InvalidTransition {
                operation: "start a story",
                phase,
            });
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StoryError::EmptyPrompt);
        }

        let (segment, turn) = self.generate_segment(prompt, &[], false)?;

        // Budget is applied only once the turn succeeded.
        let state = ProgressionState::new(length_budget).after_start(segment.clone(), turn);
        tracing::info!(segments = state.segments_count, ended = state.is_ending, "story started");
        Ok(session.commit(segment, state))
    }

    #[instrument(skip(self, session))]
    pub fn advance_story(
        &self,
        session: &mut StorySession,
        choice: &str,
    ) -> Result<TurnResponse, StoryError> {
        let phase = session.phase();
        if !matches!(phase, Phase::InProgress | Phase::Concluding) {
            return Err(StoryError::InvalidTransition {
                operation: "choose",
                phase,
            });
        }

        let conclude = session.state.must_conclude(choice);
        let (segment, turn) = self.generate_segment(choice, session.history.as_slice(), conclude)?;

        let state = session.state.after_choice(segment.clone(), turn, conclude);
        tracing::info!(
            segments = state.segments_count,
            budget = state.length_budget,
            ended = state.is_ending,
            "story advanced"
        );
        Ok(session.commit(segment, state))
    }

    /// Ask for the ending now, regardless of the remaining budget.
    pub fn conclude_story(&self, session: &mut StorySession) -> Result<TurnResponse, StoryError> {
        self.advance_story(session, CONCLUDE_CHOICE)
    }

    fn generate_segment(
        &self,
        prompt: &str,
        history: &[StorySegment],
        conclude: bool,
    ) -> Result<(StorySegment, GeneratedTurn), StoryError> {
        let instruction = PromptBuilder::build(prompt, history, conclude);

        let raw = self.generator.generate(&instruction).map_err(|e| {
            tracing::error!(error = %e, "text generation failed");
            StoryError::from(e)
        })?;

        let turn = normalize(&raw, conclude);
        let image = self.illustrator.illustrate(&turn.story);
        let segment = StorySegment::new(turn.story.clone(), prompt, image);

        Ok((segment, turn))
    }
}
