use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use branching_tales::engine::illustration::{IllustrationLookup, NoIllustration};
use branching_tales::engine::llm_client::{GenerationError, TextGenerator};
use branching_tales::engine::progression::{
    Phase, StoryError, StorySession, StoryTeller, CONCLUDE_CHOICE,
};
use branching_tales::engine::prompt_builder::CONCLUSION_HEADER;
use branching_tales::engine::response_normalizer::{FALLBACK_CHOICES, FALLBACK_STORY};

const TURN: &str = r#"{"story":"The road forks.","choices":["Left","Right","Back"]}"#;
const ENDING: &str = r#"{"story":"And so it ended."}"#;

/// Replays canned replies and records every instruction it was sent.
#[derive(Default)]
struct ScriptedGenerator {
    replies: RefCell<VecDeque<Result<String, GenerationError>>>,
    instructions: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    fn with(replies: Vec<Result<&str, GenerationError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            instructions: RefCell::new(Vec::new()),
        }
    }

    fn instruction(&self, index: usize) -> String {
        self.instructions.borrow()[index].clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        self.instructions.borrow_mut().push(instruction.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(TURN.to_string()))
    }
}

impl TextGenerator for &ScriptedGenerator {
    fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        (**self).generate(instruction)
    }
}

/// Illustrates only the first segment it sees.
#[derive(Default)]
struct FirstOnly {
    calls: Cell<usize>,
}

impl IllustrationLookup for FirstOnly {
    fn illustrate(&self, _story: &str) -> Option<String> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        (n == 0).then(|| "https://img.example/first.jpg".to_string())
    }
}

fn unavailable() -> GenerationError {
    GenerationError::Transport("connection refused".into())
}

#[test]
fn short_story_ends_after_two_ordinary_choices() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(TURN), Ok(ENDING)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(3);

    let first = teller.begin_story(&mut session, "A dragon", 3).unwrap();
    assert_eq!(first.choices, vec!["Left", "Right", "Back"]);
    assert_eq!(session.phase(), Phase::InProgress);

    let second = teller.advance_story(&mut session, "Left").unwrap();
    assert_eq!(second.choices, vec!["Left", "Right", "Back", CONCLUDE_CHOICE]);
    assert!(!generator.instruction(1).contains(CONCLUSION_HEADER));
    assert_eq!(session.phase(), Phase::Concluding);

    let third = teller.advance_story(&mut session, "Right").unwrap();
    assert!(generator.instruction(2).contains(CONCLUSION_HEADER));
    assert!(third.choices.is_empty());
    assert_eq!(third.story, "And so it ended.");
    assert_eq!(third.progress.current, 3);
    assert!(third.progress.is_ending);
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.history().len(), 3);
}

#[test]
fn conclude_choice_ends_regardless_of_budget() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(ENDING)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(12);

    teller.begin_story(&mut session, "A detective", 12).unwrap();
    let end = teller.advance_story(&mut session, CONCLUDE_CHOICE).unwrap();

    assert!(generator.instruction(1).contains(CONCLUSION_HEADER));
    assert!(end.choices.is_empty());
    assert_eq!(end.progress.current, 2);
    assert_eq!(session.phase(), Phase::Ended);
}

#[test]
fn conclude_story_sends_the_conclude_choice() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(ENDING)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A temple", 7).unwrap();
    teller.conclude_story(&mut session).unwrap();

    assert_eq!(session.history().last().unwrap().prompt, CONCLUDE_CHOICE);
    assert_eq!(session.phase(), Phase::Ended);
}

#[test]
fn no_choices_accepted_after_the_end() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(ENDING)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A temple", 7).unwrap();
    teller.advance_story(&mut session, "end the story").unwrap();

    let err = teller.advance_story(&mut session, "Left").unwrap_err();
    assert!(matches!(
        err,
        StoryError::InvalidTransition { phase: Phase::Ended, .. }
    ));
    assert_eq!(generator.instructions.borrow().len(), 2);
}

#[test]
fn choose_before_start_is_rejected() {
    let generator = ScriptedGenerator::default();
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    let err = teller.advance_story(&mut session, "Left").unwrap_err();
    assert!(matches!(
        err,
        StoryError::InvalidTransition { phase: Phase::NotStarted, .. }
    ));
}

#[test]
fn start_twice_is_rejected() {
    let generator = ScriptedGenerator::default();
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A dragon", 7).unwrap();
    assert!(matches!(
        teller.begin_story(&mut session, "Another", 7),
        Err(StoryError::InvalidTransition { .. })
    ));
}

#[test]
fn empty_prompt_is_rejected_without_a_call() {
    let generator = ScriptedGenerator::default();
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    assert!(matches!(
        teller.begin_story(&mut session, "   ", 7),
        Err(StoryError::EmptyPrompt)
    ));
    assert!(generator.instructions.borrow().is_empty());
}

#[test]
fn failed_start_leaves_session_untouched() {
    let generator = ScriptedGenerator::with(vec![Err(unavailable())]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);
    let before = session.clone();

    let err = teller.begin_story(&mut session, "A dragon", 3).unwrap_err();

    assert!(matches!(err, StoryError::GenerationUnavailable(_)));
    assert_eq!(session, before);
    assert_eq!(session.phase(), Phase::NotStarted);
}

#[test]
fn failed_choice_leaves_session_untouched() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Err(GenerationError::EmptyResponse)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A dragon", 7).unwrap();
    let before = session.clone();

    let err = teller.advance_story(&mut session, "Left").unwrap_err();
    assert!(matches!(err, StoryError::GenerationUnavailable(_)));
    assert_eq!(session, before);

    // Retrying the same choice re-issues the same instruction.
    teller.advance_story(&mut session, "Left").unwrap();
    assert_eq!(generator.instruction(1), generator.instruction(2));
    assert_eq!(session.progress().current, 2);
}

#[test]
fn malformed_reply_falls_back_to_crossroads() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok("Sorry, I can't do JSON today.")]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A dragon", 7).unwrap();
    let turn = teller.advance_story(&mut session, "Left").unwrap();

    assert_eq!(turn.story, FALLBACK_STORY);
    assert_eq!(turn.choices.len(), FALLBACK_CHOICES.len() + 1);
    assert_eq!(turn.choices.last().map(String::as_str), Some(CONCLUDE_CHOICE));
}

#[test]
fn history_is_sent_with_each_choice() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(TURN)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A dragon", 7).unwrap();
    teller.advance_story(&mut session, "Left").unwrap();

    assert!(!generator.instruction(0).contains("Story: The road forks."));
    assert!(generator
        .instruction(1)
        .contains("Prompt: A dragon\nStory: The road forks."));
}

#[test]
fn reset_after_end_starts_fresh() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(ENDING), Ok(TURN), Ok(TURN)]);
    let teller = StoryTeller::new(&generator, NoIllustration);
    let mut session = StorySession::new(7);

    teller.begin_story(&mut session, "A dragon", 7).unwrap();
    teller.conclude_story(&mut session).unwrap();
    assert_eq!(session.phase(), Phase::Ended);

    session.reset(None);
    assert_eq!(session.phase(), Phase::NotStarted);
    assert!(session.history().is_empty());
    assert_eq!(session.progress().max, 7);

    teller.begin_story(&mut session, "A detective", 7).unwrap();
    assert_eq!(session.progress().current, 1);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.phase(), Phase::InProgress);
    assert!(!generator.instruction(2).contains("A dragon"));

    session.reset(Some(1));
    let only = teller.begin_story(&mut session, "A ghost", 1).unwrap();
    assert!(only.choices.is_empty());
    assert!(only.progress.is_ending);
    assert_eq!(session.phase(), Phase::Ended);
}

#[test]
fn export_omits_missing_images() {
    let generator = ScriptedGenerator::with(vec![Ok(TURN), Ok(TURN)]);
    let teller = StoryTeller::new(&generator, FirstOnly::default());
    let mut session = StorySession::new(7);

    let first = teller.begin_story(&mut session, "A dragon", 7).unwrap();
    let second = teller.advance_story(&mut session, "Left").unwrap();
    assert!(first.image.is_some());
    assert!(second.image.is_none());

    let text = session.export();
    assert_eq!(
        text,
        "Prompt: A dragon\n\n[Image: https://img.example/first.jpg]\n\nThe road forks.\n\n---\n\n\
         Prompt: Left\n\nThe road forks.\n\n---\n\n"
    );
}
