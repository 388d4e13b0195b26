use std::sync::mpsc;
use std::time::Duration;

use branching_tales::engine::engine::Engine;
use branching_tales::engine::progression::CONCLUDE_CHOICE;
use branching_tales::engine::protocol::{EngineCommand, EngineResponse};
use branching_tales::model::progress::StoryLength;
use branching_tales::settings::{AppSettings, Backend, Credentials};

struct Worker {
    tx: mpsc::Sender<EngineCommand>,
    rx: mpsc::Receiver<EngineResponse>,
}

impl Worker {
    fn demo() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let settings = AppSettings {
            backend: Backend::Demo,
            ..AppSettings::default()
        };

        std::thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, settings, Credentials::default())
                .expect("demo engine starts");
            engine.run();
        });

        Self {
            tx: cmd_tx,
            rx: resp_rx,
        }
    }

    fn ask(&self, cmd: EngineCommand) -> EngineResponse {
        self.tx.send(cmd).expect("engine alive");
        self.rx
            .recv_timeout(Duration::from_secs(10))
            .expect("engine answered")
    }
}

#[test]
fn demo_story_runs_to_the_end() {
    let worker = Worker::demo();

    let EngineResponse::Turn(first) = worker.ask(EngineCommand::BeginStory {
        prompt: "A lighthouse keeper".into(),
        length: StoryLength::Short,
    }) else {
        panic!("expected a turn");
    };
    assert_eq!(first.choices.len(), 3);
    assert_eq!(first.progress.max, 3);
    assert!(first.image.is_some());

    let EngineResponse::Turn(second) = worker.ask(EngineCommand::AdvanceStory(first.choices[0].clone()))
    else {
        panic!("expected a turn");
    };
    assert_eq!(second.choices.last().map(String::as_str), Some(CONCLUDE_CHOICE));

    let EngineResponse::Turn(last) = worker.ask(EngineCommand::AdvanceStory(second.choices[1].clone()))
    else {
        panic!("expected a turn");
    };
    assert!(last.choices.is_empty());
    assert!(last.progress.is_ending);
    assert_eq!(last.progress.current, 3);

    assert!(matches!(
        worker.ask(EngineCommand::AdvanceStory("Anything".into())),
        EngineResponse::TurnFailed(_)
    ));
}

#[test]
fn reset_and_save() {
    let worker = Worker::demo();

    assert!(matches!(
        worker.ask(EngineCommand::BeginStory {
            prompt: "A dragon".into(),
            length: StoryLength::Medium,
        }),
        EngineResponse::Turn(_)
    ));

    let path = std::env::temp_dir().join(format!("branching_tales_save_{}.txt", std::process::id()));
    let EngineResponse::Saved(saved) = worker.ask(EngineCommand::SaveStory(path.clone())) else {
        panic!("expected saved");
    };
    assert_eq!(saved, path);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Prompt: A dragon\n\n"));
    assert!(text.ends_with("\n\n---\n\n"));
    let _ = std::fs::remove_file(&path);

    let EngineResponse::Reset { progress } = worker.ask(EngineCommand::Reset { length: None }) else {
        panic!("expected reset");
    };
    assert_eq!(progress.current, 0);
    assert_eq!(progress.max, 7);

    assert!(matches!(
        worker.ask(EngineCommand::ConcludeStory),
        EngineResponse::TurnFailed(_)
    ));
}

#[test]
fn save_failure_is_not_a_turn_failure() {
    let worker = Worker::demo();
    let path = std::env::temp_dir()
        .join(format!("branching_tales_missing_{}", std::process::id()))
        .join("story.txt");

    let EngineResponse::Failed(message) = worker.ask(EngineCommand::SaveStory(path)) else {
        panic!("expected a plain failure");
    };
    assert!(message.contains("writing story to"));
    assert!(!message.contains("next part of the story"));
}

#[test]
fn missing_gemini_key_fails_the_turn() {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut engine = Engine::new(cmd_rx, resp_tx, AppSettings::default(), Credentials::default())
            .expect("engine starts");
        engine.run();
    });

    cmd_tx
        .send(EngineCommand::BeginStory {
            prompt: "A dragon".into(),
            length: StoryLength::Short,
        })
        .unwrap();

    let EngineResponse::TurnFailed(message) = resp_rx.recv_timeout(Duration::from_secs(10)).unwrap() else {
        panic!("expected failure");
    };
    assert!(message.contains("GEMINI_API_KEY"));
}
