pub mod generated_turn;
pub mod llm_decode;
pub mod progress;
pub mod story_export;
pub mod story_segment;
