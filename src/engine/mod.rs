pub mod engine;
pub mod protocol;

pub mod illustration;
pub mod llm_client;
pub mod progression;
pub mod prompt_builder;
pub mod response_normalizer;
