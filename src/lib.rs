pub mod engine;
pub mod logging;
pub mod model;
pub mod settings;
pub mod ui;
