pub mod app;
pub mod center_panel;
pub mod left_panel;
