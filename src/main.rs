use branching_tales::logging::init_logging;
use branching_tales::settings::settings_io::load_settings;
use branching_tales::settings::Credentials;
use branching_tales::ui::app::StoryApp;

fn main() -> eframe::Result<()> {
    init_logging();

    let settings = load_settings();
    let credentials = Credentials::from_env();
    tracing::info!(backend = ?settings.backend, ?credentials, "starting");

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Branching Tales",
        options,
        Box::new(|_cc| Ok(Box::new(StoryApp::new(settings, credentials)))),
    )
}
