mod api;
mod app;
mod application;
mod audio;
mod config;
mod domain;
mod ui;
mod utils;

use iced::Size;

fn main() -> iced::Result {
    // Initialize logger, RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting 444 Radio bridge");

    iced::application(app::PluginApp::default, app::update, app::view)
        .title("444 Radio")
        .window_size(Size::new(480.0, 740.0))
        .run()
}
