use std::path::PathBuf;
use std::sync::Arc;

use iced::widget::column;
use iced::Task;

use crate::api::ApiClient;
use crate::application::{
    intercept_navigation, BridgeDispatcher, Dispatched, DownloadOrchestrator, Navigation,
    Transition,
};
use crate::config::PluginConfig;
use crate::domain::{JobCompletion, SessionState};
use crate::ui::drag_bar::DragBarMessage;
use crate::ui::{BridgeConsole, ConsoleMessage};

/// The editor window. Its `update` is the only place shared state changes.
pub struct PluginApp {
    console: BridgeConsole,
    bridge: BridgeDispatcher,
    config: PluginConfig,
    session_path: Option<PathBuf>,
}

impl Default for PluginApp {
    fn default() -> Self {
        Self::new(PluginConfig::load_or_default())
    }
}

impl PluginApp {
    pub fn new(config: PluginConfig) -> Self {
        let settings = config.orchestrator_settings();
        if let Err(e) = std::fs::create_dir_all(&settings.downloads_dir) {
            log::error!(
                "Could not create {}: {}",
                settings.downloads_dir.display(),
                e
            );
        }

        let session_path = PluginConfig::session_path()
            .map_err(|e| log::warn!("Session will not persist: {}", e))
            .ok();
        let session = session_path
            .as_deref()
            .map(SessionState::load)
            .unwrap_or_default();

        let mut console = BridgeConsole {
            downloads_dir: settings.downloads_dir.display().to_string(),
            ..Default::default()
        };
        match session.plugin_page_url(&config.plugin_url) {
            Ok(url) => console.page_url = url.to_string(),
            Err(e) => log::error!("Invalid plugin page URL: {}", e),
        }

        let fetcher = Arc::new(ApiClient::new(config.client_config()));
        let orchestrator = DownloadOrchestrator::new(settings, fetcher);

        Self {
            console,
            bridge: BridgeDispatcher::new(orchestrator, session),
            config,
            session_path,
        }
    }

    fn save_session(&self) {
        if let Some(path) = &self.session_path {
            if let Err(e) = self.bridge.session().save(path) {
                log::error!("Failed to save session: {}", e);
            }
        }
    }

    fn dispatch(&mut self, payload: &str) -> Task<Message> {
        match self.bridge.dispatch(payload) {
            Dispatched::Download(pending) => {
                log::debug!("Waiting for {}", pending.job);
                self.console.status_message = "Downloading...".to_string();
                Task::perform(pending.wait(), Message::JobFinished)
            }
            Dispatched::Authenticated => {
                self.save_session();
                if let Ok(url) = self.bridge.session().plugin_page_url(&self.config.plugin_url) {
                    self.console.page_url = url.to_string();
                }
                self.console.status_message = match &self.bridge.session().credits {
                    Some(credits) => format!("Signed in, {} credits", credits),
                    None => "Signed in".to_string(),
                };
                Task::none()
            }
            Dispatched::Ignored => Task::none(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Console(ConsoleMessage),
    /// Navigation attempted by the embedded page
    Navigate(String),
    /// One-shot hand-off from a download worker
    JobFinished(JobCompletion),
    DragBar(DragBarMessage),
    FolderSelected(Option<PathBuf>),
}

pub fn update(app: &mut PluginApp, message: Message) -> Task<Message> {
    match message {
        Message::Console(console_msg) => {
            app.console.update(console_msg.clone());

            match console_msg {
                ConsoleMessage::SendPressed if !app.console.payload.trim().is_empty() => {
                    let payload = std::mem::take(&mut app.console.payload);
                    return update(app, Message::Navigate(payload.trim().to_string()));
                }
                ConsoleMessage::ChooseFolderPressed => {
                    let current = app.bridge.orchestrator().downloads_dir().to_path_buf();
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&current)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderSelected,
                    );
                }
                _ => {}
            }
        }
        Message::Navigate(url) => match intercept_navigation(&url) {
            Navigation::Bridge(payload) => return app.dispatch(&payload),
            // The console also accepts the bare JSON payload.
            Navigation::Allow if url.starts_with('{') => return app.dispatch(&url),
            Navigation::Allow => {
                log::info!("Page navigated to {}", url);
            }
        },
        Message::JobFinished(completion) => match app.bridge.complete(completion) {
            Transition::Published(file) => {
                app.console.status_message = format!("Ready: {}", file.display_name);
            }
            Transition::Failed(e) => {
                app.console.status_message = format!("Download failed: {}", e);
            }
            Transition::Stale => {
                log::debug!(
                    "Still waiting for {:?} ({:?})",
                    app.bridge.orchestrator().current_job(),
                    app.bridge.orchestrator().phase()
                );
            }
        },
        Message::DragBar(drag_msg) => {
            let drag = app
                .bridge
                .orchestrator_mut()
                .drag_source_mut()
                .update(drag_msg);
            if let Some(drag) = drag {
                // The plugin host performs a native external drag here; the
                // standalone window hands the path over via the clipboard.
                log::info!("Dragging {} (copy: {})", drag.path.display(), drag.copy);
                app.console.status_message = format!("Copied path: {}", drag.path.display());
                return iced::clipboard::write(drag.path.display().to_string());
            }
        }
        Message::FolderSelected(Some(dir)) => {
            log::info!("Downloads folder set to {}", dir.display());
            app.console.downloads_dir = dir.display().to_string();
            app.bridge.orchestrator_mut().set_downloads_dir(dir.clone());
            app.config.downloads_dir = Some(dir);
            if let Err(e) = app.config.save() {
                log::error!("Failed to save configuration: {}", e);
            }
        }
        Message::FolderSelected(None) => {}
    }
    Task::none()
}

pub fn view(app: &PluginApp) -> iced::Element<'_, Message> {
    column![
        app.console.view().map(Message::Console),
        app.bridge
            .orchestrator()
            .drag_source()
            .view()
            .map(Message::DragBar),
    ]
    .into()
}
