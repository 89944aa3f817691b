pub mod audio_downloader;
pub mod bridge;
pub mod download_orchestrator;

pub use bridge::{intercept_navigation, BridgeDispatcher, Dispatched, Navigation};
pub use download_orchestrator::{DownloadOrchestrator, OrchestratorSettings, Transition};
