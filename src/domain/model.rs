use std::path::PathBuf;

use super::AppError;

/// Output format asked for by the web page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
    /// Keep whatever the server sends, extension taken from the URL.
    Auto,
}

impl OutputFormat {
    pub fn from_bridge(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "wav" => OutputFormat::Wav,
            "mp3" => OutputFormat::Mp3,
            _ => OutputFormat::Auto,
        }
    }

    /// Fixed extension for this format, `None` when it has to come from the URL.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            OutputFormat::Wav => Some(".wav"),
            OutputFormat::Mp3 => Some(".mp3"),
            OutputFormat::Auto => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub display_title: String,
    pub requested_format: OutputFormat,
}

impl DownloadRequest {
    pub fn new(
        source_url: impl Into<String>,
        display_title: impl Into<String>,
        requested_format: OutputFormat,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            display_title: display_title.into(),
            requested_format,
        }
    }
}

/// The file currently offered for dragging into the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedFile {
    pub display_name: String,
    pub file_path: PathBuf,
    pub ready: bool,
}

/// Identity of one orchestrated job. Completions carrying an older id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A downloaded file after it reached its final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    pub display_name: String,
    pub path: PathBuf,
    pub transcoded: bool,
}

/// Result of one job, delivered once to the UI context.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub job: JobId,
    /// Outcome of the last file of the job, the one that gets published.
    pub outcome: Result<MaterializedFile, AppError>,
    /// Every file of the job that landed on disk, published or not.
    pub saved: Vec<MaterializedFile>,
}

impl JobCompletion {
    pub fn lost(job: JobId) -> Self {
        Self {
            job,
            outcome: Err(AppError::Worker("worker exited without reporting".to_string())),
            saved: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Downloading,
    Published,
    Failed,
}
