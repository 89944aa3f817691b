use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::{
    api::Fetch,
    application::audio_downloader::{download, AudioDownloader, CancelFlag},
    audio::normalizer::{move_file, normalize},
    domain::{
        AppError, DownloadPhase, DownloadRequest, JobCompletion, JobId, MaterializedFile,
        PublishedFile,
    },
    ui::drag_bar::DragSource,
    utils::{extension_from_url, release_placeholder, sanitize_filename, uniquify},
};

const WORKER_NAME: &str = "radio-downloader";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub downloads_dir: PathBuf,
    pub fallback_name: String,
    pub shutdown_timeout: Duration,
}

/// What applying a completion did to the published state.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Completion of a superseded job; nothing changed.
    Stale,
    Published(PublishedFile),
    Failed(AppError),
}

/// Completion of a started job, to be awaited off the UI context and fed
/// back through [`DownloadOrchestrator::complete`].
pub struct PendingJob {
    pub job: JobId,
    receiver: oneshot::Receiver<JobCompletion>,
}

impl PendingJob {
    pub async fn wait(self) -> JobCompletion {
        let job = self.job;
        self.receiver
            .await
            .unwrap_or_else(|_| JobCompletion::lost(job))
    }
}

#[derive(Debug, Clone)]
struct Transfer {
    url: String,
    staging: PathBuf,
    destination: PathBuf,
    request: DownloadRequest,
    display_name: String,
    source_extension: String,
}

/// Owns the single in-flight job and the drag source it publishes into.
/// Lives on the UI context; only the worker it spawns runs elsewhere.
pub struct DownloadOrchestrator {
    settings: OrchestratorSettings,
    fetcher: Arc<dyn Fetch>,
    active: Option<AudioDownloader>,
    current: Option<JobId>,
    last_job: u64,
    phase: DownloadPhase,
    drag_source: DragSource,
}

impl DownloadOrchestrator {
    pub fn new(settings: OrchestratorSettings, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            settings,
            fetcher,
            active: None,
            current: None,
            last_job: 0,
            phase: DownloadPhase::Idle,
            drag_source: DragSource::default(),
        }
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.current
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.settings.downloads_dir
    }

    pub fn set_downloads_dir(&mut self, dir: PathBuf) {
        self.settings.downloads_dir = dir;
    }

    pub fn drag_source(&self) -> &DragSource {
        &self.drag_source
    }

    pub fn drag_source_mut(&mut self) -> &mut DragSource {
        &mut self.drag_source
    }

    pub fn request(&mut self, request: DownloadRequest) -> Result<Option<PendingJob>, AppError> {
        self.request_all(vec![request])
    }

    /// Start one job for every request with a URL, superseding the active job.
    /// All files are written to disk in order; only the last one is published.
    pub fn request_all(
        &mut self,
        requests: Vec<DownloadRequest>,
    ) -> Result<Option<PendingJob>, AppError> {
        let requests: Vec<DownloadRequest> = requests
            .into_iter()
            .filter(|r| !r.source_url.is_empty())
            .collect();
        if requests.is_empty() {
            return Ok(None);
        }

        self.retire_active();

        self.last_job += 1;
        let job = JobId(self.last_job);
        let transfers = self.plan(job, requests)?;

        for transfer in &transfers {
            log::info!(
                "{}: downloading {} -> {}",
                job,
                transfer.url,
                transfer.destination.display()
            );
        }

        let reserved: Vec<PathBuf> = transfers.iter().map(|t| t.destination.clone()).collect();
        let fetcher = self.fetcher.clone();
        let (worker, receiver) = AudioDownloader::spawn(
            WORKER_NAME,
            self.settings.shutdown_timeout,
            move |cancel| run_job(fetcher.as_ref(), job, transfers, cancel),
        )
        .inspect_err(|_| reserved.iter().for_each(|path| release_placeholder(path)))?;

        self.active = Some(worker);
        self.current = Some(job);
        self.phase = DownloadPhase::Downloading;

        Ok(Some(PendingJob { job, receiver }))
    }

    /// Apply a completion on the UI context. Anything but the current job is ignored.
    pub fn complete(&mut self, completion: JobCompletion) -> Transition {
        if self.current != Some(completion.job) {
            log::debug!("Ignoring completion of superseded {}", completion.job);
            return Transition::Stale;
        }

        self.current = None;
        self.active = None;

        match completion.outcome {
            Ok(file) => {
                log::info!(
                    "{}: ready {}{} ({} file(s) saved)",
                    completion.job,
                    file.path.display(),
                    if file.transcoded { " (transcoded)" } else { "" },
                    completion.saved.len()
                );
                self.drag_source.set_file(&file.display_name, &file.path);
                self.phase = DownloadPhase::Published;
                Transition::Published(self.drag_source.published().clone())
            }
            Err(e) => {
                log::warn!("{}: download failed: {}", completion.job, e);
                self.drag_source.clear_file();
                self.phase = DownloadPhase::Failed;
                Transition::Failed(e)
            }
        }
    }

    /// Signal the active worker and wait (bounded) for it to exit.
    fn retire_active(&mut self) {
        if let Some(worker) = self.active.take() {
            if let Some(job) = self.current.take() {
                log::info!("{}: superseded by a new request", job);
            }
            worker.cancel();
            drop(worker);
        }
    }

    /// Reserve a destination for every request. Names are claimed on disk, so
    /// clashes within the batch and with earlier jobs get a counter.
    fn plan(
        &self,
        job: JobId,
        requests: Vec<DownloadRequest>,
    ) -> Result<Vec<Transfer>, AppError> {
        let dir = &self.settings.downloads_dir;
        std::fs::create_dir_all(dir)?;

        let mut transfers: Vec<Transfer> = Vec::with_capacity(requests.len());
        for (index, request) in requests.into_iter().enumerate() {
            let base = sanitize_filename(&request.display_title, &self.settings.fallback_name);
            let source_extension = extension_from_url(&request.source_url);
            let extension = request
                .requested_format
                .extension()
                .map(str::to_string)
                .unwrap_or_else(|| source_extension.clone());

            let destination = match uniquify(dir, &base, &extension) {
                Ok(path) => path,
                Err(e) => {
                    for transfer in &transfers {
                        release_placeholder(&transfer.destination);
                    }
                    return Err(e.into());
                }
            };

            transfers.push(Transfer {
                url: request.source_url.clone(),
                staging: dir.join(format!(".{}-{}.part", job.0, index)),
                destination,
                request,
                display_name: base,
                source_extension,
            });
        }
        Ok(transfers)
    }
}

/// Worker side of a job. Touches only the filesystem.
fn run_job(
    fetcher: &dyn Fetch,
    job: JobId,
    transfers: Vec<Transfer>,
    cancel: &CancelFlag,
) -> JobCompletion {
    let mut saved = Vec::new();
    let mut outcome = Err(AppError::Cancelled);

    for (index, transfer) in transfers.iter().enumerate() {
        if cancel.is_cancelled() {
            outcome = Err(AppError::Cancelled);
            for skipped in &transfers[index..] {
                release_placeholder(&skipped.destination);
            }
            break;
        }
        outcome = run_transfer(fetcher, transfer, cancel);
        match &outcome {
            Ok(file) => saved.push(file.clone()),
            Err(e) => log::warn!("{}: {} failed: {}", job, transfer.url, e),
        }
    }

    JobCompletion {
        job,
        outcome,
        saved,
    }
}

/// Drop the staging bytes and give back the reserved name.
fn discard(transfer: &Transfer) {
    let _ = std::fs::remove_file(&transfer.staging);
    release_placeholder(&transfer.destination);
}

fn run_transfer(
    fetcher: &dyn Fetch,
    transfer: &Transfer,
    cancel: &CancelFlag,
) -> Result<MaterializedFile, AppError> {
    if let Err(e) = download(fetcher, &transfer.url, &transfer.staging, cancel) {
        discard(transfer);
        return Err(e);
    }
    if cancel.is_cancelled() {
        discard(transfer);
        return Err(AppError::Cancelled);
    }

    match normalize(
        &transfer.staging,
        &transfer.destination,
        transfer.request.requested_format,
        Some(&transfer.source_extension),
        cancel,
    ) {
        Ok(normalized) => Ok(MaterializedFile {
            display_name: transfer.display_name.clone(),
            path: normalized.path,
            transcoded: normalized.transcoded,
        }),
        Err(e @ (AppError::Cancelled | AppError::DestinationTaken(_))) => {
            discard(transfer);
            Err(e)
        }
        Err(e) => {
            log::warn!(
                "Could not normalize {} ({}), keeping the original bytes",
                transfer.url,
                e
            );
            move_file(&transfer.staging, &transfer.destination)
                .inspect_err(|_| discard(transfer))?;
            Ok(MaterializedFile {
                display_name: transfer.display_name.clone(),
                path: transfer.destination.clone(),
                transcoded: false,
            })
        }
    }
}
