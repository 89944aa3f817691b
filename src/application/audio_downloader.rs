use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::api::Fetch;
use crate::domain::AppError;

pub const CHUNK_SIZE: usize = 8 * 1024;

/// Cooperative cancellation shared between the UI context and one worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Copy `url` into `destination` in fixed-size chunks, checking `cancel`
/// before every read. Partial bytes stay on disk; the caller discards them.
pub fn download(
    fetcher: &dyn Fetch,
    url: &str,
    destination: &Path,
    cancel: &CancelFlag,
) -> Result<u64, AppError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut stream = fetcher.open(url)?;
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let mut output = File::create(destination)?;
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        if cancel.is_cancelled() {
            output.flush()?;
            return Err(AppError::Cancelled);
        }
        let read = match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AppError::Io(format!("Read error: {}", e))),
        };
        output.write_all(&buffer[..read])?;
    }

    output.flush()?;
    output.sync_all()?;
    drop(output);

    let written = std::fs::metadata(destination)?.len();
    if written == 0 {
        return Err(AppError::ZeroByteResult);
    }
    Ok(written)
}

/// Handle to the single background worker of one job.
///
/// Dropping the handle cancels the worker and blocks until it has exited,
/// up to the shutdown timeout.
pub struct AudioDownloader {
    cancel: CancelFlag,
    handle: Option<JoinHandle<()>>,
    exited: mpsc::Receiver<()>,
    shutdown_timeout: Duration,
}

impl AudioDownloader {
    /// Run `work` on a dedicated thread. Its result is sent exactly once
    /// through the returned receiver.
    pub fn spawn<T, F>(
        name: &str,
        shutdown_timeout: Duration,
        work: F,
    ) -> Result<(Self, oneshot::Receiver<T>), AppError>
    where
        T: Send + 'static,
        F: FnOnce(&CancelFlag) -> T + Send + 'static,
    {
        let cancel = CancelFlag::default();
        let (result_tx, result_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = mpsc::channel::<()>();

        let worker_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Dropped last, including on panic, which unblocks `Drop`.
                let _exit = exit_tx;
                let result = work(&worker_cancel);
                let _ = result_tx.send(result);
            })
            .map_err(|e| AppError::Worker(format!("Failed to start worker: {}", e)))?;

        Ok((
            Self {
                cancel,
                handle: Some(handle),
                exited: exit_rx,
                shutdown_timeout,
            },
            result_rx,
        ))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for AudioDownloader {
    fn drop(&mut self) {
        self.cancel.cancel();
        let Some(handle) = self.handle.take() else {
            return;
        };
        match self.exited.recv_timeout(self.shutdown_timeout) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Download worker did not stop within {:?}, detaching it",
                    self.shutdown_timeout
                );
            }
            _ => {
                if handle.join().is_err() {
                    log::error!("Download worker panicked");
                }
            }
        }
    }
}
