pub mod error;
pub mod model;
pub mod session;

pub use error::AppError;
pub use model::{
    DownloadPhase, DownloadRequest, JobCompletion, JobId, MaterializedFile, OutputFormat,
    PublishedFile,
};
pub use session::SessionState;
