use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Could not open stream: {0}")]
    NetworkOpenFailed(String),

    #[error("Connection timed out: {0}")]
    NetworkTimeout(String),

    #[error("Download produced an empty file")]
    ZeroByteResult,

    #[error("Download cancelled")]
    Cancelled,

    #[error("Refusing to overwrite {0}")]
    DestinationTaken(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Unsupported or corrupt audio: {0}")]
    DecodeUnsupported(String),

    #[error("Failed to encode audio: {0}")]
    EncodeFailed(String),

    #[error("Bridge message is not a JSON object")]
    MalformedMessage,

    #[error("Unknown bridge action: {0}")]
    UnknownAction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download worker error: {0}")]
    Worker(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<crate::api::ApiError> for AppError {
    fn from(err: crate::api::ApiError) -> Self {
        match err {
            crate::api::ApiError::Timeout(msg) => AppError::NetworkTimeout(msg),
            other => AppError::NetworkOpenFailed(other.to_string()),
        }
    }
}
