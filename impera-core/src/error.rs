use thiserror::Error;

/// All errors produced by impera-core.
#[derive(Debug, Error)]
pub enum ImperaError {
    #[error("no audio capture source configured")]
    CaptureUnavailable,

    #[error("capture source error: {0}")]
    CaptureSource(String),

    #[error("capture is already active")]
    AlreadyRecording,

    #[error("capture is not active")]
    NotRecording,

    #[error("a transcription is still outstanding")]
    StillProcessing,

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("too many selection targets: {count} (limit {limit})")]
    TooManySelectionTargets { count: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ImperaError>;
