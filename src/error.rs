//! Error types for novel ingestion and translation jobs

use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised while opening and classifying an EPUB container
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("Container is not a readable ZIP archive: {0}")]
    ContainerCorrupt(String),

    #[error("Container holds no files")]
    EmptyContainer,

    #[error("Missing rootfile: {0}")]
    MissingRootfile(String),

    #[error("Invalid OPF package: {0}")]
    InvalidOpf(String),

    #[error("Unsupported EPUB source format")]
    UnsupportedSourceFormat,
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Epub(#[from] EpubError),

    #[error("Novel not found: {0}")]
    NovelNotFound(String),

    #[error("Translation job not found: {0}")]
    JobNotFound(String),

    #[error("Translation subtask not found: {0}")]
    SubtaskNotFound(String),

    #[error("Novel {0} has no chapters to translate")]
    NoChaptersToTranslate(String),

    #[error("Active translation job already exists for this novel and language (job_id: {job_id})")]
    ActiveJobConflict { job_id: String },

    #[error("Translation job {job_id} is already {status}")]
    AlreadyTerminalJob { job_id: String, status: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Repository failure. Detail is logged where it happens; only the
    /// short message travels upward.
    #[error("{0}")]
    Persistence(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Epub(e) => match e {
                EpubError::ContainerCorrupt(_) => "container_corrupt",
                EpubError::EmptyContainer => "empty_container",
                EpubError::MissingRootfile(_) => "missing_rootfile",
                EpubError::InvalidOpf(_) => "invalid_opf",
                EpubError::UnsupportedSourceFormat => "unsupported_source_format",
            },
            AppError::NovelNotFound(_) => "novel_not_found",
            AppError::JobNotFound(_) => "job_not_found",
            AppError::SubtaskNotFound(_) => "subtask_not_found",
            AppError::NoChaptersToTranslate(_) => "no_chapters_to_translate",
            AppError::ActiveJobConflict { .. } => "active_job_conflict",
            AppError::AlreadyTerminalJob { .. } => "already_terminal_job",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Persistence(_) => "persistence_error",
            AppError::Database(_) => "database_error",
            AppError::Config(_) => "config_error",
            AppError::Queue(_) => "queue_error",
            AppError::Storage(_) => "storage_error",
            AppError::Io(_) => "io_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Message safe to show outside the process.
    ///
    /// Database and IO detail never leaves through this path.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Epub(_)
            | AppError::NovelNotFound(_)
            | AppError::JobNotFound(_)
            | AppError::SubtaskNotFound(_)
            | AppError::NoChaptersToTranslate(_)
            | AppError::ActiveJobConflict { .. }
            | AppError::AlreadyTerminalJob { .. }
            | AppError::InvalidTransition { .. }
            | AppError::Persistence(_) => self.to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Queue(e) => {
                tracing::error!("Queue error: {}", e);
                "Queue error".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                "Storage error".to_string()
            }
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Serialization(_) => {
                tracing::error!("Internal error: {}", self);
                "An internal error occurred".to_string()
            }
        }
    }
}

/// Log a repository failure with full detail and return the short message.
pub(crate) fn persistence(message: &'static str, err: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %err, "{}", message);
    AppError::Persistence(message)
}
