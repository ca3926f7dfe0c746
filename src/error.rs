// ============================================================================
// ERRORS: classified failures returned by the filter engine
// ============================================================================

use std::path::{Path, PathBuf};

use image::ImageError;

pub type Result<T> = std::result::Result<T, EditError>;

/// Which history transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Undo,
    Redo,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Undo => write!(f, "undo"),
            Transition::Redo => write!(f, "redo"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Operation needs an image (or a non-empty buffer) that isn't there.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Undo with nothing applied, or redo at the head of the history.
    #[error("cannot {action}: cursor {cursor:?} of {len} filter(s)")]
    InvalidTransition {
        action: Transition,
        cursor: Option<usize>,
        len: usize,
    },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filter parameters outside their nominal range. Reported, never enforced.
    #[error("parameter outside nominal range: {0}")]
    ValidationGap(String),

    /// A background task is already running for this session.
    #[error("a task is already in flight for this session")]
    Busy,

    /// Result computed against a history that has since changed.
    #[error("result discarded: session changed while the task was running")]
    StaleResult,

    #[error("background task panicked: {0}")]
    TaskPanicked(String),

    #[error("worker pool error: {0}")]
    Worker(String),
}

impl EditError {
    /// Classify an `image` error raised while reading `path`.
    pub fn from_decode(path: &Path, e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                EditError::NotFound(path.to_path_buf())
            }
            ImageError::IoError(io) => EditError::Io(io),
            other => EditError::Decode(format!("{}: {}", path.display(), other)),
        }
    }

    /// Classify an `image` error raised while writing.
    pub fn from_encode(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => EditError::Io(io),
            other => EditError::Encode(other.to_string()),
        }
    }

    pub fn no_image() -> Self {
        EditError::InvalidState("no image is open".to_string())
    }
}
