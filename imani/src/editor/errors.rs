use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the image, PDF and OCR editors.
#[derive(Error, Debug)]
pub enum EditError {
    /// Source file (image or PDF) does not exist
    #[error("File not found at {}", path.display())]
    NotFound { path: PathBuf },

    /// Caller supplied an argument the operation cannot work with
    #[error("{message}")]
    InvalidArgument { message: String },

    /// File exists but cannot be decoded or encoded in the requested format
    #[error("Unsupported format for {}: {detail}", path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },

    /// PDF exists but could not be parsed or written
    #[error("PDF error for {}: {detail}", path.display())]
    Pdf { path: PathBuf, detail: String },

    /// Page rasterisation failed (including failure to bind the native renderer)
    #[error("Failed to render {}: {detail}", path.display())]
    Render { path: PathBuf, detail: String },

    /// No OCR backend could be initialized, or recognition failed
    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking worker panicked or was cancelled
    #[error("Editing task failed: {0}")]
    TaskFailed(String),
}

impl EditError {
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        EditError::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EditError::InvalidArgument { message: message.into() }
    }

    pub fn pdf(path: impl AsRef<Path>, detail: impl ToString) -> Self {
        EditError::Pdf {
            path: path.as_ref().to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
