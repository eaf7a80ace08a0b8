//! Image, PDF and OCR editing.
//!
//! Everything in here is synchronous and CPU bound. Async callers go through [`run_blocking`].

pub mod errors;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod text;

pub use errors::{EditError, Result};
pub use image::{FilterKind, ImageEditor};
pub use pdf::{PdfEditor, RenderSettings};

/// Run an editing job on tokio's blocking pool.
pub async fn run_blocking<F, T>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| EditError::TaskFailed(e.to_string()))?
}
