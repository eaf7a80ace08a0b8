//! Optical character recognition.
//!
//! Recognition goes through the [`OcrBackend`] trait. The production backend is [`OcrsBackend`],
//! which runs the `ocrs` detection and recognition models on `rten`. [`initialize`] tries the
//! accelerated variant first (model weights memory-mapped straight from disk) and falls back to
//! the standard variant (weights read into memory) when that fails.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use super::errors::{EditError, Result};

pub const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Something that turns an image into raw (unnormalised) text.
pub trait OcrBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// How model weights are brought into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLoading {
    /// Memory-map the model files. Fast startup, no copy of the weights.
    Mapped,
    /// Read the model files into owned buffers.
    Buffered,
}

/// Default model location: `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`, the directory `ocrs-cli`
/// downloads its models into.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

pub struct OcrsBackend {
    engine: OcrEngine,
    loading: ModelLoading,
}

impl OcrsBackend {
    /// Load the detection and recognition models from `model_dir`.
    #[instrument(skip_all, fields(model_dir = %model_dir.display(), loading = ?loading), err)]
    pub fn load(model_dir: &Path, loading: ModelLoading) -> Result<Self> {
        let detection_model = load_model(&model_dir.join(DETECTION_MODEL_FILENAME), loading)?;
        let recognition_model = load_model(&model_dir.join(RECOGNITION_MODEL_FILENAME), loading)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| EditError::Ocr(format!("failed to initialise OCR engine: {e}")))?;

        info!("OCR engine initialised");
        Ok(Self { engine, loading })
    }
}

impl OcrBackend for OcrsBackend {
    fn name(&self) -> &'static str {
        match self.loading {
            ModelLoading::Mapped => "ocrs-mmap",
            ModelLoading::Buffered => "ocrs",
        }
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()), err)]
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| EditError::Ocr(format!("failed to create image source ({width}x{height}): {e}")))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| EditError::Ocr(format!("OCR preprocessing failed: {e}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|e| EditError::Ocr(format!("OCR text recognition failed: {e}")))?;

        debug!(line_count = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}

fn load_model(path: &Path, loading: ModelLoading) -> Result<Model> {
    if !path.is_file() {
        return Err(EditError::Ocr(format!(
            "model not found at {}; run `ocrs-cli` once to download the models or set ocr.model_dir",
            path.display()
        )));
    }

    let loaded = match loading {
        // SAFETY: the model files are only read, and are not expected to change while mapped.
        ModelLoading::Mapped => unsafe { Model::load_mmap(path) },
        ModelLoading::Buffered => Model::load_file(path),
    };
    loaded.map_err(|e| EditError::Ocr(format!("failed to load model from {}: {e}", path.display())))
}

/// Build the OCR backend for `model_dir`, preferring memory-mapped models.
pub fn initialize(model_dir: &Path) -> Result<Box<dyn OcrBackend>> {
    initialize_with(
        || OcrsBackend::load(model_dir, ModelLoading::Mapped).map(|b| Box::new(b) as Box<dyn OcrBackend>),
        || OcrsBackend::load(model_dir, ModelLoading::Buffered).map(|b| Box::new(b) as Box<dyn OcrBackend>),
    )
}

/// Try `accelerated`; on failure log a warning and use `fallback`. Only the fallback's error
/// reaches the caller.
pub fn initialize_with<A, F>(accelerated: A, fallback: F) -> Result<Box<dyn OcrBackend>>
where
    A: FnOnce() -> Result<Box<dyn OcrBackend>>,
    F: FnOnce() -> Result<Box<dyn OcrBackend>>,
{
    match accelerated() {
        Ok(backend) => {
            debug!(backend = backend.name(), "Using accelerated OCR backend");
            Ok(backend)
        }
        Err(e) => {
            warn!(error = %e, "Accelerated OCR backend unavailable, falling back to standard backend");
            let backend = fallback()?;
            debug!(backend = backend.name(), "Using fallback OCR backend");
            Ok(backend)
        }
    }
}
