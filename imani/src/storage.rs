//! Filesystem layout for uploads and derived files.
//!
//! Two directories: one for uploaded images, uploaded PDFs and edited images, one for the output
//! of PDF operations. Nothing here is deleted automatically and concurrent writes to the same
//! name are last-write-wins.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::editor::EditError;
use crate::errors::{Error, Result};

/// Name of the merged document in the PDF output directory.
pub const MERGED_PDF_NAME: &str = "merged.pdf";

/// Operations that produce a new image next to the uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    Resized,
    Rotated,
    Filtered,
    Reset,
}

impl Derived {
    pub fn prefix(&self) -> &'static str {
        match self {
            Derived::Resized => "resized",
            Derived::Rotated => "rotated",
            Derived::Filtered => "filtered",
            Derived::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub images: PathBuf,
    pub pdfs: PathBuf,
}

impl StoragePaths {
    pub fn new(images: impl Into<PathBuf>, pdfs: impl Into<PathBuf>) -> Self {
        Self {
            images: images.into(),
            pdfs: pdfs.into(),
        }
    }

    /// Create both directories. Must run before the server accepts requests.
    #[instrument(skip(self), fields(images = %self.images.display(), pdfs = %self.pdfs.display()), err)]
    pub async fn initialize(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.images).await?;
        fs::create_dir_all(&self.pdfs).await?;
        info!("Storage directories ready");
        Ok(())
    }

    /// Where an upload called `filename` is stored.
    pub fn upload_path(&self, filename: &str) -> Result<PathBuf> {
        let name = sanitize_filename(filename).ok_or_else(|| Error::BadRequest {
            message: format!("Invalid upload filename: {filename:?}"),
        })?;
        Ok(self.images.join(name))
    }

    /// `{prefix}_{basename}` in the images directory.
    pub fn derived_image_path(&self, kind: Derived, source: &Path) -> Result<PathBuf> {
        let basename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EditError::invalid(format!("{} has no file name", source.display())))?;
        Ok(self.images.join(format!("{}_{basename}", kind.prefix())))
    }

    pub fn merged_pdf_path(&self) -> PathBuf {
        self.pdfs.join(MERGED_PDF_NAME)
    }

    /// Stream a multipart file field to the images directory, overwriting any existing file with
    /// the same name.
    #[instrument(skip(self, field), err)]
    pub async fn save_upload(&self, mut field: Field<'_>) -> Result<PathBuf> {
        let filename = field.file_name().unwrap_or_default().to_string();
        let target = self.upload_path(&filename)?;

        let mut file = fs::File::create(&target).await.map_err(EditError::from)?;
        let mut total_size = 0u64;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| Error::rejected(e.status(), format!("Failed to read file chunk: {}", e)))?
        {
            total_size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(EditError::from)?;
        }
        file.flush().await.map_err(EditError::from)?;

        debug!(path = %target.display(), total_size, "Upload stored");
        Ok(target)
    }
}

/// Reduce a client supplied filename to its final path component. Returns `None` when nothing
/// usable is left.
pub fn sanitize_filename(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}
