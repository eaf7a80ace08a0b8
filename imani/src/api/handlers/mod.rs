//! HTTP request handlers for all API endpoints.
//!
//! Editing handlers read their form through [`FormFields`](crate::api::form::FormFields) or, for
//! uploads, through `Multipart`. The editing work itself runs on the blocking pool via
//! [`run_blocking`](crate::editor::run_blocking).

pub mod images;
pub mod pdfs;
pub mod users;

use std::path::{Path, PathBuf};

use axum::extract::Multipart;

use crate::errors::{Error, Result};
use crate::storage::StoragePaths;

/// Store the first file part of `multipart` in the images directory. Other parts are ignored.
pub(crate) async fn store_upload(storage: &StoragePaths, mut multipart: Multipart) -> Result<PathBuf> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::rejected(e.status(), format!("Failed to parse multipart data: {}", e)))?
    {
        if field.file_name().is_some() {
            return storage.save_upload(field).await;
        }
    }

    Err(Error::BadRequest {
        message: "No file provided".to_string(),
    })
}

pub(crate) fn display(path: &Path) -> String {
    path.display().to_string()
}
