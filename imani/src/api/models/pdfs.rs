//! API request/response models for PDF operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertToImagesResponse {
    pub message: String,
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SplitPdfResponse {
    pub message: String,
    pub pdf_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MergePdfsResponse {
    pub message: String,
    pub output_path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MergePdfsForm {
    /// Repeat the field, or pass a single comma separated value
    pub file_paths: Vec<String>,
}
