//! API request/response models for image editing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Returned after a file has been stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub file_path: String,
}

/// Returned by resize, rotate, filter and reset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageOutputResponse {
    pub message: String,
    pub output_path: String,
}

/// Returned by both text extraction endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextResponse {
    pub message: String,
    pub text: String,
}

// Form bodies, documented for OpenAPI only. Handlers read them through `FormFields`.

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResizeForm {
    pub file_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RotateForm {
    pub file_path: String,
    /// Degrees, positive is counter-clockwise
    pub angle: f32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FilterForm {
    pub file_path: String,
    /// One of `blur`, `gaussian`, `median`, `edge`
    pub filter_type: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FilePathForm {
    pub file_path: String,
}
