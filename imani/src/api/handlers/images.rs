use std::path::PathBuf;

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::{
    api::{
        form::FormFields,
        handlers::{display, store_upload},
        models::images::{
            FilePathForm, FilterForm, ImageOutputResponse, ResizeForm, RotateForm, TextResponse, UploadForm,
            UploadResponse,
        },
    },
    editor::{ocr, run_blocking, FilterKind, ImageEditor},
    errors::{Error, Result},
    storage::Derived,
    AppState,
};

#[utoipa::path(
    post,
    path = "/upload/",
    tag = "images",
    summary = "Upload image",
    description = "Store an image in the upload directory. An existing file with the same name is overwritten.",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadResponse),
        (status = 400, description = "No file or unusable filename"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_image(State(state): State<AppState>, multipart: Multipart) -> Result<Json<UploadResponse>> {
    let path = store_upload(&state.storage, multipart).await?;
    info!(path = %path.display(), "Image uploaded");

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file_path: display(&path),
    }))
}

#[utoipa::path(
    post,
    path = "/resize/",
    tag = "images",
    summary = "Resize image",
    description = "Resize to the given width and/or height. With only one dimension the aspect ratio is kept.",
    request_body(content = ResizeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Image resized successfully", body = ImageOutputResponse),
        (status = 400, description = "Neither width nor height given, or a non-numeric value"),
        (status = 404, description = "Source image not found"),
        (status = 415, description = "Source image could not be decoded")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn resize_image(State(state): State<AppState>, form: FormFields) -> Result<Json<ImageOutputResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let width = form.parse_optional::<u32>("width")?;
    let height = form.parse_optional::<u32>("height")?;
    let output = state.storage.derived_image_path(Derived::Resized, &source)?;

    let target = output.clone();
    run_blocking(move || {
        let mut editor = ImageEditor::open(&source)?;
        editor.resize(width, height)?;
        editor.save(&target)
    })
    .await?;

    Ok(Json(ImageOutputResponse {
        message: "Image resized successfully".to_string(),
        output_path: display(&output),
    }))
}

#[utoipa::path(
    post,
    path = "/rotate/",
    tag = "images",
    summary = "Rotate image",
    description = "Rotate about the centre by `angle` degrees, counter-clockwise. The canvas size is unchanged.",
    request_body(content = RotateForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Image rotated successfully", body = ImageOutputResponse),
        (status = 400, description = "Missing, non-numeric or non-finite angle"),
        (status = 404, description = "Source image not found")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn rotate_image(State(state): State<AppState>, form: FormFields) -> Result<Json<ImageOutputResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let angle = form.parse_required::<f32>("angle")?;
    if !angle.is_finite() {
        return Err(Error::BadRequest {
            message: format!("Rotation angle must be a finite number of degrees, got {angle}"),
        });
    }
    let output = state.storage.derived_image_path(Derived::Rotated, &source)?;

    let target = output.clone();
    run_blocking(move || ImageEditor::open(&source)?.rotate(angle).save(&target)).await?;

    Ok(Json(ImageOutputResponse {
        message: "Image rotated successfully".to_string(),
        output_path: display(&output),
    }))
}

#[utoipa::path(
    post,
    path = "/filter/",
    tag = "images",
    summary = "Apply filter",
    description = "Apply one of `blur`, `gaussian`, `median` or `edge`.",
    request_body(content = FilterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Filter applied successfully", body = ImageOutputResponse),
        (status = 400, description = "Unknown filter type"),
        (status = 404, description = "Source image not found")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn filter_image(State(state): State<AppState>, form: FormFields) -> Result<Json<ImageOutputResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let kind: FilterKind = form.required("filter_type")?.parse()?;
    let output = state.storage.derived_image_path(Derived::Filtered, &source)?;

    let target = output.clone();
    run_blocking(move || ImageEditor::open(&source)?.apply_filter(kind).save(&target)).await?;

    Ok(Json(ImageOutputResponse {
        message: "Filter applied successfully".to_string(),
        output_path: display(&output),
    }))
}

#[utoipa::path(
    post,
    path = "/reset/",
    tag = "images",
    summary = "Reset image",
    description = "Write an unedited copy of the source image.",
    request_body(content = FilePathForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Image reset successfully", body = ImageOutputResponse),
        (status = 404, description = "Source image not found")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_image(State(state): State<AppState>, form: FormFields) -> Result<Json<ImageOutputResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let output = state.storage.derived_image_path(Derived::Reset, &source)?;

    let target = output.clone();
    run_blocking(move || ImageEditor::open(&source)?.reset().save(&target)).await?;

    Ok(Json(ImageOutputResponse {
        message: "Image reset successfully".to_string(),
        output_path: display(&output),
    }))
}

#[utoipa::path(
    post,
    path = "/extract_text_from_image/",
    tag = "images",
    summary = "Extract text from image",
    description = "Store the uploaded image, then run OCR on it. Whitespace in the result is normalised.",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Text extracted from image successfully", body = TextResponse),
        (status = 400, description = "No file provided"),
        (status = 415, description = "Upload is not a decodable image"),
        (status = 500, description = "OCR models unavailable or recognition failed")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn extract_text_from_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TextResponse>> {
    let path = store_upload(&state.storage, multipart).await?;
    let model_dir = state.config.ocr.model_dir();

    let text = run_blocking(move || {
        let editor = ImageEditor::open(&path)?;
        let backend = ocr::initialize(&model_dir)?;
        editor.extract_text(backend.as_ref())
    })
    .await?;

    Ok(Json(TextResponse {
        message: "Text extracted from image successfully".to_string(),
        text,
    }))
}
