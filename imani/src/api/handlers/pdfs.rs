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
        models::{
            images::{FilePathForm, TextResponse, UploadForm, UploadResponse},
            pdfs::{ConvertToImagesResponse, MergePdfsForm, MergePdfsResponse, SplitPdfResponse},
        },
    },
    editor::{run_blocking, PdfEditor},
    errors::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/upload_pdf/",
    tag = "pdfs",
    summary = "Upload PDF",
    description = "Store a PDF in the upload directory. An existing file with the same name is overwritten.",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDF uploaded successfully", body = UploadResponse),
        (status = 400, description = "No file or unusable filename"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Json<UploadResponse>> {
    let path = store_upload(&state.storage, multipart).await?;
    info!(path = %path.display(), "PDF uploaded");

    Ok(Json(UploadResponse {
        message: "PDF uploaded successfully".to_string(),
        file_path: display(&path),
    }))
}

#[utoipa::path(
    post,
    path = "/convert_to_images/",
    tag = "pdfs",
    summary = "Convert PDF to images",
    description = "Render every page to `page_{n}.jpg` in the PDF output directory.",
    request_body(content = FilePathForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "PDF converted to images successfully", body = ConvertToImagesResponse),
        (status = 404, description = "PDF not found"),
        (status = 422, description = "File is not a readable PDF"),
        (status = 500, description = "Page renderer unavailable")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn convert_to_images(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ConvertToImagesResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let output_dir = state.storage.pdfs.clone();
    let settings = state.config.render_settings();

    let images = run_blocking(move || PdfEditor::open(&source)?.convert_to_images(&output_dir, &settings)).await?;

    Ok(Json(ConvertToImagesResponse {
        message: "PDF converted to images successfully".to_string(),
        image_paths: images.iter().map(|p| display(p)).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/split_pdf/",
    tag = "pdfs",
    summary = "Split PDF",
    description = "Write one single-page PDF per page, named `page_{n}.pdf`, in the PDF output directory.",
    request_body(content = FilePathForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "PDF split into pages successfully", body = SplitPdfResponse),
        (status = 404, description = "PDF not found"),
        (status = 422, description = "File is not a readable PDF")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn split_pdf(State(state): State<AppState>, form: FormFields) -> Result<Json<SplitPdfResponse>> {
    let source = PathBuf::from(form.required("file_path")?);
    let output_dir = state.storage.pdfs.clone();

    let pages = run_blocking(move || PdfEditor::open(&source)?.split_pages(&output_dir)).await?;

    Ok(Json(SplitPdfResponse {
        message: "PDF split into pages successfully".to_string(),
        pdf_paths: pages.iter().map(|p| display(p)).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/merge_pdfs/",
    tag = "pdfs",
    summary = "Merge PDFs",
    description = "Concatenate the pages of every input, in order, into `merged.pdf`. Paths may be sent as a \
                   repeated field or comma separated.",
    request_body(content = MergePdfsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "PDFs merged successfully", body = MergePdfsResponse),
        (status = 400, description = "No paths given"),
        (status = 404, description = "One of the inputs does not exist"),
        (status = 422, description = "One of the inputs is not a readable PDF")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn merge_pdfs(State(state): State<AppState>, form: FormFields) -> Result<Json<MergePdfsResponse>> {
    let paths: Vec<String> = form.all("file_paths").into_iter().map(str::to_string).collect();
    let output = state.storage.merged_pdf_path();

    let target = output.clone();
    let pages = run_blocking(move || PdfEditor::merge_pdfs(&paths, &target)).await?;
    info!(pages, output = %output.display(), "PDFs merged");

    Ok(Json(MergePdfsResponse {
        message: "PDFs merged successfully".to_string(),
        output_path: display(&output),
    }))
}

#[utoipa::path(
    post,
    path = "/extract_text/",
    tag = "pdfs",
    summary = "Extract text from PDF",
    description = "Text of every page, whitespace normalised, one line per page with text.",
    request_body(content = FilePathForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Text extracted successfully", body = TextResponse),
        (status = 404, description = "PDF not found"),
        (status = 422, description = "File is not a readable PDF")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn extract_text(form: FormFields) -> Result<Json<TextResponse>> {
    let source = PathBuf::from(form.required("file_path")?);

    let text = run_blocking(move || PdfEditor::open(&source)?.extract_text()).await?;

    Ok(Json(TextResponse {
        message: "Text extracted successfully".to_string(),
        text,
    }))
}
