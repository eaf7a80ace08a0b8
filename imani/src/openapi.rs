//! OpenAPI documentation for the HTTP API, served at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Imani",
        description = "Image and PDF editing, text extraction and a small user directory."
    ),
    paths(
        api::handlers::images::upload_image,
        api::handlers::images::resize_image,
        api::handlers::images::rotate_image,
        api::handlers::images::filter_image,
        api::handlers::images::reset_image,
        api::handlers::images::extract_text_from_image,
        api::handlers::pdfs::upload_pdf,
        api::handlers::pdfs::convert_to_images,
        api::handlers::pdfs::split_pdf,
        api::handlers::pdfs::merge_pdfs,
        api::handlers::pdfs::extract_text,
        api::handlers::users::create_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
    ),
    components(
        schemas(
            api::models::images::UploadResponse,
            api::models::images::ImageOutputResponse,
            api::models::images::TextResponse,
            api::models::images::UploadForm,
            api::models::images::ResizeForm,
            api::models::images::RotateForm,
            api::models::images::FilterForm,
            api::models::images::FilePathForm,
            api::models::pdfs::ConvertToImagesResponse,
            api::models::pdfs::SplitPdfResponse,
            api::models::pdfs::MergePdfsResponse,
            api::models::pdfs::MergePdfsForm,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
        )
    ),
    tags(
        (name = "images", description = "Image upload, editing and OCR"),
        (name = "pdfs", description = "PDF upload, rendering, splitting, merging and text extraction"),
        (name = "users", description = "User directory"),
    )
)]
pub struct ApiDoc;
