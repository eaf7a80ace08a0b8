//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`form`]**: Form body extraction shared by the editing endpoints
//!
//! # API Structure
//!
//! - **Images** (`/upload/`, `/resize/`, `/rotate/`, `/filter/`, `/reset/`,
//!   `/extract_text_from_image/`): upload and edit images, OCR
//! - **PDFs** (`/upload_pdf/`, `/convert_to_images/`, `/split_pdf/`, `/merge_pdfs/`,
//!   `/extract_text/`): upload, render, split, merge and read PDFs
//! - **Users** (`/users/*`): create, list, read and update users
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`. Documentation is served
//! at `/docs` when the server is running.

pub mod form;
pub mod handlers;
pub mod models;
