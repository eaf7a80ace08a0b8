//! Request and response types for the HTTP API.

pub mod images;
pub mod pagination;
pub mod pdfs;
pub mod users;
