use crate::db::errors::DbError;
use crate::editor::EditError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body over the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// JSON body, path or query string the framework could not deserialize
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Image, PDF or OCR operation error
    #[error(transparent)]
    Edit(#[from] EditError),

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Error for a body the framework refused to read.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge { message }
        } else {
            Error::BadRequest { message }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Rejected { status, .. } => *status,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Edit(edit_err) => match edit_err {
                EditError::NotFound { .. } => StatusCode::NOT_FOUND,
                EditError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
                EditError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                EditError::Pdf { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EditError::Render { .. } | EditError::Ocr(_) | EditError::Io(_) | EditError::TaskFailed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } | Error::Rejected { message, .. } => {
                message.clone()
            }
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Edit(edit_err) => match edit_err {
                EditError::NotFound { .. } | EditError::InvalidArgument { .. } | EditError::UnsupportedFormat { .. } => {
                    edit_err.to_string()
                }
                EditError::Pdf { path, .. } => format!("Could not read PDF {}", path.display()),
                EditError::Render { .. } => "Failed to render PDF pages".to_string(),
                EditError::Ocr(_) => "Text recognition failed".to_string(),
                EditError::Io(_) | EditError::TaskFailed(_) => "Internal server error".to_string(),
            },
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                err @ DbError::UniqueViolation { .. } if err.is_email_conflict() => "Email already registered".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        let status = self.status_code();
        match &self {
            Error::Database(DbError::UniqueViolation { .. }) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            _ if status.is_server_error() => {
                tracing::error!("Internal service error: {:#}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (status, Json(json!({ "message": self.user_message() }))).into_response()
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for Error {
                fn from(rejection: $rejection) -> Self {
                    Error::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

impl_from_rejection!(JsonRejection, PathRejection, QueryRejection);

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
