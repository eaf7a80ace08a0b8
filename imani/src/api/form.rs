//! Form input for the editing endpoints.
//!
//! Clients send either `multipart/form-data` or `application/x-www-form-urlencoded`. Both are
//! collected into the same ordered list of text fields. File parts are skipped here; upload
//! handlers take `Multipart` directly.

use std::str::FromStr;

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};

use crate::errors::{Error, Result};

/// Text fields of a form body, in the order they were sent.
#[derive(Debug, Clone, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    /// First non-empty value for `name`.
    pub fn optional(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    pub fn required(&self, name: &str) -> Result<&str> {
        self.optional(name).ok_or_else(|| Error::BadRequest {
            message: format!("Missing required form field '{name}'"),
        })
    }

    pub fn parse_optional<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.optional(name)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| Error::BadRequest {
                    message: format!("Form field '{name}' has an invalid value: {raw:?}"),
                })
            })
            .transpose()
    }

    pub fn parse_required<T: FromStr>(&self, name: &str) -> Result<T> {
        self.parse_optional(name)?.ok_or_else(|| Error::BadRequest {
            message: format!("Missing required form field '{name}'"),
        })
    }

    /// Every value sent for `name`, including repeats.
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        if !is_multipart(&req) {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| Error::rejected(e.status(), e.body_text()))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| Error::rejected(e.status(), e.body_text()))?;

        let mut fields = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::rejected(e.status(), format!("Failed to parse multipart data: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                continue;
            }
            let value = field
                .text()
                .await
                .map_err(|e| Error::rejected(e.status(), format!("Failed to read form field '{name}': {e}")))?;
            fields.push((name, value));
        }

        Ok(Self(fields))
    }
}
