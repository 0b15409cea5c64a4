//! Error types for the HTTP server.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::parser::{Error as ParserError, Method};
use crate::server::response::{HttpResponse, StatusCode};

/// One failed check on request input.
///
/// Serialized into the `detail` list of a 422 response, e.g.
/// `{"loc": ["body", "price"], "msg": "...", "type": "greater_than"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Where the offending value sits: `body` or `query`, then the field name.
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: loc.iter().map(|part| part.to_string()).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.loc.join("."), e.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Method not allowed for the requested resource.
    #[error("Method {method} not allowed for path: {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// The client did not finish sending its request in time.
    #[error("Request not received within {after:?}")]
    RequestTimeout { after: Duration },

    #[error("Request head exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Request input failed validation.
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a validation error with a single field failure.
    pub fn invalid(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Error::Validation(vec![FieldError::new(loc, msg, kind)])
    }

    /// The status code reported to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::ParseError(_) => StatusCode::BadRequest,
            Error::NotFound(_) => StatusCode::NotFound,
            Error::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
            Error::RequestTimeout { .. } => StatusCode::RequestTimeout,
            Error::HeaderTooLarge { .. } => StatusCode::RequestHeaderFieldsTooLarge,
            Error::PayloadTooLarge { .. } => StatusCode::PayloadTooLarge,
            Error::Validation(_) => StatusCode::UnprocessableEntity,
            Error::IoError(_) | Error::InternalError(_) | Error::JsonError(_) => {
                StatusCode::InternalServerError
            }
        }
    }

    /// Render the error as a JSON `{"detail": ...}` response.
    pub fn to_response(&self) -> HttpResponse {
        let status = self.status();
        let detail = match self {
            Error::Validation(errors) => json!({ "detail": errors }),
            other => json!({ "detail": other.to_string() }),
        };

        let response = HttpResponse::new(status)
            .with_json(&detail)
            .unwrap_or_else(|_| {
                HttpResponse::new(status)
                    .with_content_type("text/plain")
                    .with_body_string(self.to_string())
            });

        match self {
            Error::MethodNotAllowed { allowed, .. } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                response.with_header("Allow", allow)
            }
            _ => response,
        }
    }
}
